mod common;
use composable_mixins::loader::parse_definitions;
use composable_mixins::{
    CollisionPolicy, MissingImplementer, Object, RegistrationError, load_definitions,
};

#[test]
fn test_load_domain_rules_and_templates() {
    let toml_content = r#"
        [domain]
        collision = "first-wins"
        missing-implementer = "quiet"

        [rules]
        mandatory = ["logger"]
        exclusive = [["circle", "square"]]

        [rules.dependent]
        ticker = ["logger"]

        [templates.ticking-circle]
        mixins = ["circle", "ticker"]
        "#;

    let toml_file = common::create_toml_test_file(toml_content);
    let definitions = common::load_definitions_and_assert_ok(&[toml_file.to_path_buf()]);

    assert_eq!(definitions.domain.collision, CollisionPolicy::FirstWins);
    assert_eq!(
        definitions.domain.missing_implementer,
        MissingImplementer::Quiet
    );
    assert_eq!(definitions.domain.max_features, 4096);
    assert_eq!(definitions.rules.mandatory, vec!["logger"]);
    assert_eq!(definitions.rules.exclusive, vec![vec!["circle", "square"]]);
    assert_eq!(definitions.rules.dependent["ticker"], vec!["logger"]);
    assert_eq!(
        definitions.templates["ticking-circle"].mixins,
        vec!["circle", "ticker"]
    );
}

#[test]
fn test_install_rules_and_build_templates() {
    let shapes = common::shapes();
    let definitions = parse_definitions(
        r#"
        [rules]
        mandatory = ["logger"]

        [templates.plain-square]
        mixins = ["square"]
        "#,
    )
    .unwrap();

    definitions.install_rules(&shapes.domain).unwrap();
    let templates = definitions.build_templates(&shapes.domain).unwrap();

    let template = &templates["plain-square"];
    assert_eq!(template.type_info().mixin_names(), vec!["square", "logger"]);

    let mut object = template.instantiate().unwrap();
    assert_eq!(object.call_const(&shapes.area, ()), Ok(4.0));
    assert_eq!(object.call(&shapes.log, "hi".to_string()), Ok(1));

    let mut other = Object::new(&shapes.domain);
    template.apply_to(&mut other).unwrap();
    assert!(other.same_type(&object));
}

#[test]
fn test_template_apply_keeps_retained_data() {
    let shapes = common::shapes();
    let template = shapes
        .domain
        .template(&[shapes.square.id(), shapes.ticker.id()])
        .unwrap();

    let mut object = common::object_with(&shapes.domain, &[shapes.square.id(), shapes.logger.id()]);
    object.get_mut(&shapes.square).unwrap().side = 5.0;

    template.apply_to(&mut object).unwrap();
    assert_eq!(object.mixin_names(), vec!["square", "ticker"]);
    assert_eq!(object.get(&shapes.square).unwrap().side, 5.0);
}

#[test]
fn test_merge_multiple_files() {
    let first = common::create_toml_test_file(
        r#"
        [domain]
        max-features = 64

        [rules]
        mandatory = ["logger"]

        [templates.a]
        mixins = ["circle"]
        "#,
    );
    let second = common::create_toml_test_file(
        r#"
        [rules]
        mandatory = ["ticker"]

        [templates.b]
        mixins = ["square"]
        "#,
    );

    let definitions =
        common::load_definitions_and_assert_ok(&[first.to_path_buf(), second.to_path_buf()]);
    assert_eq!(definitions.domain.max_features, 64);
    assert_eq!(definitions.rules.mandatory, vec!["logger", "ticker"]);
    assert_eq!(definitions.templates.len(), 2);
}

#[test]
#[should_panic(expected = "Duplicate template name: 'a'")]
fn test_duplicate_template_name() {
    let first = common::create_toml_test_file("[templates.a]\nmixins = [\"circle\"]\n");
    let second = common::create_toml_test_file("[templates.a]\nmixins = [\"square\"]\n");

    load_definitions(&[first.to_path_buf(), second.to_path_buf()]).unwrap();
}

#[test]
#[should_panic(expected = "Duplicate [domain] section")]
fn test_duplicate_domain_section() {
    let first = common::create_toml_test_file("[domain]\ncollision = \"reject\"\n");
    let second = common::create_toml_test_file("[domain]\ncollision = \"first-wins\"\n");

    load_definitions(&[first.to_path_buf(), second.to_path_buf()]).unwrap();
}

#[test]
#[should_panic(expected = "Unsupported file type")]
fn test_unsupported_file_type() {
    let file = common::create_test_file_with_suffix("{}", ".json");
    load_definitions(&[file.to_path_buf()]).unwrap();
}

#[test]
#[should_panic(expected = "Unknown section 'components'")]
fn test_unknown_section() {
    let file = common::create_toml_test_file("[components]\nname = \"x\"\n");
    load_definitions(&[file.to_path_buf()]).unwrap();
}

#[test]
fn test_invalid_domain_value() {
    let result = parse_definitions("[domain]\ncollision = \"last-wins\"\n");
    let error = result.unwrap_err().to_string();
    assert!(error.contains("Failed to parse [domain]"), "{error}");
}

#[test]
fn test_unknown_mixin_in_rules() {
    let shapes = common::shapes();
    let definitions = parse_definitions(
        r#"
        [rules]
        mandatory = ["logger"]
        deprecated = ["hexagon"]
        "#,
    )
    .unwrap();

    let error = definitions.install_rules(&shapes.domain).unwrap_err();
    assert_eq!(
        error.downcast_ref::<RegistrationError>(),
        Some(&RegistrationError::UnknownMixin("hexagon".to_string()))
    );
    // Nothing is installed when one name fails.
    assert!(shapes.domain.rules().is_empty());
}

#[test]
fn test_unknown_mixin_in_template() {
    let shapes = common::shapes();
    let definitions = parse_definitions("[templates.bad]\nmixins = [\"hexagon\"]\n").unwrap();

    let error = definitions.build_templates(&shapes.domain).unwrap_err();
    assert_eq!(error.to_string(), "Template 'bad': unknown mixin 'hexagon'");
}

#[test]
fn test_create_domain_uses_config() {
    let definitions = parse_definitions("[domain]\nmissing-implementer = \"quiet\"\n").unwrap();
    let domain = definitions.create_domain();

    assert_eq!(
        domain.config().missing_implementer,
        MissingImplementer::Quiet
    );
}
