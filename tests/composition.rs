mod common;
use composable_mixins::{
    CollisionPolicy, CompositionError, Domain, DomainConfig, FeatureId, Message, MixinBuilder,
};
use proptest::prelude::*;
use std::sync::Arc;

#[test]
fn test_set_equal_inputs_share_type_info() {
    let shapes = common::shapes();
    let (circle, ticker, logger) = (shapes.circle.id(), shapes.ticker.id(), shapes.logger.id());

    let first = shapes.domain.type_info(&[circle, ticker, logger]).unwrap();
    let second = shapes
        .domain
        .type_info(&[logger, circle, ticker, circle])
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(shapes.domain.cached_type_infos(), 1);
}

#[test]
fn test_empty_set_uses_empty_type_info() {
    let shapes = common::shapes();
    let empty = shapes.domain.type_info(&[]).unwrap();

    assert!(empty.is_empty());
    assert!(Arc::ptr_eq(&empty, &shapes.domain.empty_type_info()));
    assert!(!empty.defaults_enabled());
    assert!(!empty.implements(shapes.area.id()));
    assert_eq!(shapes.domain.cached_type_infos(), 0);
}

#[test]
fn test_slots_follow_feature_order() {
    let shapes = common::shapes();
    let info = shapes
        .domain
        .type_info(&[shapes.logger.id(), shapes.circle.id(), shapes.ticker.id()])
        .unwrap();

    assert_eq!(info.mixin_names(), vec!["circle", "ticker", "logger"]);
    assert_eq!(info.slot_of(shapes.circle.id()), Some(0));
    assert_eq!(info.slot_of(shapes.ticker.id()), Some(1));
    assert_eq!(info.slot_of(shapes.logger.id()), Some(2));
    assert_eq!(info.slot_of(shapes.square.id()), None);
    assert!(info.has_mixin(shapes.logger.id()));
    assert_eq!(info.len(), 3);
}

#[test]
fn test_message_table() {
    let shapes = common::shapes();
    let info = shapes
        .domain
        .type_info(&[shapes.circle.id(), shapes.ticker.id()])
        .unwrap();

    assert!(info.implements(shapes.area.id()));
    assert!(info.implements(shapes.on_tick.id()));
    assert!(!info.implements(shapes.log.id()));
    assert_eq!(info.num_implementers(shapes.on_tick.id()), 2);
    assert_eq!(info.num_implementers(shapes.area.id()), 1);
    assert_eq!(info.num_implementers(shapes.log.id()), 0);
}

#[test]
fn test_equal_priority_collision_is_rejected() {
    let shapes = common::shapes();

    let result = shapes
        .domain
        .type_info(&[shapes.square.id(), shapes.circle.id()]);
    match result {
        Err(CompositionError::Ambiguous {
            message,
            first,
            second,
            priority,
        }) => {
            assert!(message == "area" || message == "scale");
            assert_eq!(first, "circle");
            assert_eq!(second, "square");
            assert_eq!(priority, 0);
        }
        other => panic!("expected an ambiguity, got {other:?}"),
    }
    // Failed compositions are not cached.
    assert_eq!(shapes.domain.cached_type_infos(), 0);
}

#[test]
fn test_equal_priority_collision_first_wins() {
    let shapes =
        common::shapes_with_config(DomainConfig::default().with_collision(CollisionPolicy::FirstWins));

    let info = shapes
        .domain
        .type_info(&[shapes.square.id(), shapes.circle.id()])
        .unwrap();
    assert_eq!(info.num_implementers(shapes.area.id()), 2);
    assert!(info.implements(shapes.area.id()));
}

#[test]
fn test_higher_priority_resolves_collision() {
    let domain = Domain::default();
    let speak: Message<(), String> = domain.declare_message("speak").unwrap();
    let _quiet = domain
        .register_mixin(
            MixinBuilder::<common::Ticker>::new("quiet").implements(&speak, |_, ()| "quiet".into()),
        )
        .unwrap();
    let _loud = domain
        .register_mixin(
            MixinBuilder::<common::Logger>::new("loud")
                .implements(&speak, |_, ()| "loud".into())
                .priority(&speak, 10),
        )
        .unwrap();

    let ids: Vec<FeatureId> = domain.mixins().iter().map(|mixin| mixin.id()).collect();
    assert!(domain.type_info(&ids).is_ok());
}

#[test]
fn test_unknown_mixin_is_rejected() {
    let shapes = common::shapes();

    let result = shapes.domain.type_info(&[shapes.area.id()]);
    assert_eq!(result.unwrap_err(), CompositionError::UnknownMixin(shapes.area.id()));
}

#[test]
fn test_messages_declared_later_have_no_implementers() {
    let shapes = common::shapes();
    let info = shapes.domain.type_info(&[shapes.circle.id()]).unwrap();

    let later: Message<(), u32> = shapes.domain.declare_message("later").unwrap();
    assert!(!info.implements(later.id()));
    assert_eq!(info.num_implementers(later.id()), 0);
}

proptest! {
    #[test]
    fn prop_type_info_depends_only_on_the_set(
        picks in proptest::collection::vec(0usize..3, 0..12),
        rotation in 0usize..12,
    ) {
        let shapes = common::shapes();
        let pool = [shapes.circle.id(), shapes.ticker.id(), shapes.logger.id()];
        let ids: Vec<FeatureId> = picks.iter().map(|&i| pool[i]).collect();
        let mut shuffled = ids.clone();
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left(rotation % len);
            shuffled.reverse();
        }

        let first = shapes.domain.type_info(&ids).unwrap();
        let second = shapes.domain.type_info(&shuffled).unwrap();
        prop_assert!(Arc::ptr_eq(&first, &second));

        let mut expected = ids.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(first.mixin_ids().collect::<Vec<_>>(), expected);
    }
}
