use anyhow::Result;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RegistrationError;
use crate::registry::Domain;
use crate::rules::{Dependent, Deprecated, Mandatory, MutuallyExclusive};
use crate::template::ObjectTemplate;
use crate::types::{DomainConfig, FeatureId};

/// Rules declared by mixin name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RuleDefinitions {
    #[serde(default)]
    pub mandatory: Vec<String>,
    #[serde(default)]
    pub deprecated: Vec<String>,
    /// Groups of mutually exclusive mixins.
    #[serde(default)]
    pub exclusive: Vec<Vec<String>>,
    /// Mixin name to the mixins it requires.
    #[serde(default)]
    pub dependent: BTreeMap<String, Vec<String>>,
}

impl RuleDefinitions {
    fn extend(&mut self, other: RuleDefinitions) {
        self.mandatory.extend(other.mandatory);
        self.deprecated.extend(other.deprecated);
        self.exclusive.extend(other.exclusive);
        for (mixin, requires) in other.dependent {
            self.dependent.entry(mixin).or_default().extend(requires);
        }
    }

    fn is_empty(&self) -> bool {
        self.mandatory.is_empty()
            && self.deprecated.is_empty()
            && self.exclusive.is_empty()
            && self.dependent.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TemplateDefinition {
    pub mixins: Vec<String>,
}

/// Everything read from one or more definition files.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub domain: DomainConfig,
    pub rules: RuleDefinitions,
    pub templates: BTreeMap<String, TemplateDefinition>,
}

#[derive(Default)]
struct DefinitionFile {
    domain: Option<DomainConfig>,
    rules: RuleDefinitions,
    templates: Vec<(String, TemplateDefinition)>,
}

/// Load and merge definition files. Only `.toml` files are accepted.
pub fn load_definitions(definition_files: &[PathBuf]) -> Result<Definitions> {
    let mut domain_source: Option<&Path> = None;
    let mut definitions = Definitions::default();
    let mut template_names = HashSet::new();

    for path in definition_files {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => {}
            Some(_) => return Err(anyhow::anyhow!("Unsupported file type: {}", path.display())),
            None => {
                return Err(anyhow::anyhow!(
                    "File without extension: {}",
                    path.display()
                ));
            }
        }

        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read '{}': {e}", path.display()))?;
        let file = parse_definition_file(&content)
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;

        if let Some(domain) = file.domain {
            if let Some(previous) = domain_source {
                return Err(anyhow::anyhow!(
                    "Duplicate [domain] section in '{}', already defined in '{}'",
                    path.display(),
                    previous.display()
                ));
            }
            domain_source = Some(path);
            definitions.domain = domain;
        }

        definitions.rules.extend(file.rules);

        for (name, template) in file.templates {
            if !template_names.insert(name.clone()) {
                return Err(anyhow::anyhow!("Duplicate template name: '{name}'"));
            }
            definitions.templates.insert(name, template);
        }
    }

    tracing::debug!(
        "Loaded {} templates from {} definition files",
        definitions.templates.len(),
        definition_files.len()
    );
    Ok(definitions)
}

/// Parse the content of a single definition file.
pub fn parse_definitions(content: &str) -> Result<Definitions> {
    let file = parse_definition_file(content)?;
    Ok(Definitions {
        domain: file.domain.unwrap_or_default(),
        rules: file.rules,
        templates: file.templates.into_iter().collect(),
    })
}

fn parse_definition_file(content: &str) -> Result<DefinitionFile> {
    let table: toml::Table = toml::from_str(content)?;
    let mut file = DefinitionFile::default();

    for (key, value) in table {
        match key.as_str() {
            "domain" => {
                let config: DomainConfig = value
                    .try_into()
                    .map_err(|e| anyhow::anyhow!("Failed to parse [domain]: {e}"))?;
                file.domain = Some(config);
            }
            "rules" => {
                file.rules = value
                    .try_into()
                    .map_err(|e| anyhow::anyhow!("Failed to parse [rules]: {e}"))?;
            }
            "templates" => {
                let toml::Value::Table(templates) = value else {
                    return Err(anyhow::anyhow!("[templates] must be a table"));
                };
                for (name, template) in templates {
                    let template: TemplateDefinition = template.try_into().map_err(|e| {
                        anyhow::anyhow!("Failed to parse template '{name}': {e}")
                    })?;
                    file.templates.push((name, template));
                }
            }
            _ => return Err(anyhow::anyhow!("Unknown section '{key}'")),
        }
    }
    Ok(file)
}

fn resolve(domain: &Domain, name: &str) -> Result<FeatureId, RegistrationError> {
    domain
        .mixin_by_name(name)
        .map(|mixin| mixin.id())
        .ok_or_else(|| RegistrationError::UnknownMixin(name.to_string()))
}

fn resolve_all(domain: &Domain, names: &[String]) -> Result<Vec<FeatureId>, RegistrationError> {
    names.iter().map(|name| resolve(domain, name)).collect()
}

impl Definitions {
    /// A new domain configured by the `[domain]` section.
    pub fn create_domain(&self) -> Domain {
        Domain::new(self.domain)
    }

    /// Add the declared rules to `domain`. Every mixin name must already be
    /// registered; nothing is installed if one is not.
    pub fn install_rules(&self, domain: &Domain) -> Result<()> {
        if self.rules.is_empty() {
            return Ok(());
        }

        let mandatory = resolve_all(domain, &self.rules.mandatory)?;
        let deprecated = resolve_all(domain, &self.rules.deprecated)?;
        let exclusive = self
            .rules
            .exclusive
            .iter()
            .map(|group| resolve_all(domain, group))
            .collect::<Result<Vec<_>, _>>()?;
        let dependent = self
            .rules
            .dependent
            .iter()
            .map(|(mixin, requires)| Ok((resolve(domain, mixin)?, resolve_all(domain, requires)?)))
            .collect::<Result<Vec<_>>>()?;

        for id in mandatory {
            domain.add_rule(Mandatory(id));
        }
        for id in deprecated {
            domain.add_rule(Deprecated(id));
        }
        for group in exclusive {
            domain.add_rule(MutuallyExclusive::new(group));
        }
        for (mixin, requires) in dependent {
            domain.add_rule(Dependent::new(mixin, requires));
        }
        Ok(())
    }

    /// Resolve every template against `domain`.
    pub fn build_templates(&self, domain: &Domain) -> Result<BTreeMap<String, ObjectTemplate>> {
        self.templates
            .iter()
            .map(|(name, definition)| {
                let mixins = resolve_all(domain, &definition.mixins)
                    .map_err(|e| anyhow::anyhow!("Template '{name}': {e}"))?;
                let template = domain
                    .template(&mixins)
                    .map_err(|e| anyhow::anyhow!("Template '{name}': {e}"))?;
                Ok((name.clone(), template))
            })
            .collect()
    }
}
