//! Core type definitions shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense identity of a feature (message or mixin) within a [`Domain`](crate::Domain).
///
/// Identities are handed out in registration order starting at zero and are
/// never reused for the lifetime of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub(crate) u32);

impl FeatureId {
    /// Returns the underlying u32 value.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeatureId({})", self.0)
    }
}

/// Identity of a domain, used to reject handles and objects from another domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainId(pub(crate) u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    Message,
    Mixin,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message => write!(f, "message"),
            Self::Mixin => write!(f, "mixin"),
        }
    }
}

/// How many implementers a message call reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    Unicast,
    Multicast,
}

/// Whether a message may mutate the mixin data it is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constness {
    Mutable,
    Const,
}

/// What happens when two mixins of one composition implement the same unicast
/// message with the same priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The composition is rejected with [`CompositionError::Ambiguous`](crate::CompositionError::Ambiguous).
    #[default]
    Reject,
    /// The mixin registered first keeps the message.
    FirstWins,
}

/// What [`Object::call_or_default`](crate::Object::call_or_default) and
/// [`Object::call_const_or_default`](crate::Object::call_const_or_default)
/// return when nothing implements the message. Plain `call` always fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingImplementer {
    /// Fail with [`DispatchError::NoImplementer`](crate::DispatchError::NoImplementer).
    #[default]
    Error,
    /// Return the result type's `Default` value.
    Quiet,
}

pub const DEFAULT_MAX_FEATURES: u32 = 4096;

fn default_max_features() -> u32 {
    DEFAULT_MAX_FEATURES
}

/// Domain configuration, usually read from the `[domain]` table of a
/// definitions file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DomainConfig {
    #[serde(default)]
    pub collision: CollisionPolicy,
    #[serde(default)]
    pub missing_implementer: MissingImplementer,
    /// Upper bound on registered features (messages plus mixins).
    #[serde(default = "default_max_features")]
    pub max_features: u32,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            collision: CollisionPolicy::default(),
            missing_implementer: MissingImplementer::default(),
            max_features: DEFAULT_MAX_FEATURES,
        }
    }
}

impl DomainConfig {
    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    pub fn with_missing_implementer(mut self, missing: MissingImplementer) -> Self {
        self.missing_implementer = missing;
        self
    }

    pub fn with_max_features(mut self, max_features: u32) -> Self {
        self.max_features = max_features;
        self
    }
}
