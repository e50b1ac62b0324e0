//! Error types for registration, composition, mutation and dispatch.

use thiserror::Error;

/// Errors raised while declaring messages and mixins.
///
/// These are startup errors: callers are expected to stop initialization
/// rather than continue with a partially registered domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// More features were registered than the domain's `max-features` allows.
    #[error("feature identity space exhausted: the limit is {limit} features")]
    IdentitiesExhausted { limit: u32 },
    /// A feature with this name exists but was declared differently.
    #[error("feature '{name}' is registered as {existing} but was redeclared as {requested}")]
    Conflicting {
        name: String,
        existing: String,
        requested: String,
    },
    /// The message already has a default implementation.
    #[error("message '{name}' already has a default implementation")]
    DuplicateDefault { name: String },
    /// A handle from another domain was used during registration.
    #[error("handle for '{name}' belongs to a different domain")]
    ForeignHandle { name: String },
    /// A mixin name did not resolve to a registered mixin.
    #[error("unknown mixin '{0}'")]
    UnknownMixin(String),
    /// `Domain::init_global` was called after the global domain was created.
    #[error("the global domain is already initialized")]
    GlobalDomainInitialized,
}

/// Errors raised while building the type info for a mixin set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error(
        "message '{message}' is implemented by both '{first}' and '{second}' with priority {priority}"
    )]
    Ambiguous {
        message: String,
        first: String,
        second: String,
        priority: i32,
    },
    #[error("feature {0} is not a registered mixin")]
    UnknownMixin(crate::FeatureId),
}

/// Errors raised by a mutation. The object is left unchanged whenever one of
/// these is returned.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("failed to construct mixin '{mixin}'")]
    Construction {
        mixin: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error("feature {0} is not a registered mixin")]
    UnknownMixin(crate::FeatureId),
    #[error("object belongs to a different domain")]
    ForeignDomain,
    #[error("mixin '{0}' is not cloneable")]
    NotCloneable(String),
    #[error("mutation rules did not settle after {passes} passes")]
    UnstableRules { passes: usize },
}

/// Errors raised by a message call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no mixin implements message '{message}'")]
    NoImplementer { message: String },
    #[error("message '{message}' was called with a handle from a different domain")]
    ForeignHandle { message: String },
    #[error("message '{message}' is bound with a different signature")]
    SignatureMismatch { message: String },
}
