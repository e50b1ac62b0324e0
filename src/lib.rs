//! Composable Mixins
//!
//! A runtime for composing objects from mixins at runtime and
//! dispatching messages to whichever mixins an object currently holds.

pub use error::{CompositionError, DispatchError, MutationError, RegistrationError};
pub use graph::DomainGraph;
pub use loader::{Definitions, load_definitions};
pub use message::{
    ConstMessage, ConstMulticastMessage, GlobalMessage, Message, MessageSignature,
    MulticastMessage, kind,
};
pub use mixin::{GlobalMixin, Mixin, MixinBuilder, MixinDescriptor};
pub use object::{Mutation, Object};
pub use registry::{Domain, FeatureInfo};
pub use rules::{Dependent, Deprecated, Mandatory, MutationRule, MutuallyExclusive, PendingMutation};
pub use template::ObjectTemplate;
pub use type_info::TypeInfo;
pub use types::{
    Cardinality, CollisionPolicy, Constness, DEFAULT_MAX_FEATURES, DomainConfig, DomainId,
    FeatureId, FeatureKind, MissingImplementer,
};

pub mod combinators;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod loader;
pub mod message;
pub mod mixin;
pub mod object;
pub mod registry;
pub mod rules;
pub mod template;
pub mod type_info;
pub mod types;
