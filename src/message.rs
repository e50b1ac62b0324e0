//! Typed message handles.
//!
//! A message is declared once per domain and yields a [`Message`] handle. The
//! handle's type parameters fix the call shape: `A` is the argument type (use a
//! tuple for several arguments), `R` the result, `C` the constness marker and `K`
//! the cardinality marker. Dispatch methods on [`Object`] only accept handles of
//! the matching shape, so mutating a const message or unicasting a multicast one
//! does not compile.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use crate::error::RegistrationError;
use crate::object::Object;
use crate::registry::Domain;
use crate::types::{Cardinality, Constness, DomainId, FeatureId};

/// Marker types used as the `C` and `K` parameters of [`Message`].
pub mod kind {
    /// The message may mutate mixin data and needs `&mut Object`.
    pub struct Mutable;
    /// The message only reads mixin data and works with `&Object`.
    pub struct Const;
    /// Exactly one implementer is invoked.
    pub struct Unicast;
    /// Every implementer is invoked.
    pub struct Multicast;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::kind::Mutable {}
    impl Sealed for super::kind::Const {}
    impl Sealed for super::kind::Unicast {}
    impl Sealed for super::kind::Multicast {}
}

pub trait ConstnessKind: sealed::Sealed + 'static {
    const CONSTNESS: Constness;
}

pub trait CardinalityKind: sealed::Sealed + 'static {
    const CARDINALITY: Cardinality;
}

impl ConstnessKind for kind::Mutable {
    const CONSTNESS: Constness = Constness::Mutable;
}

impl ConstnessKind for kind::Const {
    const CONSTNESS: Constness = Constness::Const;
}

impl CardinalityKind for kind::Unicast {
    const CARDINALITY: Cardinality = Cardinality::Unicast;
}

impl CardinalityKind for kind::Multicast {
    const CARDINALITY: Cardinality = Cardinality::Multicast;
}

/// Handle to a message declared in a [`Domain`].
pub struct Message<A, R, C = kind::Mutable, K = kind::Unicast> {
    id: FeatureId,
    domain: DomainId,
    name: Arc<str>,
    _marker: PhantomData<fn(A) -> (R, C, K)>,
}

pub type ConstMessage<A, R> = Message<A, R, kind::Const, kind::Unicast>;
pub type MulticastMessage<A, R> = Message<A, R, kind::Mutable, kind::Multicast>;
pub type ConstMulticastMessage<A, R> = Message<A, R, kind::Const, kind::Multicast>;

impl<A, R, C, K> Message<A, R, C, K> {
    pub(crate) fn new(id: FeatureId, domain: DomainId, name: Arc<str>) -> Self {
        Self {
            id,
            domain,
            name,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn domain(&self) -> DomainId {
        self.domain
    }
}

impl<A, R, C, K> Clone for Message<A, R, C, K> {
    fn clone(&self) -> Self {
        Self::new(self.id, self.domain, Arc::clone(&self.name))
    }
}

impl<A, R, C, K> fmt::Debug for Message<A, R, C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// The full shape of a message, compared when the same name is declared twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSignature {
    pub cardinality: Cardinality,
    pub constness: Constness,
    args: TypeId,
    result: TypeId,
    args_name: &'static str,
    result_name: &'static str,
}

impl MessageSignature {
    pub(crate) fn of<A: 'static, R: 'static, C: ConstnessKind, K: CardinalityKind>() -> Self {
        Self {
            cardinality: K::CARDINALITY,
            constness: C::CONSTNESS,
            args: TypeId::of::<A>(),
            result: TypeId::of::<R>(),
            args_name: std::any::type_name::<A>(),
            result_name: std::any::type_name::<R>(),
        }
    }
}

impl fmt::Display for MessageSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let constness = match self.constness {
            Constness::Mutable => "",
            Constness::Const => "const ",
        };
        let cardinality = match self.cardinality {
            Cardinality::Unicast => "unicast",
            Cardinality::Multicast => "multicast",
        };
        write!(
            f,
            "{constness}{cardinality} message fn({}) -> {}",
            self.args_name, self.result_name
        )
    }
}

// Bound entry points. Each is stored type-erased and downcast at the call site;
// the handle's `A` and `R` pick the concrete type.
pub(crate) type ErasedHandler = Arc<dyn Any + Send + Sync>;

pub(crate) struct MutHandler<A, R>(
    pub(crate) Box<dyn Fn(&mut dyn Any, A) -> Option<R> + Send + Sync>,
);

pub(crate) struct ConstHandler<A, R>(
    pub(crate) Box<dyn Fn(&dyn Any, A) -> Option<R> + Send + Sync>,
);

pub(crate) struct MutDefault<A, R>(pub(crate) Box<dyn Fn(&mut Object, A) -> R + Send + Sync>);

pub(crate) struct ConstDefault<A, R>(pub(crate) Box<dyn Fn(&Object, A) -> R + Send + Sync>);

/// A message declared against [`Domain::global`] the first time it is used.
///
/// Meant for `static` items, so independent modules can each declare the
/// messages they need without caring which one is touched first:
///
/// ```
/// use composable_mixins::{GlobalMessage, kind};
///
/// static AREA: GlobalMessage<(), f64, kind::Const> = GlobalMessage::new("area");
///
/// let first = AREA.get().unwrap().id();
/// let second = AREA.get().unwrap().id();
/// assert_eq!(first, second);
/// ```
pub struct GlobalMessage<A, R, C = kind::Mutable, K = kind::Unicast> {
    name: &'static str,
    cell: OnceLock<Result<Message<A, R, C, K>, RegistrationError>>,
}

impl<A, R, C, K> GlobalMessage<A, R, C, K> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<A, R, C, K> GlobalMessage<A, R, C, K>
where
    A: 'static,
    R: 'static,
    C: ConstnessKind,
    K: CardinalityKind,
{
    /// Returns the handle, declaring the message on first access.
    pub fn get(&self) -> Result<&Message<A, R, C, K>, RegistrationError> {
        self.cell
            .get_or_init(|| Domain::global().declare_message(self.name))
            .as_ref()
            .map_err(Clone::clone)
    }
}
