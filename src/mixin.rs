//! Mixin declarations.
//!
//! A mixin is any `'static` Rust type that can live inside an [`Object`]. It is
//! described to a domain through a [`MixinBuilder`], which records how to
//! construct the data block and which messages the type implements.
//!
//! [`Object`]: crate::Object

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use crate::error::RegistrationError;
use crate::message::{
    CardinalityKind, ConstHandler, ErasedHandler, Message, MutHandler, kind,
};
use crate::registry::Domain;
use crate::types::{DomainId, FeatureId};

pub(crate) type MixinData = Box<dyn Any + Send + Sync>;
type Constructor = Box<dyn Fn() -> anyhow::Result<MixinData> + Send + Sync>;
type Cloner = Box<dyn Fn(&dyn Any) -> Option<MixinData> + Send + Sync>;

/// One message entry point provided by a mixin.
pub(crate) struct Binding {
    pub(crate) message: FeatureId,
    pub(crate) message_domain: DomainId,
    pub(crate) message_name: Arc<str>,
    pub(crate) priority: i32,
    pub(crate) handler: ErasedHandler,
}

/// Collects everything a domain needs to know about mixin type `T`.
pub struct MixinBuilder<T> {
    name: String,
    constructor: Constructor,
    cloner: Option<Cloner>,
    bindings: Vec<Binding>,
    enables_defaults: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> MixinBuilder<T> {
    /// Declare a mixin constructed with `T::default()`.
    pub fn new(name: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self::with_constructor(name, || Ok(T::default()))
    }

    /// Declare a mixin with a fallible constructor. A constructor error aborts
    /// the mutation that tried to add the mixin.
    pub fn with_constructor<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            constructor: Box::new(move || Ok(Box::new(constructor()?) as MixinData)),
            cloner: None,
            bindings: Vec::new(),
            enables_defaults: true,
            _marker: PhantomData,
        }
    }

    /// Allow objects holding this mixin to be copied with [`Object::try_clone`](crate::Object::try_clone).
    pub fn cloneable(mut self) -> Self
    where
        T: Clone,
    {
        self.cloner = Some(Box::new(|data: &dyn Any| {
            data.downcast_ref::<T>()
                .map(|this| Box::new(this.clone()) as MixinData)
        }));
        self
    }

    /// Compositions made only of mixins declared this way never fall back to
    /// default message implementations.
    pub fn without_defaults(mut self) -> Self {
        self.enables_defaults = false;
        self
    }

    /// Bind a mutating message to `handler`.
    pub fn implements<A, R, K, F>(self, message: &Message<A, R, kind::Mutable, K>, handler: F) -> Self
    where
        A: 'static,
        R: 'static,
        K: CardinalityKind,
        F: Fn(&mut T, A) -> R + Send + Sync + 'static,
    {
        let erased = MutHandler::<A, R>(Box::new(move |data: &mut dyn Any, args: A| {
            data.downcast_mut::<T>().map(|this| handler(this, args))
        }));
        self.bind(message.id(), message.domain(), message.name(), Arc::new(erased))
    }

    /// Bind a const message to `handler`.
    pub fn implements_const<A, R, K, F>(
        self,
        message: &Message<A, R, kind::Const, K>,
        handler: F,
    ) -> Self
    where
        A: 'static,
        R: 'static,
        K: CardinalityKind,
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        let erased = ConstHandler::<A, R>(Box::new(move |data: &dyn Any, args: A| {
            data.downcast_ref::<T>().map(|this| handler(this, args))
        }));
        self.bind(message.id(), message.domain(), message.name(), Arc::new(erased))
    }

    /// Set the priority of an already bound message. Higher priorities win
    /// unicast resolution and run first in multicast calls.
    pub fn priority<A, R, C, K>(mut self, message: &Message<A, R, C, K>, priority: i32) -> Self {
        match self
            .bindings
            .iter_mut()
            .find(|binding| binding.message == message.id() && binding.message_domain == message.domain())
        {
            Some(binding) => binding.priority = priority,
            None => tracing::warn!(
                "Mixin '{}' sets a priority for '{}', which it does not implement",
                self.name,
                message.name()
            ),
        }
        self
    }

    fn bind(
        mut self,
        message: FeatureId,
        message_domain: DomainId,
        message_name: &str,
        handler: ErasedHandler,
    ) -> Self {
        // Binding the same message twice replaces the earlier entry point.
        self.bindings
            .retain(|binding| !(binding.message == message && binding.message_domain == message_domain));
        self.bindings.push(Binding {
            message,
            message_domain,
            message_name: Arc::from(message_name),
            priority: 0,
            handler,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_descriptor(self, id: FeatureId, name: Arc<str>) -> MixinDescriptor {
        MixinDescriptor {
            id,
            name,
            type_name: std::any::type_name::<T>(),
            size: std::mem::size_of::<T>(),
            align: std::mem::align_of::<T>(),
            bindings: self.bindings,
            constructor: self.constructor,
            cloner: self.cloner,
            enables_defaults: self.enables_defaults,
        }
    }

    pub(crate) fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

/// Registered, immutable metadata of one mixin type.
pub struct MixinDescriptor {
    id: FeatureId,
    name: Arc<str>,
    type_name: &'static str,
    size: usize,
    align: usize,
    bindings: Vec<Binding>,
    constructor: Constructor,
    cloner: Option<Cloner>,
    enables_defaults: bool,
}

impl MixinDescriptor {
    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn align(&self) -> usize {
        self.align
    }

    pub fn enables_defaults(&self) -> bool {
        self.enables_defaults
    }

    pub fn is_cloneable(&self) -> bool {
        self.cloner.is_some()
    }

    /// Message ids this mixin implements, with their priorities, in binding order.
    pub fn messages(&self) -> impl Iterator<Item = (FeatureId, i32)> + '_ {
        self.bindings
            .iter()
            .map(|binding| (binding.message, binding.priority))
    }

    pub fn implements(&self, message: FeatureId) -> bool {
        self.bindings.iter().any(|binding| binding.message == message)
    }

    pub(crate) fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub(crate) fn construct(&self) -> anyhow::Result<MixinData> {
        (self.constructor)()
    }

    pub(crate) fn clone_data(&self, data: &dyn Any) -> Option<MixinData> {
        self.cloner.as_ref().and_then(|cloner| cloner(data))
    }
}

impl fmt::Debug for MixinDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<_> = self.bindings.iter().map(|b| &*b.message_name).collect();
        f.debug_struct("MixinDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("messages", &messages)
            .field("enables_defaults", &self.enables_defaults)
            .finish()
    }
}

/// Typed handle to a registered mixin.
pub struct Mixin<T> {
    id: FeatureId,
    domain: DomainId,
    name: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Mixin<T> {
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

impl<T> Clone for Mixin<T> {
    fn clone(&self) -> Self {
        Self::new(self.id, self.domain, Arc::clone(&self.name))
    }
}

impl<T> fmt::Debug for Mixin<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixin")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// A mixin registered into [`Domain::global`] the first time it is used.
///
/// The builder function runs at most once.
pub struct GlobalMixin<T> {
    build: fn() -> Result<MixinBuilder<T>, RegistrationError>,
    cell: OnceLock<Result<Mixin<T>, RegistrationError>>,
}

impl<T> GlobalMixin<T> {
    pub const fn new(build: fn() -> Result<MixinBuilder<T>, RegistrationError>) -> Self {
        Self {
            build,
            cell: OnceLock::new(),
        }
    }
}

impl<T: Any + Send + Sync> GlobalMixin<T> {
    pub fn get(&self) -> Result<&Mixin<T>, RegistrationError> {
        self.cell
            .get_or_init(|| {
                let builder = (self.build)()?;
                Domain::global().register_mixin(builder)
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}
