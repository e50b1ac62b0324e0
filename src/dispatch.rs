//! Message dispatch.
//!
//! Every call is one table lookup on the object's [`TypeInfo`](crate::TypeInfo):
//! message id to implementer slots to data blocks. Calls that reach a mixin
//! take no locks; only the default implementation fallback reads the domain's
//! default table.

use crate::error::DispatchError;
use crate::message::{
    CardinalityKind, ConstDefault, ConstHandler, ConstnessKind, Message, MutDefault, MutHandler,
    kind,
};
use crate::object::Object;
use crate::type_info::MessageSlot;
use crate::types::MissingImplementer;

fn mismatch<A, R, C, K>(message: &Message<A, R, C, K>) -> DispatchError {
    DispatchError::SignatureMismatch {
        message: message.name().to_string(),
    }
}

fn foreign<A, R, C, K>(message: &Message<A, R, C, K>) -> DispatchError {
    DispatchError::ForeignHandle {
        message: message.name().to_string(),
    }
}

fn no_implementer<A, R, C, K>(message: &Message<A, R, C, K>) -> DispatchError {
    DispatchError::NoImplementer {
        message: message.name().to_string(),
    }
}

impl Object {
    fn message_slot<A, R, C, K>(
        &self,
        message: &Message<A, R, C, K>,
    ) -> Result<Option<&MessageSlot>, DispatchError> {
        if message.domain() != self.type_info.domain() {
            return Err(foreign(message));
        }
        Ok(self.type_info.message_slot(message.id()))
    }

    fn missing<A, R, C, K>(&self, message: &Message<A, R, C, K>) -> Result<R, DispatchError>
    where
        R: Default,
    {
        match self.type_info.missing_implementer() {
            MissingImplementer::Quiet => {
                tracing::trace!(
                    "No implementer for '{}', returning the default value",
                    message.name()
                );
                Ok(R::default())
            }
            MissingImplementer::Error => Err(no_implementer(message)),
        }
    }

    /// Run the implementer of `message`, or its default implementation.
    /// `None` means neither exists.
    fn unicast<A, R>(
        &mut self,
        message: &Message<A, R, kind::Mutable, kind::Unicast>,
        args: A,
    ) -> Result<Option<R>, DispatchError>
    where
        A: 'static,
        R: 'static,
    {
        if message.domain() != self.type_info.domain() {
            return Err(foreign(message));
        }
        // Borrows `type_info` and `data` separately so the handler gets `&mut` data.
        if let Some(implementer) = self
            .type_info
            .message_slot(message.id())
            .and_then(|slot| slot.implementers.first())
        {
            let handler = implementer
                .handler
                .downcast_ref::<MutHandler<A, R>>()
                .ok_or_else(|| mismatch(message))?;
            let block = self
                .data
                .get_mut(implementer.slot)
                .ok_or_else(|| mismatch(message))?;
            return (handler.0)(&mut **block, args)
                .map(Some)
                .ok_or_else(|| mismatch(message));
        }

        let Some(default) = self.type_info.default_for(message.id()) else {
            return Ok(None);
        };
        let default = default
            .downcast_ref::<MutDefault<A, R>>()
            .ok_or_else(|| mismatch(message))?;
        Ok(Some((default.0)(self, args)))
    }

    fn unicast_const<A, R>(
        &self,
        message: &Message<A, R, kind::Const, kind::Unicast>,
        args: A,
    ) -> Result<Option<R>, DispatchError>
    where
        A: 'static,
        R: 'static,
    {
        if let Some(implementer) = self
            .message_slot(message)?
            .and_then(|slot| slot.implementers.first())
        {
            let handler = implementer
                .handler
                .downcast_ref::<ConstHandler<A, R>>()
                .ok_or_else(|| mismatch(message))?;
            let block = self
                .data
                .get(implementer.slot)
                .ok_or_else(|| mismatch(message))?;
            return (handler.0)(&**block, args)
                .map(Some)
                .ok_or_else(|| mismatch(message));
        }

        let Some(default) = self.type_info.default_for(message.id()) else {
            return Ok(None);
        };
        let default = default
            .downcast_ref::<ConstDefault<A, R>>()
            .ok_or_else(|| mismatch(message))?;
        Ok(Some((default.0)(self, args)))
    }

    /// Call a mutating unicast message.
    ///
    /// Fails with [`DispatchError::NoImplementer`] when neither a mixin nor an
    /// enabled default implementation handles it.
    pub fn call<A, R>(
        &mut self,
        message: &Message<A, R, kind::Mutable, kind::Unicast>,
        args: A,
    ) -> Result<R, DispatchError>
    where
        A: 'static,
        R: 'static,
    {
        self.unicast(message, args)?
            .ok_or_else(|| no_implementer(message))
    }

    /// Call a const unicast message.
    pub fn call_const<A, R>(
        &self,
        message: &Message<A, R, kind::Const, kind::Unicast>,
        args: A,
    ) -> Result<R, DispatchError>
    where
        A: 'static,
        R: 'static,
    {
        self.unicast_const(message, args)?
            .ok_or_else(|| no_implementer(message))
    }

    /// Like [`Object::call`], but when nothing handles the message and the
    /// domain is configured with [`MissingImplementer::Quiet`], returns
    /// `R::default()` instead of failing.
    pub fn call_or_default<A, R>(
        &mut self,
        message: &Message<A, R, kind::Mutable, kind::Unicast>,
        args: A,
    ) -> Result<R, DispatchError>
    where
        A: 'static,
        R: Default + 'static,
    {
        match self.unicast(message, args)? {
            Some(result) => Ok(result),
            None => self.missing(message),
        }
    }

    /// Const counterpart of [`Object::call_or_default`].
    pub fn call_const_or_default<A, R>(
        &self,
        message: &Message<A, R, kind::Const, kind::Unicast>,
        args: A,
    ) -> Result<R, DispatchError>
    where
        A: 'static,
        R: Default + 'static,
    {
        match self.unicast_const(message, args)? {
            Some(result) => Ok(result),
            None => self.missing(message),
        }
    }

    /// Call every implementer of a mutating multicast message, in order, and
    /// collect the results.
    pub fn call_all<A, R>(
        &mut self,
        message: &Message<A, R, kind::Mutable, kind::Multicast>,
        args: A,
    ) -> Result<Vec<R>, DispatchError>
    where
        A: Clone + 'static,
        R: 'static,
    {
        let mut results = Vec::new();
        self.call_all_with(message, args, |result| {
            results.push(result);
            true
        })?;
        Ok(results)
    }

    /// Const counterpart of [`Object::call_all`].
    pub fn call_all_const<A, R>(
        &self,
        message: &Message<A, R, kind::Const, kind::Multicast>,
        args: A,
    ) -> Result<Vec<R>, DispatchError>
    where
        A: Clone + 'static,
        R: 'static,
    {
        let mut results = Vec::new();
        self.call_all_const_with(message, args, |result| {
            results.push(result);
            true
        })?;
        Ok(results)
    }

    /// Call implementers of a mutating multicast message in order, handing
    /// each result to `sink`. Stops early when `sink` returns `false`.
    ///
    /// Returns the number of implementers called.
    pub fn call_all_with<A, R, F>(
        &mut self,
        message: &Message<A, R, kind::Mutable, kind::Multicast>,
        args: A,
        mut sink: F,
    ) -> Result<usize, DispatchError>
    where
        A: Clone + 'static,
        R: 'static,
        F: FnMut(R) -> bool,
    {
        if message.domain() != self.type_info.domain() {
            return Err(foreign(message));
        }
        let Some(slot) = self.type_info.message_slot(message.id()) else {
            return Ok(0);
        };

        let mut called = 0;
        for implementer in &slot.implementers {
            let handler = implementer
                .handler
                .downcast_ref::<MutHandler<A, R>>()
                .ok_or_else(|| mismatch(message))?;
            let block = self
                .data
                .get_mut(implementer.slot)
                .ok_or_else(|| mismatch(message))?;
            let result = (handler.0)(&mut **block, args.clone()).ok_or_else(|| mismatch(message))?;
            called += 1;
            if !sink(result) {
                break;
            }
        }
        Ok(called)
    }

    /// Const counterpart of [`Object::call_all_with`].
    pub fn call_all_const_with<A, R, F>(
        &self,
        message: &Message<A, R, kind::Const, kind::Multicast>,
        args: A,
        mut sink: F,
    ) -> Result<usize, DispatchError>
    where
        A: Clone + 'static,
        R: 'static,
        F: FnMut(R) -> bool,
    {
        let Some(slot) = self.message_slot(message)? else {
            return Ok(0);
        };

        let mut called = 0;
        for implementer in &slot.implementers {
            let handler = implementer
                .handler
                .downcast_ref::<ConstHandler<A, R>>()
                .ok_or_else(|| mismatch(message))?;
            let block = self
                .data
                .get(implementer.slot)
                .ok_or_else(|| mismatch(message))?;
            let result = (handler.0)(&**block, args.clone()).ok_or_else(|| mismatch(message))?;
            called += 1;
            if !sink(result) {
                break;
            }
        }
        Ok(called)
    }

    /// Whether a call of `message` on this object reaches an implementation.
    ///
    /// For unicast messages a defined default implementation counts when the
    /// object's composition enables defaults.
    pub fn implements<A, R, C, K>(&self, message: &Message<A, R, C, K>) -> bool
    where
        C: ConstnessKind,
        K: CardinalityKind,
    {
        message.domain() == self.type_info.domain() && self.type_info.implements(message.id())
    }

    /// Number of mixins of this object implementing `message`.
    pub fn num_implementers<A, R, C, K>(&self, message: &Message<A, R, C, K>) -> usize {
        if message.domain() != self.type_info.domain() {
            return 0;
        }
        self.type_info.num_implementers(message.id())
    }
}
