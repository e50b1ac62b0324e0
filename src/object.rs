//! Objects and their mutation.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::MutationError;
use crate::mixin::{Mixin, MixinData};
use crate::registry::Domain;
use crate::rules::PendingMutation;
use crate::type_info::TypeInfo;
use crate::types::FeatureId;

/// A runtime composition of mixins.
///
/// Holds one data block per mixin of its [`TypeInfo`], in slot order. Messages
/// are dispatched through the methods in [`dispatch`](crate::dispatch).
pub struct Object {
    pub(crate) type_info: Arc<TypeInfo>,
    pub(crate) data: Vec<MixinData>,
}

impl Object {
    /// An object without mixins.
    pub fn new(domain: &Domain) -> Self {
        Self {
            type_info: domain.empty_type_info(),
            data: Vec::new(),
        }
    }

    pub(crate) fn instantiate(type_info: Arc<TypeInfo>) -> Result<Self, MutationError> {
        let data = type_info
            .mixins()
            .map(|mixin| {
                mixin
                    .construct()
                    .map_err(|source| MutationError::Construction {
                        mixin: mixin.name().to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { type_info, data })
    }

    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.type_info
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if both objects are composed of the same mixin set.
    pub fn same_type(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.type_info, &other.type_info)
    }

    pub fn has<T>(&self, mixin: &Mixin<T>) -> bool {
        mixin.domain() == self.type_info.domain() && self.type_info.has_mixin(mixin.id())
    }

    pub fn has_id(&self, mixin: FeatureId) -> bool {
        self.type_info.has_mixin(mixin)
    }

    pub fn get<T: 'static>(&self, mixin: &Mixin<T>) -> Option<&T> {
        if mixin.domain() != self.type_info.domain() {
            return None;
        }
        let slot = self.type_info.slot_of(mixin.id())?;
        self.data.get(slot)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self, mixin: &Mixin<T>) -> Option<&mut T> {
        if mixin.domain() != self.type_info.domain() {
            return None;
        }
        let slot = self.type_info.slot_of(mixin.id())?;
        self.data.get_mut(slot)?.downcast_mut::<T>()
    }

    pub fn mixin_names(&self) -> Vec<&str> {
        self.type_info.mixin_names()
    }

    /// Copy the object, cloning every data block. Fails unless every mixin was
    /// registered as cloneable.
    pub fn try_clone(&self) -> Result<Object, MutationError> {
        let data = self
            .type_info
            .mixins()
            .zip(&self.data)
            .map(|(mixin, block)| {
                mixin
                    .clone_data(&**block)
                    .ok_or_else(|| MutationError::NotCloneable(mixin.name().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Object {
            type_info: Arc::clone(&self.type_info),
            data,
        })
    }

    /// Start a mutation. Nothing changes until [`Mutation::apply`].
    pub fn mutate<'a>(&'a mut self, domain: &'a Domain) -> Mutation<'a> {
        Mutation {
            domain,
            object: self,
            add: Vec::new(),
            remove: Vec::new(),
            foreign: false,
        }
    }

    /// Drop every mixin. Mutation rules are not applied.
    pub fn clear(&mut self, domain: &Domain) -> Result<(), MutationError> {
        if domain.id() != self.type_info.domain() {
            return Err(MutationError::ForeignDomain);
        }
        self.type_info = domain.empty_type_info();
        self.data.clear();
        Ok(())
    }

    /// Switch to `type_info`, keeping the blocks of retained mixins and
    /// constructing the rest. The object is untouched if construction fails.
    pub(crate) fn rebind(&mut self, type_info: Arc<TypeInfo>) -> Result<(), MutationError> {
        enum Block {
            Fresh(MixinData),
            Retained(usize),
        }

        let plan = type_info
            .mixins()
            .map(|mixin| match self.type_info.slot_of(mixin.id()) {
                Some(slot) => Ok(Block::Retained(slot)),
                None => mixin
                    .construct()
                    .map(Block::Fresh)
                    .map_err(|source| MutationError::Construction {
                        mixin: mixin.name().to_string(),
                        source,
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut previous = std::mem::take(&mut self.data);
        self.data = plan
            .into_iter()
            .map(|block| match block {
                Block::Fresh(data) => data,
                Block::Retained(slot) => {
                    std::mem::replace(&mut previous[slot], Box::new(()) as MixinData)
                }
            })
            .collect();
        self.type_info = type_info;

        // Whatever is left belongs to removed mixins.
        drop(previous);
        Ok(())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("mixins", &self.mixin_names())
            .finish()
    }
}

/// Pending additions and removals for one object, applied atomically.
#[must_use = "a mutation does nothing until `apply` is called"]
pub struct Mutation<'a> {
    domain: &'a Domain,
    object: &'a mut Object,
    add: Vec<FeatureId>,
    remove: Vec<FeatureId>,
    foreign: bool,
}

impl Mutation<'_> {
    pub fn add<T>(mut self, mixin: &Mixin<T>) -> Self {
        self.foreign |= mixin.domain() != self.domain.id();
        self.add.push(mixin.id());
        self
    }

    pub fn remove<T>(mut self, mixin: &Mixin<T>) -> Self {
        self.foreign |= mixin.domain() != self.domain.id();
        self.remove.push(mixin.id());
        self
    }

    pub fn add_id(mut self, mixin: FeatureId) -> Self {
        self.add.push(mixin);
        self
    }

    pub fn remove_id(mut self, mixin: FeatureId) -> Self {
        self.remove.push(mixin);
        self
    }

    pub fn apply(self) -> Result<(), MutationError> {
        if self.foreign {
            return Err(MutationError::ForeignDomain);
        }
        self.domain.mutate(self.object, &self.add, &self.remove)
    }
}

impl Domain {
    /// Add and remove mixins on `object` in one step.
    ///
    /// Removals apply before additions, then the domain's mutation rules run.
    /// Removing an absent mixin or adding a present one changes nothing. If the
    /// resulting set equals the current one the object is left as is.
    pub fn mutate(
        &self,
        object: &mut Object,
        add: &[FeatureId],
        remove: &[FeatureId],
    ) -> Result<(), MutationError> {
        if object.type_info.domain() != self.id() {
            return Err(MutationError::ForeignDomain);
        }
        for &id in add {
            if self.mixin(id).is_none() {
                return Err(MutationError::UnknownMixin(id));
            }
        }

        let current: BTreeSet<FeatureId> = object.type_info.mixin_ids().collect();
        let mut target = current.clone();
        for id in remove {
            target.remove(id);
        }
        target.extend(add.iter().copied());
        let target = self.apply_rules(&current, target)?;

        if target == current {
            tracing::trace!("Mutation of {:?} changes nothing", object.mixin_names());
            return Ok(());
        }

        let ids: Vec<FeatureId> = target.into_iter().collect();
        let type_info = self.type_info(&ids)?;
        tracing::debug!(
            "Mutating object from {:?} to {:?}",
            object.mixin_names(),
            type_info.mixin_names()
        );
        object.rebind(type_info)
    }

    /// Resolve a mixin set, with rules applied, for repeated use.
    pub fn template(&self, mixins: &[FeatureId]) -> Result<crate::ObjectTemplate, MutationError> {
        for &id in mixins {
            if self.mixin(id).is_none() {
                return Err(MutationError::UnknownMixin(id));
            }
        }
        let empty = BTreeSet::new();
        let target = self.apply_rules(&empty, mixins.iter().copied().collect())?;
        let ids: Vec<FeatureId> = target.into_iter().collect();
        Ok(crate::ObjectTemplate::new(self.type_info(&ids)?))
    }

    pub(crate) fn apply_rules(
        &self,
        current: &BTreeSet<FeatureId>,
        target: BTreeSet<FeatureId>,
    ) -> Result<BTreeSet<FeatureId>, MutationError> {
        let rules = self.rules_guard();
        if rules.is_empty() {
            return Ok(target);
        }

        let passes = rules.len() + 2;
        let mut pending = PendingMutation::new(current, target);
        for _ in 0..passes {
            let before = pending.target().clone();
            for rule in rules.iter() {
                rule.apply(&mut pending);
            }
            if *pending.target() == before {
                return Ok(pending.into_target());
            }
        }
        Err(MutationError::UnstableRules { passes })
    }
}
