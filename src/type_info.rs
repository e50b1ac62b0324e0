//! Composition descriptors.
//!
//! A [`TypeInfo`] describes one distinct set of mixins: the slot order of their
//! data blocks and, for every message, which slots implement it. It is built
//! once per set by [`Domain::type_info`](crate::Domain::type_info) and shared by
//! every object with that set.

use std::fmt;
use std::sync::Arc;

use crate::error::CompositionError;
use crate::message::ErasedHandler;
use crate::mixin::MixinDescriptor;
use crate::registry::{DefaultTable, FeatureDetail, FeatureEntry};
use crate::types::{Cardinality, CollisionPolicy, DomainConfig, DomainId, FeatureId, MissingImplementer};

pub(crate) struct Implementer {
    pub(crate) slot: usize,
    pub(crate) priority: i32,
    pub(crate) handler: ErasedHandler,
}

/// Message table entry. Unicast calls use the first implementer; multicast
/// calls walk all of them in order.
pub(crate) struct MessageSlot {
    pub(crate) implementers: Vec<Implementer>,
}

pub struct TypeInfo {
    domain: DomainId,
    mixins: Box<[Arc<MixinDescriptor>]>,
    mixin_slots: Vec<Option<usize>>,
    messages: Vec<Option<MessageSlot>>,
    defaults_enabled: bool,
    defaults: Arc<DefaultTable>,
    missing_implementer: MissingImplementer,
}

impl TypeInfo {
    pub(crate) fn empty(
        domain: DomainId,
        config: &DomainConfig,
        defaults: Arc<DefaultTable>,
    ) -> Self {
        Self {
            domain,
            mixins: Box::new([]),
            mixin_slots: Vec::new(),
            messages: Vec::new(),
            defaults_enabled: false,
            defaults,
            missing_implementer: config.missing_implementer,
        }
    }

    /// Build the descriptor for `mixins`, which must be sorted by id without
    /// duplicates. `features` is the domain's feature table at build time.
    pub(crate) fn build(
        domain: DomainId,
        config: &DomainConfig,
        mixins: Vec<Arc<MixinDescriptor>>,
        features: &[Arc<FeatureEntry>],
        defaults: Arc<DefaultTable>,
    ) -> Result<Self, CompositionError> {
        let defaults_enabled = mixins.iter().any(|mixin| mixin.enables_defaults());

        let slot_count = mixins.last().map_or(0, |mixin| mixin.id().index() + 1);
        let mut mixin_slots = vec![None; slot_count];
        for (slot, mixin) in mixins.iter().enumerate() {
            mixin_slots[mixin.id().index()] = Some(slot);
        }

        let mut messages: Vec<Option<MessageSlot>> = features.iter().map(|_| None).collect();
        for (slot, mixin) in mixins.iter().enumerate() {
            for binding in mixin.bindings() {
                let Some(entry) = messages.get_mut(binding.message.index()) else {
                    continue;
                };
                entry
                    .get_or_insert_with(|| MessageSlot {
                        implementers: Vec::new(),
                    })
                    .implementers
                    .push(Implementer {
                        slot,
                        priority: binding.priority,
                        handler: Arc::clone(&binding.handler),
                    });
            }
        }

        for (feature, entry) in features.iter().zip(messages.iter_mut()) {
            let FeatureDetail::Message(signature) = &feature.detail else {
                continue;
            };
            let Some(slot) = entry else {
                continue;
            };
            // Stable, so equal priorities keep slot order.
            slot.implementers
                .sort_by(|a, b| b.priority.cmp(&a.priority));
            if signature.cardinality == Cardinality::Unicast
                && let [first, second, ..] = slot.implementers.as_slice()
                && first.priority == second.priority
            {
                let first_name = mixins[first.slot].name();
                let second_name = mixins[second.slot].name();
                match config.collision {
                    CollisionPolicy::Reject => {
                        return Err(CompositionError::Ambiguous {
                            message: feature.name.to_string(),
                            first: first_name.to_string(),
                            second: second_name.to_string(),
                            priority: first.priority,
                        });
                    }
                    CollisionPolicy::FirstWins => tracing::warn!(
                        "Message '{}' is implemented by '{}' and '{}' with priority {}; '{}' wins",
                        feature.name,
                        first_name,
                        second_name,
                        first.priority,
                        first_name
                    ),
                }
            }
        }

        Ok(Self {
            domain,
            mixins: mixins.into_boxed_slice(),
            mixin_slots,
            messages,
            defaults_enabled,
            defaults,
            missing_implementer: config.missing_implementer,
        })
    }

    pub(crate) fn domain(&self) -> DomainId {
        self.domain
    }

    pub(crate) fn message_slot(&self, message: FeatureId) -> Option<&MessageSlot> {
        self.messages.get(message.index())?.as_ref()
    }

    /// The default implementation of `message`, if this composition uses
    /// defaults. Reads the domain's current defaults, so messages declared
    /// after this type info was built are covered too.
    pub(crate) fn default_for(&self, message: FeatureId) -> Option<ErasedHandler> {
        if !self.defaults_enabled {
            return None;
        }
        self.defaults.get(message)
    }

    pub(crate) fn missing_implementer(&self) -> MissingImplementer {
        self.missing_implementer
    }

    /// Mixins in slot order.
    pub fn mixins(&self) -> impl ExactSizeIterator<Item = &MixinDescriptor> + '_ {
        self.mixins.iter().map(|mixin| mixin.as_ref())
    }

    pub fn mixin_ids(&self) -> impl ExactSizeIterator<Item = FeatureId> + '_ {
        self.mixins.iter().map(|mixin| mixin.id())
    }

    pub fn mixin_names(&self) -> Vec<&str> {
        self.mixins.iter().map(|mixin| mixin.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.mixins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mixins.is_empty()
    }

    pub fn has_mixin(&self, mixin: FeatureId) -> bool {
        self.slot_of(mixin).is_some()
    }

    /// Slot of `mixin`'s data block in objects of this type.
    pub fn slot_of(&self, mixin: FeatureId) -> Option<usize> {
        self.mixin_slots.get(mixin.index()).copied().flatten()
    }

    /// Whether a unicast call of `message` would reach an implementation,
    /// counting a default implementation defined so far.
    pub fn implements(&self, message: FeatureId) -> bool {
        self.num_implementers(message) > 0
            || (self.defaults_enabled && self.defaults.contains(message))
    }

    /// Number of mixins implementing `message`. Defaults do not count.
    pub fn num_implementers(&self, message: FeatureId) -> usize {
        self.message_slot(message)
            .map_or(0, |slot| slot.implementers.len())
    }

    /// Whether this composition falls back to default implementations.
    pub fn defaults_enabled(&self) -> bool {
        self.defaults_enabled
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .messages
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref().map(|slot| {
                    let slots: Vec<usize> = slot.implementers.iter().map(|i| i.slot).collect();
                    format!("{index} -> {slots:?}")
                })
            })
            .collect();
        f.debug_struct("TypeInfo")
            .field("mixins", &self.mixin_names())
            .field("messages", &messages)
            .field("defaults_enabled", &self.defaults_enabled)
            .finish()
    }
}
