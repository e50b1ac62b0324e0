use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{CompositionError, RegistrationError};
use crate::message::{
    CardinalityKind, ConstDefault, ConstnessKind, ErasedHandler, Message, MessageSignature,
    MutDefault, kind,
};
use crate::mixin::{Mixin, MixinBuilder, MixinDescriptor};
use crate::object::Object;
use crate::rules::MutationRule;
use crate::type_info::TypeInfo;
use crate::types::{DomainConfig, DomainId, FeatureId, FeatureKind};

static NEXT_DOMAIN_ID: AtomicU64 = AtomicU64::new(0);
static GLOBAL: OnceLock<Domain> = OnceLock::new();

pub(crate) enum FeatureDetail {
    Message(MessageSignature),
    Mixin {
        type_id: TypeId,
        type_name: &'static str,
    },
}

impl FeatureDetail {
    fn kind(&self) -> FeatureKind {
        match self {
            Self::Message(_) => FeatureKind::Message,
            Self::Mixin { .. } => FeatureKind::Mixin,
        }
    }
}

impl fmt::Display for FeatureDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(signature) => write!(f, "{signature}"),
            Self::Mixin { type_name, .. } => write!(f, "mixin {type_name}"),
        }
    }
}

pub(crate) struct FeatureEntry {
    pub(crate) id: FeatureId,
    pub(crate) name: Arc<str>,
    pub(crate) detail: FeatureDetail,
}

/// Default implementations by message id, shared by the domain and every
/// type info built from it. Entries are only ever added.
#[derive(Default)]
pub(crate) struct DefaultTable {
    handlers: RwLock<HashMap<FeatureId, ErasedHandler>>,
}

impl DefaultTable {
    fn insert(&self, message: FeatureId, handler: ErasedHandler) -> bool {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&message) {
            return false;
        }
        handlers.insert(message, handler);
        true
    }

    pub(crate) fn get(&self, message: FeatureId) -> Option<ErasedHandler> {
        self.handlers.read().get(&message).cloned()
    }

    pub(crate) fn contains(&self, message: FeatureId) -> bool {
        self.handlers.read().contains_key(&message)
    }
}

/// Read-only view of a registered feature.
#[derive(Debug, Clone)]
pub struct FeatureInfo {
    pub id: FeatureId,
    pub name: String,
    pub kind: FeatureKind,
    /// Present for messages.
    pub signature: Option<MessageSignature>,
    pub has_default: bool,
}

impl FeatureInfo {
    fn new(entry: &FeatureEntry, defaults: &DefaultTable) -> Self {
        Self {
            id: entry.id,
            name: entry.name.to_string(),
            kind: entry.detail.kind(),
            signature: match &entry.detail {
                FeatureDetail::Message(signature) => Some(signature.clone()),
                FeatureDetail::Mixin { .. } => None,
            },
            has_default: defaults.contains(entry.id),
        }
    }
}

#[derive(Default)]
struct FeatureTable {
    entries: Vec<Arc<FeatureEntry>>,
    by_name: HashMap<Arc<str>, FeatureId>,
    mixins: HashMap<FeatureId, Arc<MixinDescriptor>>,
}

impl FeatureTable {
    fn allocate(
        &mut self,
        limit: u32,
        name: &str,
        detail: FeatureDetail,
    ) -> Result<Arc<FeatureEntry>, RegistrationError> {
        if self.entries.len() >= limit as usize {
            return Err(RegistrationError::IdentitiesExhausted { limit });
        }
        let id = FeatureId(self.entries.len() as u32);
        let name: Arc<str> = Arc::from(name);
        let entry = Arc::new(FeatureEntry {
            id,
            name: Arc::clone(&name),
            detail,
        });
        self.entries.push(Arc::clone(&entry));
        self.by_name.insert(name, id);
        Ok(entry)
    }

    fn existing(&self, name: &str) -> Option<&Arc<FeatureEntry>> {
        self.by_name
            .get(name)
            .and_then(|id| self.entries.get(id.index()))
    }
}

/// Registry of every message and mixin, plus the cache of type infos built
/// from them.
///
/// Most programs use one domain for their whole lifetime. Tests and embedders
/// that want isolation create their own with [`Domain::new`]; handles and
/// objects from one domain are rejected by another.
pub struct Domain {
    id: DomainId,
    config: DomainConfig,
    features: RwLock<FeatureTable>,
    type_infos: Mutex<HashMap<Box<[FeatureId]>, Arc<TypeInfo>>>,
    rules: RwLock<Vec<Arc<dyn MutationRule>>>,
    defaults: Arc<DefaultTable>,
    empty: Arc<TypeInfo>,
}

impl Domain {
    pub fn new(config: DomainConfig) -> Self {
        let id = DomainId(NEXT_DOMAIN_ID.fetch_add(1, Ordering::Relaxed));
        let defaults = Arc::new(DefaultTable::default());
        Self {
            id,
            config,
            features: RwLock::new(FeatureTable::default()),
            type_infos: Mutex::new(HashMap::new()),
            rules: RwLock::new(Vec::new()),
            empty: Arc::new(TypeInfo::empty(id, &config, Arc::clone(&defaults))),
            defaults,
        }
    }

    /// The process-wide domain used by [`GlobalMessage`](crate::GlobalMessage)
    /// and [`GlobalMixin`](crate::GlobalMixin). Created with the default
    /// configuration unless [`Domain::init_global`] ran first.
    pub fn global() -> &'static Domain {
        GLOBAL.get_or_init(Domain::default)
    }

    /// Create the global domain with `config`. Fails if it already exists.
    pub fn init_global(config: DomainConfig) -> Result<&'static Domain, RegistrationError> {
        let mut created = false;
        let domain = GLOBAL.get_or_init(|| {
            created = true;
            Domain::new(config)
        });
        if created {
            Ok(domain)
        } else {
            Err(RegistrationError::GlobalDomainInitialized)
        }
    }

    pub fn id(&self) -> DomainId {
        self.id
    }

    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    /// Declare a message, or return the existing handle if a message with the
    /// same name and signature is already declared.
    pub fn declare_message<A, R, C, K>(
        &self,
        name: &str,
    ) -> Result<Message<A, R, C, K>, RegistrationError>
    where
        A: 'static,
        R: 'static,
        C: ConstnessKind,
        K: CardinalityKind,
    {
        let signature = MessageSignature::of::<A, R, C, K>();
        let mut table = self.features.write();

        if let Some(entry) = table.existing(name) {
            return match &entry.detail {
                FeatureDetail::Message(existing) if *existing == signature => {
                    Ok(Message::new(entry.id, self.id, Arc::clone(&entry.name)))
                }
                detail => Err(RegistrationError::Conflicting {
                    name: name.to_string(),
                    existing: detail.to_string(),
                    requested: signature.to_string(),
                }),
            };
        }

        let entry = table.allocate(
            self.config.max_features,
            name,
            FeatureDetail::Message(signature),
        )?;
        tracing::debug!("Declared message '{}' as {}", entry.name, entry.id);
        Ok(Message::new(entry.id, self.id, Arc::clone(&entry.name)))
    }

    /// Register a mixin type. Registering the same name with the same Rust type
    /// again returns the existing handle and ignores the new builder.
    pub fn register_mixin<T>(&self, builder: MixinBuilder<T>) -> Result<Mixin<T>, RegistrationError>
    where
        T: std::any::Any + Send + Sync,
    {
        for binding in builder.bindings() {
            if binding.message_domain != self.id {
                return Err(RegistrationError::ForeignHandle {
                    name: binding.message_name.to_string(),
                });
            }
        }

        let mut table = self.features.write();

        if let Some(entry) = table.existing(builder.name()) {
            return match &entry.detail {
                FeatureDetail::Mixin { type_id, .. } if *type_id == TypeId::of::<T>() => {
                    tracing::debug!("Mixin '{}' is already registered", entry.name);
                    Ok(Mixin::new(entry.id, self.id, Arc::clone(&entry.name)))
                }
                detail => Err(RegistrationError::Conflicting {
                    name: builder.name().to_string(),
                    existing: detail.to_string(),
                    requested: format!("mixin {}", std::any::type_name::<T>()),
                }),
            };
        }

        let entry = table.allocate(
            self.config.max_features,
            builder.name(),
            FeatureDetail::Mixin {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            },
        )?;
        let descriptor = Arc::new(builder.into_descriptor(entry.id, Arc::clone(&entry.name)));
        tracing::debug!(
            "Registered mixin '{}' as {} implementing {} messages",
            descriptor.name(),
            descriptor.id(),
            descriptor.messages().count()
        );
        table.mixins.insert(entry.id, descriptor);
        Ok(Mixin::new(entry.id, self.id, Arc::clone(&entry.name)))
    }

    /// Provide the fallback used when no mixin of an object implements `message`.
    pub fn define_default<A, R, F>(
        &self,
        message: &Message<A, R, kind::Mutable, kind::Unicast>,
        default: F,
    ) -> Result<(), RegistrationError>
    where
        A: 'static,
        R: 'static,
        F: Fn(&mut Object, A) -> R + Send + Sync + 'static,
    {
        self.set_default(message, Arc::new(MutDefault::<A, R>(Box::new(default))))
    }

    /// Const counterpart of [`Domain::define_default`].
    pub fn define_const_default<A, R, F>(
        &self,
        message: &Message<A, R, kind::Const, kind::Unicast>,
        default: F,
    ) -> Result<(), RegistrationError>
    where
        A: 'static,
        R: 'static,
        F: Fn(&Object, A) -> R + Send + Sync + 'static,
    {
        self.set_default(message, Arc::new(ConstDefault::<A, R>(Box::new(default))))
    }

    fn set_default<A, R, C, K>(
        &self,
        message: &Message<A, R, C, K>,
        handler: ErasedHandler,
    ) -> Result<(), RegistrationError> {
        let foreign = || RegistrationError::ForeignHandle {
            name: message.name().to_string(),
        };
        if message.domain() != self.id {
            return Err(foreign());
        }
        if self.features.read().entries.get(message.id().index()).is_none() {
            return Err(foreign());
        }
        if !self.defaults.insert(message.id(), handler) {
            return Err(RegistrationError::DuplicateDefault {
                name: message.name().to_string(),
            });
        }
        tracing::debug!("Defined default implementation for '{}'", message.name());
        Ok(())
    }

    pub fn feature(&self, id: FeatureId) -> Option<FeatureInfo> {
        self.features
            .read()
            .entries
            .get(id.index())
            .map(|entry| FeatureInfo::new(entry, &self.defaults))
    }

    pub fn feature_by_name(&self, name: &str) -> Option<FeatureInfo> {
        self.features
            .read()
            .existing(name)
            .map(|entry| FeatureInfo::new(entry, &self.defaults))
    }

    /// Every registered feature in identity order.
    pub fn features(&self) -> Vec<FeatureInfo> {
        self.features
            .read()
            .entries
            .iter()
            .map(|entry| FeatureInfo::new(entry, &self.defaults))
            .collect()
    }

    pub fn feature_count(&self) -> usize {
        self.features.read().entries.len()
    }

    pub fn mixin(&self, id: FeatureId) -> Option<Arc<MixinDescriptor>> {
        self.features.read().mixins.get(&id).cloned()
    }

    pub fn mixin_by_name(&self, name: &str) -> Option<Arc<MixinDescriptor>> {
        let table = self.features.read();
        table
            .by_name
            .get(name)
            .and_then(|id| table.mixins.get(id))
            .cloned()
    }

    /// Every registered mixin in identity order.
    pub fn mixins(&self) -> Vec<Arc<MixinDescriptor>> {
        let table = self.features.read();
        let mut mixins: Vec<_> = table.mixins.values().cloned().collect();
        mixins.sort_by_key(|mixin| mixin.id());
        mixins
    }

    /// Return the shared type info for a set of mixins, building it on first use.
    ///
    /// Order and duplicates in `mixins` are ignored, so set-equal inputs return
    /// the same `Arc`.
    pub fn type_info(&self, mixins: &[FeatureId]) -> Result<Arc<TypeInfo>, CompositionError> {
        let mut key = mixins.to_vec();
        key.sort_unstable();
        key.dedup();
        if key.is_empty() {
            return Ok(Arc::clone(&self.empty));
        }

        let mut cache = self.type_infos.lock();
        if let Some(type_info) = cache.get(key.as_slice()) {
            return Ok(Arc::clone(type_info));
        }

        let type_info = {
            let table = self.features.read();
            let descriptors = key
                .iter()
                .map(|id| {
                    table
                        .mixins
                        .get(id)
                        .cloned()
                        .ok_or(CompositionError::UnknownMixin(*id))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(TypeInfo::build(
                self.id,
                &self.config,
                descriptors,
                &table.entries,
                Arc::clone(&self.defaults),
            )?)
        };

        tracing::debug!("Created type info {:?}", type_info.mixin_names());
        cache.insert(key.into_boxed_slice(), Arc::clone(&type_info));
        Ok(type_info)
    }

    /// The type info of an object without mixins.
    pub fn empty_type_info(&self) -> Arc<TypeInfo> {
        Arc::clone(&self.empty)
    }

    /// Number of non-empty type infos built so far.
    pub fn cached_type_infos(&self) -> usize {
        self.type_infos.lock().len()
    }

    /// Add a rule applied to every subsequent mutation.
    pub fn add_rule(&self, rule: impl MutationRule + 'static) {
        self.rules.write().push(Arc::new(rule));
    }

    pub fn rules(&self) -> Vec<Arc<dyn MutationRule>> {
        self.rules.read().clone()
    }

    pub(crate) fn rules_guard(
        &self,
    ) -> parking_lot::RwLockReadGuard<'_, Vec<Arc<dyn MutationRule>>> {
        self.rules.read()
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::new(DomainConfig::default())
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.features.read();
        let features: Vec<String> = table
            .entries
            .iter()
            .map(|entry| format!("{} {} ({})", entry.id, entry.name, entry.detail))
            .collect();
        f.debug_struct("Domain")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("features", &features)
            .field("rules", &self.rules.read().len())
            .finish()
    }
}
