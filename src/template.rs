use std::sync::Arc;

use crate::error::MutationError;
use crate::object::Object;
use crate::type_info::TypeInfo;

/// A resolved mixin set, created with [`Domain::template`](crate::Domain::template).
///
/// Templates skip rule evaluation and type info lookup, so they are the cheap
/// way to create many objects of one shape.
#[derive(Debug, Clone)]
pub struct ObjectTemplate {
    type_info: Arc<TypeInfo>,
}

impl ObjectTemplate {
    pub(crate) fn new(type_info: Arc<TypeInfo>) -> Self {
        Self { type_info }
    }

    pub fn type_info(&self) -> &Arc<TypeInfo> {
        &self.type_info
    }

    /// Build a new object with every mixin freshly constructed.
    pub fn instantiate(&self) -> Result<Object, MutationError> {
        Object::instantiate(Arc::clone(&self.type_info))
    }

    /// Reshape `object` to exactly this mixin set. Mixins the object already
    /// has keep their data.
    pub fn apply_to(&self, object: &mut Object) -> Result<(), MutationError> {
        if object.type_info().domain() != self.type_info.domain() {
            return Err(MutationError::ForeignDomain);
        }
        if Arc::ptr_eq(object.type_info(), &self.type_info) {
            return Ok(());
        }
        object.rebind(Arc::clone(&self.type_info))
    }
}
