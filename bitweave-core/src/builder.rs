use std::collections::HashSet;

use crate::error::InstantiationError;
use crate::types::TypeTag;
use crate::value::Record;

/// Instantiates the containers that composite codecs fill while decoding.
///
/// The engine does not decide how abstract targets map to concrete ones;
/// that is up to the implementation.
pub trait Builder {
    /// Returns an empty record ready to receive fields of type `ty`.
    fn instantiate(&self, ty: &TypeTag) -> Result<Record, InstantiationError>;
}

/// A builder that instantiates an empty record for any tag except those
/// registered as abstract.
///
/// Useful for testing and as a reference implementation.
#[derive(Debug, Default, Clone)]
pub struct DefaultBuilder {
    abstract_types: HashSet<TypeTag>,
}

impl DefaultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `ty` as abstract: instantiating it fails.
    pub fn with_abstract(mut self, ty: TypeTag) -> Self {
        self.abstract_types.insert(ty);
        self
    }
}

impl Builder for DefaultBuilder {
    fn instantiate(&self, ty: &TypeTag) -> Result<Record, InstantiationError> {
        if self.abstract_types.contains(ty) {
            return Err(InstantiationError::Abstract(ty.clone()));
        }
        Ok(Record::new(ty.clone()))
    }
}
