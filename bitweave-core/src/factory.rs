//! Schema-build-time codec construction from field metadata.

use std::sync::Arc;

use crate::codec::{BooleanCodecFactory, ByteOrder, Codec, NumericCodecFactory};
use crate::error::SchemaError;
use crate::expr::Expr;
use crate::resolver::ResolverContext;
use crate::types::TypeTag;

/// Attributes attached to a field by whatever layer describes the schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMeta {
    /// Whether the field is marked as bound to the wire at all.
    pub bound: bool,
    /// Width override, in bits.
    pub size: Option<Expr>,
    pub byte_order: ByteOrder,
}

impl FieldMeta {
    pub fn bound() -> Self {
        FieldMeta {
            bound: true,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size: impl Into<Expr>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }
}

/// Produces a codec for a field, or `None` when the factory does not handle
/// the target or metadata.
pub trait CodecFactory: Send + Sync {
    fn create(
        &self,
        meta: &FieldMeta,
        target: &TypeTag,
        context: &ResolverContext<'_>,
    ) -> Result<Option<Arc<dyn Codec>>, SchemaError>;
}

/// Chains factories, returning the first codec any of them produces.
///
/// The default chain holds the boolean and numeric factories.
pub struct CompositeCodecFactory {
    factories: Vec<Box<dyn CodecFactory>>,
}

impl CompositeCodecFactory {
    pub fn empty() -> Self {
        CompositeCodecFactory {
            factories: Vec::new(),
        }
    }

    /// Appends a factory; earlier factories take precedence.
    pub fn with(mut self, factory: impl CodecFactory + 'static) -> Self {
        self.factories.push(Box::new(factory));
        self
    }
}

impl Default for CompositeCodecFactory {
    fn default() -> Self {
        CompositeCodecFactory::empty()
            .with(BooleanCodecFactory)
            .with(NumericCodecFactory)
    }
}

impl CodecFactory for CompositeCodecFactory {
    fn create(
        &self,
        meta: &FieldMeta,
        target: &TypeTag,
        context: &ResolverContext<'_>,
    ) -> Result<Option<Arc<dyn Codec>>, SchemaError> {
        for factory in &self.factories {
            if let Some(codec) = factory.create(meta, target, context)? {
                return Ok(Some(codec));
            }
        }
        Ok(None)
    }
}
