use std::sync::Arc;

use crate::buffer::{BitCursor, BitWriter};
use crate::builder::Builder;
use crate::codec::{Codec, CodecDescriptor, SimpleDescriptor};
use crate::error::{DecodingError, EncodingError, SchemaError};
use crate::expr::Expr;
use crate::factory::{CodecFactory, FieldMeta};
use crate::resolver::{Resolver, ResolverContext};
use crate::types::TypeTag;
use crate::value::Value;

/// A single-bit codec: 1 decodes to `true`, 0 to `false`.
///
/// The plain and boxed flavours differ only in the declared target type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BooleanCodec {
    boxed: bool,
}

impl BooleanCodec {
    /// Codec for a plain `bool` target.
    pub fn new() -> Self {
        BooleanCodec { boxed: false }
    }

    /// Codec for a `Box<bool>` target.
    pub fn boxed() -> Self {
        BooleanCodec { boxed: true }
    }
}

impl Codec for BooleanCodec {
    fn decode(
        &self,
        cursor: &mut BitCursor<'_>,
        _resolver: &mut Resolver<'_>,
        _builder: &dyn Builder,
    ) -> Result<Value, DecodingError> {
        Ok(Value::Bool(cursor.read_bool()?))
    }

    fn encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        _resolver: &mut Resolver<'_>,
    ) -> Result<(), EncodingError> {
        match value {
            Value::Bool(b) => {
                writer.write_bool(*b);
                Ok(())
            }
            other => Err(EncodingError::TypeMismatch {
                expected: TypeTag::BOOL,
                found: other.type_tag(),
            }),
        }
    }

    fn size(&self) -> Option<Expr> {
        Some(Expr::Int(1))
    }

    fn size_of(&self, _resolver: &Resolver<'_>) -> Result<u64, DecodingError> {
        Ok(1)
    }

    fn ty(&self) -> TypeTag {
        TypeTag::BOOL
    }

    fn types(&self) -> Vec<TypeTag> {
        if self.boxed {
            vec![TypeTag::BOXED_BOOL]
        } else {
            vec![TypeTag::BOOL]
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn descriptor(&self) -> Box<dyn CodecDescriptor + '_> {
        Box::new(SimpleDescriptor::new("a boolean", "1 bit"))
    }
}

/// Creates [`BooleanCodec`]s for bound `bool` and `Box<bool>` targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanCodecFactory;

impl CodecFactory for BooleanCodecFactory {
    fn create(
        &self,
        meta: &FieldMeta,
        target: &TypeTag,
        _context: &ResolverContext<'_>,
    ) -> Result<Option<Arc<dyn Codec>>, SchemaError> {
        if !meta.bound {
            return Ok(None);
        }
        let codec = if *target == TypeTag::BOOL {
            BooleanCodec::new()
        } else if *target == TypeTag::BOXED_BOOL {
            BooleanCodec::boxed()
        } else {
            return Ok(None);
        };
        Ok(Some(Arc::new(codec)))
    }
}
