use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::buffer::{BitCursor, BitWriter, BufferError};
use crate::builder::Builder;
use crate::codec::{Codec, CodecDescriptor, SimpleDescriptor};
use crate::error::{DecodingError, EncodingError, SchemaError};
use crate::expr::{Expr, ExprError};
use crate::factory::{CodecFactory, FieldMeta};
use crate::resolver::{Resolver, ResolverContext};
use crate::types::{IntType, TypeTag};
use crate::value::Value;

/// Byte order of multi-byte integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// The whole width is read as one value in cursor bit order.
    #[default]
    BigEndian,
    /// Whole bytes are read least significant first; leftover high bits last.
    LittleEndian,
}

/// Integer codec with a fixed or resolver-dependent width.
///
/// Unsigned types decode to [`Value::UInt`], signed types to [`Value::Int`]
/// sign-extended from the decoded width.
#[derive(Debug, Clone)]
pub struct NumericCodec {
    int_type: IntType,
    width: Expr,
    byte_order: ByteOrder,
}

impl NumericCodec {
    /// Codec reading the natural width of `int_type`, big endian.
    pub fn new(int_type: IntType) -> Self {
        NumericCodec {
            int_type,
            width: Expr::Int(int_type.bits() as i64),
            byte_order: ByteOrder::BigEndian,
        }
    }

    pub fn with_width(mut self, width: impl Into<Expr>) -> Self {
        self.width = width.into();
        self
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn int_type(&self) -> IntType {
        self.int_type
    }

    /// Evaluates the width; the inner `Err` carries a width outside
    /// `1..=bits(int_type)`.
    fn checked_width(&self, resolver: &Resolver<'_>) -> Result<Result<u32, i64>, ExprError> {
        let width = self.width.eval_int(resolver)?;
        if (1..=self.int_type.bits() as i64).contains(&width) {
            Ok(Ok(width as u32))
        } else {
            Ok(Err(width))
        }
    }

    fn range(&self, width: u32) -> (i128, i128) {
        if self.int_type.is_signed() {
            (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
        } else {
            (0, (1i128 << width) - 1)
        }
    }

    fn read_raw(&self, cursor: &mut BitCursor<'_>, width: u32) -> Result<u64, BufferError> {
        match self.byte_order {
            ByteOrder::BigEndian => cursor.read_bits(width),
            ByteOrder::LittleEndian => {
                if cursor.remaining() < width as u64 {
                    return Err(BufferError::OutOfData {
                        position: cursor.position(),
                        requested: width as u64,
                        available: cursor.remaining(),
                    });
                }
                let mut value = 0u64;
                let mut shift = 0;
                let mut left = width;
                while left >= 8 {
                    value |= cursor.read_bits(8)? << shift;
                    shift += 8;
                    left -= 8;
                }
                if left > 0 {
                    value |= cursor.read_bits(left)? << shift;
                }
                Ok(value)
            }
        }
    }

    fn write_raw(&self, writer: &mut BitWriter, raw: u64, width: u32) -> Result<(), BufferError> {
        match self.byte_order {
            ByteOrder::BigEndian => writer.write_bits(raw, width),
            ByteOrder::LittleEndian => {
                let mut shift = 0;
                let mut left = width;
                while left >= 8 {
                    writer.write_bits((raw >> shift) & 0xFF, 8)?;
                    shift += 8;
                    left -= 8;
                }
                if left > 0 {
                    writer.write_bits(raw >> shift, left)?;
                }
                Ok(())
            }
        }
    }
}

fn sign_extend(raw: u64, width: u32) -> i64 {
    if width >= 64 {
        return raw as i64;
    }
    if (raw >> (width - 1)) & 1 == 1 {
        (raw | !((1u64 << width) - 1)) as i64
    } else {
        raw as i64
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

impl Codec for NumericCodec {
    fn decode(
        &self,
        cursor: &mut BitCursor<'_>,
        resolver: &mut Resolver<'_>,
        _builder: &dyn Builder,
    ) -> Result<Value, DecodingError> {
        let width = self
            .checked_width(resolver)?
            .map_err(|value| DecodingError::OutOfRange {
                what: "width",
                value,
            })?;
        let raw = self.read_raw(cursor, width)?;
        if self.int_type.is_signed() {
            Ok(Value::Int(sign_extend(raw, width)))
        } else {
            Ok(Value::UInt(raw))
        }
    }

    fn encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        resolver: &mut Resolver<'_>,
    ) -> Result<(), EncodingError> {
        let v = match value {
            Value::Int(v) => *v as i128,
            Value::UInt(v) => *v as i128,
            other => {
                return Err(EncodingError::TypeMismatch {
                    expected: self.int_type.type_tag(),
                    found: other.type_tag(),
                });
            }
        };
        let width = self
            .checked_width(resolver)?
            .map_err(|value| EncodingError::OutOfRange {
                what: "width",
                value,
            })?;
        let (min, max) = self.range(width);
        if v < min || v > max {
            return Err(EncodingError::ValueOutOfRange { value: v, bits: width });
        }
        self.write_raw(writer, (v as u64) & mask(width), width)?;
        Ok(())
    }

    fn size(&self) -> Option<Expr> {
        Some(self.width.clone())
    }

    fn ty(&self) -> TypeTag {
        self.int_type.type_tag()
    }

    fn accepts(&self, value: &Value) -> bool {
        let v = match value {
            Value::Int(v) => *v as i128,
            Value::UInt(v) => *v as i128,
            _ => return false,
        };
        let width = self
            .width
            .constant()
            .map_or(self.int_type.bits(), |w| w.clamp(1, self.int_type.bits() as i64) as u32);
        let (min, max) = self.range(width);
        v >= min && v <= max
    }

    fn dependencies(&self) -> Vec<String> {
        self.width.references().into_iter().map(String::from).collect()
    }

    fn descriptor(&self) -> Box<dyn CodecDescriptor + '_> {
        let signedness = if self.int_type.is_signed() {
            "a signed"
        } else {
            "an unsigned"
        };
        let order = match self.byte_order {
            ByteOrder::BigEndian => "big endian",
            ByteOrder::LittleEndian => "little endian",
        };
        Box::new(SimpleDescriptor::new(
            format!("{} integer of {} bits, {}", signedness, self.width, order),
            SimpleDescriptor::size_text(Some(&self.width)),
        ))
    }
}

/// Creates [`NumericCodec`]s for bound integer targets.
///
/// A size in the field metadata overrides the natural width; its references
/// must be available in the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericCodecFactory;

impl CodecFactory for NumericCodecFactory {
    fn create(
        &self,
        meta: &FieldMeta,
        target: &TypeTag,
        context: &ResolverContext<'_>,
    ) -> Result<Option<Arc<dyn Codec>>, SchemaError> {
        let Some(int_type) = IntType::from_tag(target) else {
            return Ok(None);
        };
        if !meta.bound {
            return Ok(None);
        }
        let mut codec = NumericCodec::new(int_type).with_byte_order(meta.byte_order);
        if let Some(size) = &meta.size {
            context.check(size)?;
            codec = codec.with_width(size.clone());
        }
        Ok(Some(Arc::new(codec)))
    }
}
