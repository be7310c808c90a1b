//! The codec abstraction and its implementations.

use std::fmt;

use crate::buffer::{BitCursor, BitWriter};
use crate::builder::Builder;
use crate::error::{DecodingError, EncodingError};
use crate::expr::Expr;
use crate::resolver::Resolver;
use crate::types::TypeTag;
use crate::value::Value;

mod boolean;
mod list;
mod numeric;
mod record;
mod switching;

pub use boolean::{BooleanCodec, BooleanCodecFactory};
pub use list::ListCodec;
pub use numeric::{ByteOrder, NumericCodec, NumericCodecFactory};
pub use record::{RecordCodec, RecordCodecBuilder};
pub use switching::{SwitchingCodec, reconcile_sizes};

/// Decode, encode and size logic for one schema node.
///
/// Codecs are immutable once built. Every method only touches the
/// caller-supplied cursor, writer, resolver or builder, so one codec tree can
/// serve concurrent decodes on different threads.
pub trait Codec: fmt::Debug + Send + Sync {
    /// Reads a value from `cursor`.
    fn decode(
        &self,
        cursor: &mut BitCursor<'_>,
        resolver: &mut Resolver<'_>,
        builder: &dyn Builder,
    ) -> Result<Value, DecodingError>;

    /// Writes `value`, consuming exactly the bits `decode` would read back.
    fn encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        resolver: &mut Resolver<'_>,
    ) -> Result<(), EncodingError>;

    /// Size in bits as a formula, or `None` when no single formula exists.
    fn size(&self) -> Option<Expr>;

    /// Size in bits for the given resolver state.
    fn size_of(&self, resolver: &Resolver<'_>) -> Result<u64, DecodingError> {
        let size = self.size().ok_or(DecodingError::UndefinedSize)?;
        let bits = size.eval_int(resolver)?;
        u64::try_from(bits).map_err(|_| DecodingError::OutOfRange {
            what: "size",
            value: bits,
        })
    }

    /// The single static type of decoded values.
    fn ty(&self) -> TypeTag;

    /// Every type this codec may produce.
    fn types(&self) -> Vec<TypeTag> {
        vec![self.ty()]
    }

    /// Whether `encode` can write `value`.
    fn accepts(&self, value: &Value) -> bool {
        value.type_tag() == self.ty()
    }

    /// Names this codec reads from the resolver.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    fn descriptor(&self) -> Box<dyn CodecDescriptor + '_>;
}

/// Documentation surface of a codec. The string formats are stable.
pub trait CodecDescriptor {
    /// Short noun phrase naming what is decoded.
    fn label(&self) -> String;

    /// Human description of the size.
    fn size(&self) -> String;

    fn has_full_description(&self) -> bool {
        false
    }

    /// Writes the form used when another description refers to this codec.
    fn write_reference(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(&self.label())
    }

    fn write_one_liner(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str(&self.label())
    }
}

/// Fixed label/size descriptor used by the primitive and composite codecs.
#[derive(Debug, Clone)]
pub struct SimpleDescriptor {
    label: String,
    size: String,
}

impl SimpleDescriptor {
    pub fn new(label: impl Into<String>, size: impl Into<String>) -> Self {
        SimpleDescriptor {
            label: label.into(),
            size: size.into(),
        }
    }

    /// Describes a size formula, or "variable" when there is none.
    pub fn size_text(size: Option<&Expr>) -> String {
        match size {
            Some(Expr::Int(1)) => "1 bit".to_string(),
            Some(expr) => format!("{} bits", expr),
            None => "variable".to_string(),
        }
    }
}

impl CodecDescriptor for SimpleDescriptor {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn size(&self) -> String {
        self.size.clone()
    }
}
