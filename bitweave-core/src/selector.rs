//! Discriminator strategies for [`SwitchingCodec`](crate::SwitchingCodec).

use std::fmt;
use std::sync::Arc;

use crate::buffer::{BitCursor, BitWriter};
use crate::codec::Codec;
use crate::error::{DecodingError, EncodingError, SchemaError};
use crate::expr::{Expr, ExprError};
use crate::resolver::Resolver;
use crate::value::Value;

/// Picks exactly one candidate codec per decode.
///
/// A selector owns its candidates in registration order. The same codec may
/// appear more than once.
pub trait CodecSelector: fmt::Debug + Send + Sync {
    /// Reads the discriminator and returns the candidate it designates.
    ///
    /// Consumes exactly the discriminator width whichever candidate wins.
    fn select(
        &self,
        cursor: &mut BitCursor<'_>,
        resolver: &Resolver<'_>,
    ) -> Result<&Arc<dyn Codec>, DecodingError>;

    /// Write-side mirror of [`select`](Self::select): picks the candidate for
    /// `value` and writes its discriminator.
    fn select_for_encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        resolver: &Resolver<'_>,
    ) -> Result<&Arc<dyn Codec>, EncodingError>;

    /// All candidates, in registration order.
    fn choices(&self) -> &[Arc<dyn Codec>];

    /// Width of the discriminator itself, in bits.
    fn size(&self) -> Expr;

    fn size_of(&self, resolver: &Resolver<'_>) -> Result<u64, DecodingError> {
        let bits = self.size().eval_int(resolver)?;
        u64::try_from(bits).map_err(|_| DecodingError::OutOfRange {
            what: "discriminator width",
            value: bits,
        })
    }

    /// Names the selector itself reads from the resolver.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Writes a human description of how the candidate is chosen.
    fn document(&self, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// Selects on a fixed-width unsigned prefix read from the stream.
#[derive(Debug, Clone)]
pub struct TypePrefixSelector {
    width: u32,
    prefixes: Vec<u64>,
    choices: Vec<Arc<dyn Codec>>,
}

impl TypePrefixSelector {
    pub fn new(width: u32) -> Result<Self, SchemaError> {
        if width > 64 {
            return Err(SchemaError::DiscriminatorTooWide(width));
        }
        Ok(TypePrefixSelector {
            width,
            prefixes: Vec::new(),
            choices: Vec::new(),
        })
    }

    /// Registers `codec` under `prefix`.
    pub fn with_choice(mut self, prefix: u64, codec: Arc<dyn Codec>) -> Result<Self, SchemaError> {
        if self.width < 64 && prefix >> self.width != 0 {
            return Err(SchemaError::PrefixTooWide {
                prefix,
                width: self.width,
            });
        }
        if self.prefixes.contains(&prefix) {
            return Err(SchemaError::DuplicatePrefix(prefix));
        }
        self.prefixes.push(prefix);
        self.choices.push(codec);
        Ok(self)
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

impl CodecSelector for TypePrefixSelector {
    fn select(
        &self,
        cursor: &mut BitCursor<'_>,
        _resolver: &Resolver<'_>,
    ) -> Result<&Arc<dyn Codec>, DecodingError> {
        let at = cursor.position();
        let value = cursor.read_bits(self.width)?;
        let index = self
            .prefixes
            .iter()
            .position(|p| *p == value)
            .ok_or(DecodingError::NoMatchingCandidate {
                value,
                width: self.width,
            })?;
        log::trace!("prefix {:#x} at bit {} selects candidate {}", value, at, index);
        Ok(&self.choices[index])
    }

    fn select_for_encode(
        &self,
        value: &Value,
        writer: &mut BitWriter,
        _resolver: &Resolver<'_>,
    ) -> Result<&Arc<dyn Codec>, EncodingError> {
        let index = self
            .choices
            .iter()
            .position(|c| c.accepts(value))
            .ok_or_else(|| EncodingError::NoCandidateForValue(value.type_tag()))?;
        writer.write_bits(self.prefixes[index], self.width)?;
        Ok(&self.choices[index])
    }

    fn choices(&self) -> &[Arc<dyn Codec>] {
        &self.choices
    }

    fn size(&self) -> Expr {
        Expr::Int(self.width as i64)
    }

    fn document(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "a {}-bit prefix selects ", self.width)?;
        for (i, (prefix, codec)) in self.prefixes.iter().zip(&self.choices).enumerate() {
            if i > 0 {
                out.write_str("; ")?;
            }
            write!(out, "{:#x} for ", prefix)?;
            codec.descriptor().write_reference(out)?;
        }
        Ok(())
    }
}

/// Selects the first candidate whose condition holds; reads no bits.
#[derive(Debug, Clone, Default)]
pub struct ConditionalSelector {
    conditions: Vec<Expr>,
    choices: Vec<Arc<dyn Codec>>,
}

impl ConditionalSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_choice(mut self, condition: Expr, codec: Arc<dyn Codec>) -> Self {
        self.conditions.push(condition);
        self.choices.push(codec);
        self
    }

    fn first_true(&self, resolver: &Resolver<'_>) -> Result<Option<usize>, ExprError> {
        for (index, condition) in self.conditions.iter().enumerate() {
            if condition.eval_bool(resolver)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }
}

impl CodecSelector for ConditionalSelector {
    fn select(
        &self,
        _cursor: &mut BitCursor<'_>,
        resolver: &Resolver<'_>,
    ) -> Result<&Arc<dyn Codec>, DecodingError> {
        let index = self
            .first_true(resolver)?
            .ok_or(DecodingError::NoSatisfiedCondition)?;
        log::trace!("condition {} selects candidate {}", self.conditions[index], index);
        Ok(&self.choices[index])
    }

    fn select_for_encode(
        &self,
        value: &Value,
        _writer: &mut BitWriter,
        resolver: &Resolver<'_>,
    ) -> Result<&Arc<dyn Codec>, EncodingError> {
        let index = self
            .first_true(resolver)?
            .ok_or_else(|| EncodingError::NoCandidateForValue(value.type_tag()))?;
        let codec = &self.choices[index];
        if !codec.accepts(value) {
            return Err(EncodingError::TypeMismatch {
                expected: codec.ty(),
                found: value.type_tag(),
            });
        }
        Ok(codec)
    }

    fn choices(&self) -> &[Arc<dyn Codec>] {
        &self.choices
    }

    fn size(&self) -> Expr {
        Expr::Int(0)
    }

    fn dependencies(&self) -> Vec<String> {
        self.conditions
            .iter()
            .flat_map(|c| c.references())
            .map(String::from)
            .collect()
    }

    fn document(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for (i, (condition, codec)) in self.conditions.iter().zip(&self.choices).enumerate() {
            if i > 0 {
                out.write_str("; otherwise ")?;
            }
            write!(out, "if {} then ", condition)?;
            codec.descriptor().write_reference(out)?;
        }
        Ok(())
    }
}
