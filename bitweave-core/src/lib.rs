//! Bitweave decodes and encodes bit-packed binary formats from a tree of
//! codecs built at startup.
//!
//! Core concepts:
//! - **Codec**: decode, encode and size logic for one schema node
//! - **BitCursor**: bit-addressable read position over a byte buffer
//! - **Resolver**: scoped lookup of earlier fields and external parameters
//! - **Expr**: a size, count or condition formula evaluated against a resolver
//! - **SwitchingCodec**: a discriminated union choosing one candidate per decode
//! - **Builder**: instantiates the records composite codecs fill
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bitweave_core::{
//!     engine, BooleanCodec, CodecConfig, IntType, NumericCodec, SwitchingCodec,
//!     TypePrefixSelector, Value,
//! };
//!
//! let selector = TypePrefixSelector::new(1)?
//!     .with_choice(0, Arc::new(BooleanCodec::new()))?
//!     .with_choice(1, Arc::new(NumericCodec::new(IntType::U8).with_width(7)))?;
//! let codec = SwitchingCodec::new(selector);
//!
//! let value = engine::decode(&codec, &[0b1000_0101], &CodecConfig::default())?;
//! assert_eq!(value, Value::UInt(5));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Wire format
//!
//! Bits are consumed MSB first unless the config selects LSB first.
//! Discriminator widths belong to each selector; nothing is byte aligned
//! unless a codec says so.

mod buffer;
mod builder;
pub mod codec;
mod config;
pub mod engine;
mod error;
mod expr;
mod factory;
mod resolver;
mod selector;
mod types;
mod value;

pub use buffer::{BitCursor, BitOrder, BitWriter, BufferError};
pub use builder::{Builder, DefaultBuilder};
pub use codec::{
    BooleanCodec, BooleanCodecFactory, ByteOrder, Codec, CodecDescriptor, ListCodec, NumericCodec,
    NumericCodecFactory, RecordCodec, RecordCodecBuilder, SimpleDescriptor, SwitchingCodec,
    reconcile_sizes,
};
pub use config::{CodecConfig, ConfigError};
pub use error::{DecodingError, EncodingError, InstantiationError, SchemaError};
pub use expr::{BinaryOp, Expr, ExprError};
pub use factory::{CodecFactory, CompositeCodecFactory, FieldMeta};
pub use resolver::{Resolver, ResolverContext};
pub use selector::{CodecSelector, ConditionalSelector, TypePrefixSelector};
pub use types::{IntType, TypeHierarchy, TypeTag};
pub use value::{Record, Value};
