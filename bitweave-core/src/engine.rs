//! Top-level decode and encode entry points.

use crate::buffer::{BitCursor, BitWriter};
use crate::builder::{Builder, DefaultBuilder};
use crate::codec::Codec;
use crate::config::CodecConfig;
use crate::error::{DecodingError, EncodingError};
use crate::value::Value;

/// Decodes one value from `bytes` using the [`DefaultBuilder`].
pub fn decode(codec: &dyn Codec, bytes: &[u8], config: &CodecConfig) -> Result<Value, DecodingError> {
    decode_with(codec, bytes, config, &DefaultBuilder::new())
}

/// Decodes one value from `bytes`, instantiating records through `builder`.
///
/// Padding in the last byte is always tolerated. Whole unread bytes fail
/// with [`DecodingError::TrailingData`] unless the config allows them.
pub fn decode_with(
    codec: &dyn Codec,
    bytes: &[u8],
    config: &CodecConfig,
    builder: &dyn Builder,
) -> Result<Value, DecodingError> {
    let mut cursor = BitCursor::with_order(bytes, config.bit_order);
    let mut resolver = config.resolver();
    log::debug!("decoding {} from {} bytes", codec.ty(), bytes.len());
    let value = codec.decode(&mut cursor, &mut resolver, builder)?;
    let remaining = cursor.remaining();
    if !config.allow_trailing_bits && remaining >= 8 {
        return Err(DecodingError::TrailingData { remaining });
    }
    log::debug!("decoded {} in {} bits, {} left", codec.ty(), cursor.position(), remaining);
    Ok(value)
}

/// Encodes `value`, padding the final byte with zero bits.
pub fn encode(codec: &dyn Codec, value: &Value, config: &CodecConfig) -> Result<Vec<u8>, EncodingError> {
    let mut writer = BitWriter::with_order(config.bit_order);
    let mut resolver = config.resolver();
    codec.encode(value, &mut writer, &mut resolver)?;
    log::debug!("encoded {} in {} bits", codec.ty(), writer.position());
    Ok(writer.finish())
}
