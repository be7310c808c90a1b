use serde::{Deserialize, Serialize};

/// Error type for bit-level reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("out of data: {requested} bits requested at bit {position}, {available} available")]
    OutOfData {
        position: u64,
        requested: u64,
        available: u64,
    },
    #[error("cannot transfer {0} bits at once (max 64)")]
    TooWide(u32),
    #[error("value {value} does not fit in {bits} bits")]
    ValueTooWide { value: u64, bits: u32 },
}

/// Order in which bits are taken out of each byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    /// Bit 7 of each byte comes first; values are assembled MSB first.
    #[default]
    MsbFirst,
    /// Bit 0 of each byte comes first; values are assembled LSB first.
    LsbFirst,
}

impl BitOrder {
    fn shift(self, bit_index: u64) -> u32 {
        let within = (bit_index % 8) as u32;
        match self {
            BitOrder::MsbFirst => 7 - within,
            BitOrder::LsbFirst => within,
        }
    }
}

/// A bit-addressable read position over a borrowed byte slice.
///
/// The cursor is handed down the codec tree by `&mut`. It is intentionally
/// not `Clone`: two cursors over the same decode would drift apart.
#[derive(Debug)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    position: u64,
    order: BitOrder,
}

impl<'a> BitCursor<'a> {
    /// Creates a cursor at bit 0 using MSB-first bit order.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_order(data, BitOrder::MsbFirst)
    }

    pub fn with_order(data: &'a [u8], order: BitOrder) -> Self {
        BitCursor {
            data,
            position: 0,
            order,
        }
    }

    pub fn order(&self) -> BitOrder {
        self.order
    }

    /// Current offset in bits from the start of the buffer.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total number of bits in the underlying buffer.
    pub fn len(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bits left between the current position and the end of the buffer.
    pub fn remaining(&self) -> u64 {
        self.len() - self.position
    }

    fn ensure(&self, requested: u64) -> Result<(), BufferError> {
        if requested > self.remaining() {
            return Err(BufferError::OutOfData {
                position: self.position,
                requested,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Reads one bit, returning 0 or 1.
    pub fn read_bit(&mut self) -> Result<u8, BufferError> {
        self.ensure(1)?;
        let byte = self.data[(self.position / 8) as usize];
        let bit = (byte >> self.order.shift(self.position)) & 1;
        self.position += 1;
        Ok(bit)
    }

    /// Reads exactly one bit and interprets it as a boolean.
    pub fn read_bool(&mut self) -> Result<bool, BufferError> {
        Ok(self.read_bit()? == 1)
    }

    /// Reads `n` bits (at most 64) as an unsigned value.
    ///
    /// On failure the position is left untouched.
    pub fn read_bits(&mut self, n: u32) -> Result<u64, BufferError> {
        if n > 64 {
            return Err(BufferError::TooWide(n));
        }
        self.ensure(n as u64)?;
        let mut value = 0u64;
        for i in 0..n {
            let bit = self.read_bit()? as u64;
            match self.order {
                BitOrder::MsbFirst => value = (value << 1) | bit,
                BitOrder::LsbFirst => value |= bit << i,
            }
        }
        Ok(value)
    }

    /// Advances the position by `n` bits without interpreting them.
    pub fn skip(&mut self, n: u64) -> Result<(), BufferError> {
        self.ensure(n)?;
        self.position += n;
        Ok(())
    }
}

/// The write-side mirror of [`BitCursor`], backed by an owned byte vector.
#[derive(Debug, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    len: u64,
    order: BitOrder,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(order: BitOrder) -> Self {
        BitWriter {
            data: Vec::new(),
            len: 0,
            order,
        }
    }

    pub fn order(&self) -> BitOrder {
        self.order
    }

    /// Number of bits written so far.
    pub fn position(&self) -> u64 {
        self.len
    }

    pub fn write_bit(&mut self, bit: u8) {
        if self.len % 8 == 0 {
            self.data.push(0);
        }
        if bit & 1 == 1 {
            let shift = self.order.shift(self.len);
            if let Some(last) = self.data.last_mut() {
                *last |= 1 << shift;
            }
        }
        self.len += 1;
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_bit(value as u8);
    }

    /// Writes the low `n` bits of `value`, in the writer's bit order.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<(), BufferError> {
        if n > 64 {
            return Err(BufferError::TooWide(n));
        }
        if n < 64 && value >> n != 0 {
            return Err(BufferError::ValueTooWide { value, bits: n });
        }
        for i in 0..n {
            let bit = match self.order {
                BitOrder::MsbFirst => (value >> (n - 1 - i)) & 1,
                BitOrder::LsbFirst => (value >> i) & 1,
            };
            self.write_bit(bit as u8);
        }
        Ok(())
    }

    /// Returns the written bytes; a trailing partial byte is zero-padded.
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}
