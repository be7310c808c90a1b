use crate::buffer::BufferError;
use crate::expr::ExprError;
use crate::types::TypeTag;

/// Error raised by the [`Builder`](crate::Builder) when it cannot produce a
/// target container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstantiationError {
    #[error("cannot instantiate abstract type {0}")]
    Abstract(TypeTag),
    #[error("unknown type {0}")]
    Unknown(TypeTag),
}

/// Error type for decoding.
///
/// Every variant is fatal to the current decode call; nothing in the engine
/// retries or falls back.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodingError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("discriminator {value:#x} ({width} bits) matches no candidate")]
    NoMatchingCandidate { value: u64, width: u32 },
    #[error("no selector condition holds")]
    NoSatisfiedCondition,
    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: i64 },
    #[error(transparent)]
    Instantiation(#[from] InstantiationError),
    #[error("size is not defined for this codec")]
    UndefinedSize,
    #[error("{remaining} bits left unconsumed after decode")]
    TrailingData { remaining: u64 },
}

impl DecodingError {
    /// True if the cursor ran out of bits.
    pub fn is_out_of_data(&self) -> bool {
        matches!(self, DecodingError::Buffer(BufferError::OutOfData { .. }))
    }

    /// True if an expression referenced a name the resolver did not hold.
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, DecodingError::Expr(ExprError::UnresolvedReference(_)))
    }
}

/// Error type for encoding.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("expected a value of type {expected}, found {found}")]
    TypeMismatch { expected: TypeTag, found: TypeTag },
    #[error("no candidate accepts a value of type {0}")]
    NoCandidateForValue(TypeTag),
    #[error("value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: i128, bits: u32 },
    #[error("missing field: {0}")]
    MissingField(String),
    #[error("expected {expected} elements, found {found}")]
    LengthMismatch { expected: u64, found: u64 },
    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: i64 },
}

/// Error raised while a codec tree is being assembled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("field {field} references {name}, which is not available at that point")]
    UnresolvedReference { field: String, name: String },
    #[error("reference to unknown name {0}")]
    UnknownReference(String),
    #[error("duplicate field: {0}")]
    DuplicateField(String),
    #[error("prefix {prefix:#x} does not fit in {width} bits")]
    PrefixTooWide { prefix: u64, width: u32 },
    #[error("prefix {0:#x} registered twice")]
    DuplicatePrefix(u64),
    #[error("discriminator width {0} exceeds 64 bits")]
    DiscriminatorTooWide(u32),
    #[error("type {0} would become its own ancestor")]
    CyclicType(TypeTag),
}
