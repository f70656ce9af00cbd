// RRC Common Library
// Shared types, the arithmetic-coding primitive and the context model bank

pub mod arithmetic;
pub mod container;
pub mod error;
pub mod frequency;
pub mod models;
pub mod types;
pub mod varint;

// Re-export commonly used types
pub use types::{BasePair, CodecLimits};
pub use types::{
    FLAG_ALPHABET_SIZE, MAX_CODEC_READ_LENGTH, REVERSE_STRAND_MASK, RRC_FORMAT_VERSION, RRC_MAGIC,
};

// Re-export error types
pub use error::{CodecError, Result};

// Re-export the coding primitive
pub use arithmetic::{ArithmeticDecoder, ArithmeticEncoder, SymbolDecoder, SymbolEncoder};
pub use frequency::{FrequencyTable, TableInit};

// Re-export models and context derivation
pub use models::{
    match_context, snp_position_bucket, variant_context, ContextModel, GrowableAlphabet, ModelBank,
};

// Re-export container framing
pub use container::ContainerHeader;
pub use varint::{decode_varint, encode_varint, read_varint, read_varint_u32, write_varint};
