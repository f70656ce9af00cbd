//! Error types for the rrc codec

use thiserror::Error;

/// Result type alias for rrc codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Error types that can occur while coding reads
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream decoded to something no encoder could have produced
    #[error("Corrupted stream: {0}")]
    Corrupt(String),

    /// A derived context id falls outside its model
    #[error("Context {context} out of range for {model} model ({limit} contexts)")]
    ContextOutOfRange {
        /// Model name
        model: &'static str,
        /// Offending context id
        context: u32,
        /// Number of contexts in the model
        limit: u32,
    },

    /// A symbol falls outside its alphabet or has no probability mass
    #[error("Symbol {symbol} not codable by {model} model (alphabet {alphabet})")]
    SymbolOutOfRange {
        /// Model name
        model: &'static str,
        /// Offending symbol
        symbol: u32,
        /// Alphabet size of the model
        alphabet: u32,
    },

    /// A configured ceiling was reached
    #[error("Capacity exceeded: {what} is {value}, limit {limit}")]
    CapacityExceeded {
        /// What overflowed
        what: &'static str,
        /// Value that was requested
        value: u64,
        /// Configured ceiling
        limit: u64,
    },

    /// A read reaches past the end of the loaded reference
    #[error("Reference overrun: base {position} requested, reference has {reference_len}")]
    ReferenceOverrun {
        /// 1-based reference position requested
        position: u64,
        /// Length of the loaded reference
        reference_len: u64,
    },

    /// The arithmetic decoder ran out of input
    #[error("Arithmetic stream truncated")]
    TruncatedStream,

    /// Malformed container framing
    #[error("Invalid container: {0}")]
    InvalidContainer(String),
}

impl CodecError {
    /// Stream corruption: fatal for the session, decoding must stop
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            CodecError::Corrupt(_)
                | CodecError::ContextOutOfRange { .. }
                | CodecError::SymbolOutOfRange { .. }
                | CodecError::ReferenceOverrun { .. }
                | CodecError::TruncatedStream
        )
    }

    /// A configured ceiling was exceeded
    pub fn is_capacity(&self) -> bool {
        matches!(self, CodecError::CapacityExceeded { .. })
    }

    /// Shorthand for a `Corrupt` error
    pub fn corrupt(msg: impl Into<String>) -> Self {
        CodecError::Corrupt(msg.into())
    }
}
