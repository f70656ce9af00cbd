//! Stream and container writer for the rrc read codec
//!
//! Encodes aligned reads with the same models and context derivation the
//! decoder uses. Used to build containers for tests and tooling.

pub mod container;
pub mod encoder;

pub use container::ContainerWriter;
pub use encoder::{ReadEdits, ReadEncoder};

// Re-export core types from rrc-common
pub use rrc_common::{BasePair, CodecLimits};
