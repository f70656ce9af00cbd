//! rrc container reader/decompressor
//!
//! Walks a container block by block, loading the matching reference
//! chromosome for each block, and decodes every read in stream order.

mod decompressor;

pub use decompressor::{read_header, DecodedRead, Decompressor};
pub use rrc_core::DecoderConfig as DecompressorConfig;
