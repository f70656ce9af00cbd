//! Read reconstruction for the RRC reference-based read codec.
//!
//! A read is decoded field by field from an arithmetic-coded stream, each
//! field under a context derived from what was decoded before it, and then
//! rebuilt from the reference window at its alignment position:
//!
//! - **Field decoders** - length, position, flag, match flag, edit counts,
//!   variant offsets and substituted bases
//! - **Edit lists** - deletions and insertions of a mismatching read
//! - **Merge engine** - three-cursor sweep producing the read bytes
//! - **CIGAR builder** - edit descriptor from the same edit lists
//! - **Session** - model statistics and previous position/match carry
//!
//! # Decoding a stream
//!
//! ```no_run
//! use rrc_common::{ArithmeticDecoder, CodecLimits};
//! use rrc_core::{DecoderConfig, DecoderSession, ReferenceLoader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut loader = ReferenceLoader::open("ref.fa", 1 << 28)?;
//! let chr1 = loader.next_chromosome()?.ok_or("empty reference")?;
//!
//! let payload = std::fs::read("reads.bin")?;
//! let mut source = ArithmeticDecoder::new(&payload[..])?;
//! let mut session = DecoderSession::new(CodecLimits::default(), false, DecoderConfig::default())?;
//!
//! let record = session.decode_read(&mut source, &chr1)?;
//! println!("{} {} {}", record.position, record.cigar_string(), record.sequence_str());
//! # Ok(())
//! # }
//! ```

pub mod cigar;
pub mod edits;
pub mod env_cache;
pub mod fields;
pub mod merge;
pub mod record;
pub mod reference;
pub mod session;

pub use cigar::{absolute_to_relative, build_cigar, Cigar, CigarKind, CigarOp, RelativeEdits};
pub use edits::{EditCounts, EditLists, Insertion, Snp};
pub use merge::{copy_match, MergeStats, MergeStep, ReadMerger};
pub use record::{EditPath, ReadRecord};
pub use reference::{Reference, ReferenceLoader, DEFAULT_MAX_REFERENCE_LENGTH};
pub use session::{DecoderConfig, DecoderSession};
