// Decoded read record
// Everything one read decode produces, plus its SAM-style rendering

use std::borrow::Cow;
use std::io::{self, Write};

use crate::cigar::Cigar;
use crate::edits::{EditCounts, Snp};
use crate::merge::MergeStats;

/// Which path reconstructed the read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPath {
    /// Copied verbatim from the reference window
    Match,
    /// Rebuilt by the merge engine from decoded edits
    Edited { counts: EditCounts, stats: MergeStats },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    pub length: u32,
    /// 1-based alignment position on the current chromosome
    pub position: u32,
    pub flag: u32,
    pub reverse: bool,
    pub edit_path: EditPath,
    pub sequence: Vec<u8>,
    /// Substitutions in target order (empty for matches)
    pub snps: Vec<Snp>,
    pub cigar: Cigar,
    /// CIGAR carried verbatim in the stream, overriding `cigar`
    pub explicit_cigar: Option<String>,
}

impl ReadRecord {
    pub fn is_match(&self) -> bool {
        self.edit_path == EditPath::Match
    }

    pub fn sequence_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.sequence)
    }

    /// CIGAR to report: the explicit one if the stream carried it
    pub fn cigar_string(&self) -> String {
        match &self.explicit_cigar {
            Some(cigar) => cigar.clone(),
            None => self.cigar.to_string(),
        }
    }

    /// One tab-separated SAM line without quality or tags
    pub fn write_sam_line<W: Write>(&self, writer: &mut W, qname: &str, rname: &str) -> io::Result<()> {
        writeln!(
            writer,
            "{qname}\t{}\t{rname}\t{}\t255\t{}\t*\t0\t0\t{}\t*",
            self.flag,
            self.position,
            self.cigar_string(),
            self.sequence_str()
        )
    }
}
