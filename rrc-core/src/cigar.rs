//! Edit descriptor (CIGAR) for reconstructed reads
//!
//! Substitutions are alignment matches in CIGAR terms, so only deletions and
//! insertions break the `M` runs.

use std::fmt;

use crate::edits::Insertion;

/// Deletion and insertion positions as gaps from the previous edit of the
/// same kind (the first one measured from 0)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelativeEdits {
    pub deletions: Vec<u32>,
    pub insertions: Vec<u32>,
}

fn gaps(positions: impl Iterator<Item = u32>) -> Vec<u32> {
    let mut previous = 0;
    positions
        .map(|p| {
            let gap = p - previous;
            previous = p;
            gap
        })
        .collect()
}

/// Convert sorted absolute edit positions to per-kind gaps
pub fn absolute_to_relative(deletions: &[u32], insertions: &[Insertion]) -> RelativeEdits {
    RelativeEdits {
        deletions: gaps(deletions.iter().copied()),
        insertions: gaps(insertions.iter().map(|i| i.position)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarKind {
    Match,
    Insertion,
    Deletion,
}

impl CigarKind {
    pub fn code(self) -> char {
        match self {
            CigarKind::Match => 'M',
            CigarKind::Insertion => 'I',
            CigarKind::Deletion => 'D',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

/// Run-length merged edit script of one read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    ops: Vec<CigarOp>,
}

impl Cigar {
    /// CIGAR of a read identical to its reference window
    pub fn all_match(read_length: u32) -> Self {
        let mut cigar = Cigar::default();
        cigar.push(CigarKind::Match, read_length);
        cigar
    }

    pub fn ops(&self) -> &[CigarOp] {
        &self.ops
    }

    fn push(&mut self, kind: CigarKind, len: u32) {
        if len == 0 {
            return;
        }
        match self.ops.last_mut() {
            Some(last) if last.kind == kind => last.len += len,
            _ => self.ops.push(CigarOp { kind, len }),
        }
    }

    /// Read bases covered (M + I)
    pub fn query_len(&self) -> u32 {
        self.ops
            .iter()
            .filter(|op| op.kind != CigarKind::Deletion)
            .map(|op| op.len)
            .sum()
    }

    /// Reference bases covered (M + D)
    pub fn reference_span(&self) -> u32 {
        self.ops
            .iter()
            .filter(|op| op.kind != CigarKind::Insertion)
            .map(|op| op.len)
            .sum()
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for op in &self.ops {
            write!(f, "{}{}", op.len, op.kind.code())?;
        }
        Ok(())
    }
}

/// Build the CIGAR of a read from its relative edit lists.
///
/// Walks target and reference cursors with the merge engine's precedence: a
/// deletion at or behind the reference cursor, then an insertion at the
/// current target index, then a match. Edits past the end of the read are
/// ignored.
pub fn build_cigar(edits: &RelativeEdits, read_length: u32) -> Cigar {
    let accumulate = |gaps: &[u32]| -> Vec<u32> {
        gaps.iter()
            .scan(0u32, |acc, &gap| {
                *acc += gap;
                Some(*acc)
            })
            .collect()
    };
    let deletions = accumulate(&edits.deletions);
    let insertions = accumulate(&edits.insertions);

    let mut cigar = Cigar::default();
    let (mut t, mut r) = (0u32, 0u32);
    let (mut d, mut i) = (0usize, 0usize);
    loop {
        if d < deletions.len() && deletions[d] <= r {
            cigar.push(CigarKind::Deletion, 1);
            r += 1;
            d += 1;
        } else if t < read_length && i < insertions.len() && insertions[i] == t {
            cigar.push(CigarKind::Insertion, 1);
            t += 1;
            i += 1;
        } else if t < read_length {
            cigar.push(CigarKind::Match, 1);
            t += 1;
            r += 1;
        } else {
            break;
        }
    }
    cigar
}
