// Reconstruction merge engine
// Rebuilds a read from its reference window and the decoded edit lists with
// three forward-only cursors (reference, deletion, insertion)

use rrc_common::{BasePair, CodecError, Result};

use crate::edits::Insertion;
use crate::env_cache::debug_merge;
use crate::reference::Reference;

/// Exact match: the read is the reference window itself
pub fn copy_match(reference: &Reference, position: u32, length: u32) -> Result<Vec<u8>> {
    Ok(reference.window(position, length)?.to_vec())
}

/// One transition of the merge state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    /// Drop one reference base without producing a target byte
    SkippingDeletion { reference_offset: u32 },
    /// Copy the reference base under the cursor to the next target slot
    CopyingReference { reference_offset: u32 },
    /// Write an inserted base without moving the reference cursor
    ApplyingInsertion { target_offset: u32, base: BasePair },
}

/// How the target bytes of one read were produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub copied: u32,
    pub substituted: u32,
    pub inserted: u32,
    pub deleted: u32,
}

impl MergeStats {
    /// Target bytes written, whatever their source
    pub fn written(&self) -> u32 {
        self.copied + self.substituted + self.inserted
    }
}

/// Three-cursor merge over one read.
///
/// The target only grows by `push`, one byte per step, so every target
/// index is written exactly once. Deletion offsets are relative to the
/// aligned position; insertion offsets are target indices.
pub struct ReadMerger<'a> {
    window: &'a [u8], // reference from the aligned position to its end
    position: u32,
    reference_len: usize,
    length: u32,
    deletions: &'a [u32],
    insertions: &'a [Insertion],
    ref_cursor: u32,
    del_cursor: usize,
    ins_cursor: usize,
    target: Vec<u8>,
    stats: MergeStats,
}

impl<'a> ReadMerger<'a> {
    pub fn new(
        reference: &'a Reference,
        position: u32,
        length: u32,
        deletions: &'a [u32],
        insertions: &'a [Insertion],
    ) -> Result<Self> {
        Ok(ReadMerger {
            window: reference.suffix_from(position)?,
            position,
            reference_len: reference.len(),
            length,
            deletions,
            insertions,
            ref_cursor: 0,
            del_cursor: 0,
            ins_cursor: 0,
            target: Vec::with_capacity(length as usize),
            stats: MergeStats::default(),
        })
    }

    /// Target bytes produced so far
    pub fn target_len(&self) -> u32 {
        self.target.len() as u32
    }

    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Choose the next step towards a target length of `limit`, or `None`
    /// once it is reached. Deletions take precedence, then an insertion
    /// due at the current target index, then a reference copy.
    fn next_step(&self, limit: u32) -> Result<Option<MergeStep>> {
        if let Some(&offset) = self.deletions.get(self.del_cursor) {
            if offset <= self.ref_cursor {
                return Ok(Some(MergeStep::SkippingDeletion {
                    reference_offset: offset,
                }));
            }
        }

        let filled = self.target_len();
        if let Some(insertion) = self.insertions.get(self.ins_cursor) {
            if insertion.position < filled {
                return Err(CodecError::corrupt(format!(
                    "insertion at target offset {} after {filled} bytes were written",
                    insertion.position
                )));
            }
            if insertion.position == filled && filled < limit {
                return Ok(Some(MergeStep::ApplyingInsertion {
                    target_offset: filled,
                    base: insertion.base,
                }));
            }
        }

        if filled < limit {
            return Ok(Some(MergeStep::CopyingReference {
                reference_offset: self.ref_cursor,
            }));
        }
        Ok(None)
    }

    fn apply(&mut self, step: MergeStep) -> Result<()> {
        if debug_merge() {
            eprintln!("RRC_DEBUG_MERGE: {step:?}");
        }
        match step {
            MergeStep::SkippingDeletion { .. } => {
                self.ref_cursor += 1;
                self.del_cursor += 1;
                self.stats.deleted += 1;
            }
            MergeStep::CopyingReference { .. } => {
                let base = self.current_reference_byte()?;
                self.target.push(base);
                self.ref_cursor += 1;
                self.stats.copied += 1;
            }
            MergeStep::ApplyingInsertion { base, .. } => {
                self.target.push(base.to_ascii());
                self.ins_cursor += 1;
                self.stats.inserted += 1;
            }
        }
        Ok(())
    }

    fn current_reference_byte(&self) -> Result<u8> {
        self.window
            .get(self.ref_cursor as usize)
            .copied()
            .ok_or(CodecError::ReferenceOverrun {
                position: self.position as u64 + self.ref_cursor as u64,
                reference_len: self.reference_len as u64,
            })
    }

    /// Fill the target up to (excluding) index `limit`, applying every
    /// insertion below it and skipping deletions as the reference cursor
    /// passes them
    pub fn advance_to(&mut self, limit: u32) -> Result<()> {
        if limit > self.length {
            return Err(CodecError::corrupt(format!(
                "edit at target offset {limit} beyond read length {}",
                self.length
            )));
        }
        if limit < self.target_len() {
            return Err(CodecError::corrupt(format!(
                "edit at target offset {limit} after {} bytes were written",
                self.target_len()
            )));
        }
        while let Some(step) = self.next_step(limit)? {
            self.apply(step)?;
        }
        Ok(())
    }

    /// Reference base under the cursor, the context for a substitution here
    pub fn reference_base(&self) -> Result<BasePair> {
        Ok(BasePair::from_ascii(self.current_reference_byte()?))
    }

    /// Write `base` at `offset` in place of the reference base under the cursor
    pub fn substitute(&mut self, offset: u32, base: BasePair) -> Result<()> {
        if offset != self.target_len() || offset >= self.length {
            return Err(CodecError::corrupt(format!(
                "substitution at target offset {offset} with {} of {} bytes written",
                self.target_len(),
                self.length
            )));
        }
        self.current_reference_byte()?;
        if debug_merge() {
            eprintln!("RRC_DEBUG_MERGE: substituting {} at {offset}", base.to_ascii() as char);
        }
        self.target.push(base.to_ascii());
        self.ref_cursor += 1;
        self.stats.substituted += 1;
        Ok(())
    }

    /// Copy the tail and hand back the finished read.
    ///
    /// Edits the sweep never reached mean the lists disagree with the read
    /// length, which only a corrupt stream produces.
    pub fn finish(mut self) -> Result<(Vec<u8>, MergeStats)> {
        self.advance_to(self.length)?;

        if self.del_cursor < self.deletions.len() {
            return Err(CodecError::corrupt(format!(
                "{} deletions left unapplied at reference offset {}",
                self.deletions.len() - self.del_cursor,
                self.ref_cursor
            )));
        }
        if self.ins_cursor < self.insertions.len() {
            return Err(CodecError::corrupt(format!(
                "{} insertions left unapplied past read length {}",
                self.insertions.len() - self.ins_cursor,
                self.length
            )));
        }
        debug_assert_eq!(self.stats.written(), self.length);
        Ok((self.target, self.stats))
    }
}
