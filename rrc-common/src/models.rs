// Context model bank
// Per-field adaptive models, the growable position alphabet, and the
// context derivation shared by the encoder and decoder

use ahash::AHashMap;

use crate::arithmetic::{SymbolDecoder, SymbolEncoder};
use crate::error::{CodecError, Result};
use crate::frequency::{FrequencyTable, TableInit};
use crate::types::{BasePair, CodecLimits, FLAG_ALPHABET_SIZE};

/// A family of frequency tables selected by an integer context id.
///
/// Tables are created on first use, so sparse context spaces (the variant
/// offset model has one context per bucket/offset/strand triple) only pay
/// for the contexts a stream actually visits.
#[derive(Debug, Clone)]
pub struct ContextModel {
    name: &'static str,
    num_contexts: u32,
    alphabet_size: u32,
    init: TableInit,
    tables: AHashMap<u32, FrequencyTable>,
}

impl ContextModel {
    pub fn new(name: &'static str, num_contexts: u32, alphabet_size: u32, init: TableInit) -> Self {
        ContextModel {
            name,
            num_contexts,
            alphabet_size,
            init,
            tables: AHashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn num_contexts(&self) -> u32 {
        self.num_contexts
    }

    pub fn alphabet_size(&self) -> u32 {
        self.alphabet_size
    }

    /// Number of contexts that have been touched so far
    pub fn active_contexts(&self) -> usize {
        self.tables.len()
    }

    fn table(&mut self, context: u32) -> Result<&mut FrequencyTable> {
        if context >= self.num_contexts {
            return Err(CodecError::ContextOutOfRange {
                model: self.name,
                context,
                limit: self.num_contexts,
            });
        }
        let (alphabet, init) = (self.alphabet_size, self.init);
        Ok(self
            .tables
            .entry(context)
            .or_insert_with(|| FrequencyTable::new(alphabet, init)))
    }

    /// Decode one symbol under `context` and feed it back into the model
    pub fn decode<D: SymbolDecoder>(&mut self, context: u32, source: &mut D) -> Result<u32> {
        let (name, alphabet) = (self.name, self.alphabet_size);
        let table = self.table(context)?;
        let symbol = source.decode_symbol(table)?;
        table.update(symbol).ok_or(CodecError::SymbolOutOfRange {
            model: name,
            symbol,
            alphabet,
        })?;
        Ok(symbol)
    }

    /// Encode one symbol under `context` and feed it back into the model
    pub fn encode<E: SymbolEncoder>(&mut self, context: u32, symbol: u32, sink: &mut E) -> Result<()> {
        let (name, alphabet) = (self.name, self.alphabet_size);
        let table = self.table(context)?;
        sink.encode_symbol(table, symbol).map_err(|e| match e {
            CodecError::SymbolOutOfRange { symbol, alphabet, .. } => CodecError::SymbolOutOfRange {
                model: name,
                symbol,
                alphabet,
            },
            other => other,
        })?;
        table.update(symbol).ok_or(CodecError::SymbolOutOfRange {
            model: name,
            symbol,
            alphabet,
        })
    }

    /// Update the model with a symbol that was not itself coded
    pub fn observe(&mut self, context: u32, symbol: u32) -> Result<()> {
        let (name, alphabet) = (self.name, self.alphabet_size);
        self.table(context)?
            .update(symbol)
            .ok_or(CodecError::SymbolOutOfRange {
                model: name,
                symbol,
                alphabet,
            })
    }
}

/// Symbol set of the position model that learns value <-> index pairs.
///
/// Index 0 is reserved as the "unseen value" escape; real values are
/// assigned indices 1, 2, ... in first-seen order and never reassigned.
#[derive(Debug, Clone)]
pub struct GrowableAlphabet {
    // index -> value; slot 0 is the escape placeholder
    values: Vec<u32>,
    index_of: AHashMap<u32, u32>,
    ceiling: u32,
}

impl GrowableAlphabet {
    pub fn new(ceiling: u32) -> Self {
        GrowableAlphabet {
            values: vec![0],
            index_of: AHashMap::new(),
            ceiling,
        }
    }

    /// Number of assigned indices, escape included
    #[inline]
    pub fn cardinality(&self) -> u32 {
        self.values.len() as u32
    }

    /// Value for a decoded index; `Ok(None)` for the escape
    pub fn value_at(&self, index: u32) -> Result<Option<u32>> {
        if index == 0 {
            return Ok(None);
        }
        self.values
            .get(index as usize)
            .copied()
            .map(Some)
            .ok_or_else(|| {
                CodecError::corrupt(format!(
                    "position index {index} beyond alphabet cardinality {}",
                    self.cardinality()
                ))
            })
    }

    /// Index previously assigned to `value`
    #[inline]
    pub fn index_of(&self, value: u32) -> Option<u32> {
        self.index_of.get(&value).copied()
    }

    /// Assign the next index to a value seen for the first time
    pub fn register(&mut self, value: u32) -> Result<u32> {
        if self.index_of.contains_key(&value) {
            return Err(CodecError::corrupt(format!(
                "escape for position delta {value} which already has an index"
            )));
        }
        let index = self.cardinality();
        if index >= self.ceiling {
            return Err(CodecError::CapacityExceeded {
                what: "position alphabet cardinality",
                value: index as u64 + 1,
                limit: self.ceiling as u64,
            });
        }
        self.values.push(value);
        self.index_of.insert(value, index);
        Ok(index)
    }
}

/// Every model a read decode touches, with the session's limits
#[derive(Debug, Clone)]
pub struct ModelBank {
    pub limits: CodecLimits,
    pub read_length: ContextModel,
    pub position: ContextModel,
    pub position_alphabet: GrowableAlphabet,
    pub position_escape: ContextModel,
    pub flag: ContextModel,
    pub match_flag: ContextModel,
    pub snp_count: ContextModel,
    pub indel_count: ContextModel,
    pub variant: ContextModel,
    pub base: ContextModel,
    pub cigar_flag: ContextModel,
    pub cigar: ContextModel,
}

impl ModelBank {
    pub fn new(limits: CodecLimits) -> Result<Self> {
        limits.validate()?;
        let count_alphabet = limits.count_alphabet_size();

        Ok(ModelBank {
            limits,
            read_length: ContextModel::new("read_length", 4, 256, TableInit::Uniform),
            position: ContextModel::new(
                "position",
                1,
                limits.max_alphabet_cardinality,
                TableInit::EscapeOnly,
            ),
            position_alphabet: GrowableAlphabet::new(limits.max_alphabet_cardinality),
            position_escape: ContextModel::new("position_escape", 4, 256, TableInit::Uniform),
            flag: ContextModel::new("flag", 1, FLAG_ALPHABET_SIZE, TableInit::Uniform),
            match_flag: ContextModel::new("match", 4, 2, TableInit::Uniform),
            snp_count: ContextModel::new("snp_count", 1, count_alphabet, TableInit::Uniform),
            indel_count: ContextModel::new("indel_count", 1, count_alphabet, TableInit::Uniform),
            variant: ContextModel::new(
                "variant",
                limits.variant_contexts(),
                limits.variant_alphabet_size(),
                TableInit::Uniform,
            ),
            base: ContextModel::new(
                "base",
                BasePair::CONTEXTS,
                BasePair::SYMBOLS,
                TableInit::Uniform,
            ),
            cigar_flag: ContextModel::new("cigar_flag", 1, 2, TableInit::Uniform),
            cigar: ContextModel::new("cigar", 1, 256, TableInit::Uniform),
        })
    }
}

/// Context of the match flag.
///
/// Bit 1 is set when the read sits at the same step as the previous one
/// (position delta of exactly 1), bit 0 carries the previous match outcome.
#[inline]
pub fn match_context(position_delta: u32, previous_match: bool) -> u32 {
    (u32::from(position_delta == 1) << 1) | u32::from(previous_match)
}

/// Coarse read-position bucket for SNP offsets (`position` is 1-based)
#[inline]
pub fn snp_position_bucket(position: u32, read_length: u32, buckets: u32) -> u32 {
    if read_length == 0 || buckets == 0 {
        return 0;
    }
    let offset = position.saturating_sub(1) as u64;
    let bucket = offset * buckets as u64 / read_length as u64;
    (bucket as u32).min(buckets - 1)
}

/// Context of a variant offset: `((bucket << offset_bits) | running_offset) << 1 | reverse`.
///
/// Deletion and insertion offsets use bucket 0.
pub fn variant_context(
    bucket: u32,
    running_offset: u32,
    reverse: bool,
    offset_bits: u32,
) -> Result<u32> {
    if running_offset >= (1 << offset_bits) {
        return Err(CodecError::ContextOutOfRange {
            model: "variant",
            context: running_offset,
            limit: 1 << offset_bits,
        });
    }
    let mixed = (bucket << offset_bits) | running_offset;
    Ok((mixed << 1) | u32::from(reverse))
}
