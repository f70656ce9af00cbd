// Field decoders
// One routine per encoded field: derive the context, decode, update the
// model, hand back a typed value. Decode and update always go together, so
// the call order here must mirror the encoder exactly.

use rrc_common::{
    match_context, variant_context, BasePair, CodecError, ModelBank, Result, SymbolDecoder,
    REVERSE_STRAND_MASK,
};

use crate::env_cache::debug_fields;

/// Decoded flag word and the strand bit derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagField {
    pub flag: u32,
    pub reverse: bool,
}

/// Decoded alignment position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionField {
    /// 1-based alignment position
    pub position: u32,
    /// Step from the previous read as seen by the match context: `1` means
    /// the read starts where the previous one did
    pub delta: u32,
}

/// Read length: four byte-wide symbols, one context each, little-endian
pub fn decode_read_length<D: SymbolDecoder>(models: &mut ModelBank, source: &mut D) -> Result<u32> {
    let mut length = 0u32;
    for k in 0..4 {
        let byte = models.read_length.decode(k, source)?;
        length |= byte << (8 * k);
    }
    Ok(length)
}

/// Flag: the whole word from a single context-free model; the model learns
/// the full value, the caller mostly wants the reverse-strand bit
pub fn decode_flag<D: SymbolDecoder>(models: &mut ModelBank, source: &mut D) -> Result<FlagField> {
    let flag = models.flag.decode(0, source)?;
    Ok(FlagField {
        flag,
        reverse: flag & REVERSE_STRAND_MASK != 0,
    })
}

/// Raw position delta for a value the alphabet has not seen: four bytes,
/// one context each, most significant first
fn decode_position_escape<D: SymbolDecoder>(models: &mut ModelBank, source: &mut D) -> Result<u32> {
    let mut value = 0u32;
    for k in 0..4 {
        let byte = models.position_escape.decode(k, source)?;
        value |= byte << (8 * (3 - k));
    }
    Ok(value)
}

/// Position: a delta from `previous_position` coded through the growable
/// alphabet. The encoder stores `delta + 1` so that index 0 stays free for
/// the escape; hence the `- 1` here.
pub fn decode_position<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
    previous_position: u32,
) -> Result<PositionField> {
    let index = models.position.decode(0, source)?;

    let raw = match models.position_alphabet.value_at(index)? {
        Some(value) => value,
        None => {
            let value = decode_position_escape(models, source)?;
            let new_index = models.position_alphabet.register(value)?;
            models.position.observe(0, new_index)?;
            value
        }
    };

    // Wraps on corrupt deltas; the reference window check rejects the result
    let position = previous_position.wrapping_add(raw).wrapping_sub(1);
    let delta = if position < previous_position {
        position
    } else {
        position.wrapping_sub(previous_position).wrapping_add(1)
    };

    if debug_fields() {
        eprintln!("RRC_DEBUG_FIELDS: position index={index} raw={raw} pos={position} delta={delta}");
    }

    Ok(PositionField { position, delta })
}

/// Match flag under `((delta == 1) << 1) | previous_match`
pub fn decode_match<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
    position_delta: u32,
    previous_match: bool,
) -> Result<bool> {
    let ctx = match_context(position_delta, previous_match);
    Ok(models.match_flag.decode(ctx, source)? == 1)
}

pub fn decode_snp_count<D: SymbolDecoder>(models: &mut ModelBank, source: &mut D) -> Result<u32> {
    models.snp_count.decode(0, source)
}

pub fn decode_indel_count<D: SymbolDecoder>(models: &mut ModelBank, source: &mut D) -> Result<u32> {
    models.indel_count.decode(0, source)
}

/// One variant offset, itself a delta the caller adds to its running cursor
pub fn decode_variant_offset<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
    bucket: u32,
    running_offset: u32,
    reverse: bool,
) -> Result<u32> {
    let bits = models.limits.variant_offset_bits();
    let ctx = variant_context(bucket, running_offset, reverse, bits)?;
    models.variant.decode(ctx, source)
}

/// Substituted or inserted base, conditioned on the reference base class
pub fn decode_base<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
    reference: BasePair,
) -> Result<BasePair> {
    let symbol = models.base.decode(reference.context(), source)?;
    BasePair::from_symbol(symbol)
        .ok_or_else(|| CodecError::corrupt(format!("base symbol {symbol} has no base")))
}

/// CIGAR override: flag `0` means an explicit CIGAR string follows (length,
/// then characters, all from one model); `1` keeps the reconstructed CIGAR
pub fn decode_explicit_cigar<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
) -> Result<Option<String>> {
    if models.cigar_flag.decode(0, source)? != 0 {
        return Ok(None);
    }

    let len = models.cigar.decode(0, source)?;
    let mut cigar = String::with_capacity(len as usize);
    for _ in 0..len {
        let c = models.cigar.decode(0, source)? as u8;
        if !(c.is_ascii_alphanumeric() || c == b'=' || c == b'*') {
            return Err(CodecError::corrupt(format!(
                "byte {c:#04x} is not a CIGAR character"
            )));
        }
        cigar.push(c as char);
    }
    Ok(Some(cigar))
}
