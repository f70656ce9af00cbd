// Arithmetic coding seam
// Field decoders see `SymbolDecoder` / `SymbolEncoder`; underneath, the
// `arithmetic-coding` engine codes each symbol against a frequency table
// exposed through `arithmetic_coding_core::Model`

use std::io::{self, Read, Write};
use std::ops::Range;

use arithmetic_coding::{decoder, Decoder, Encoder};
use arithmetic_coding_core::Model;
use bitstream_io::{BigEndian, BitReader, BitWrite, BitWriter};
use thiserror::Error;

use crate::error::{CodecError, Result};
use crate::frequency::{FrequencyTable, MAX_DENOMINATOR};

/// Coder precision in bits. Together with the 23 bits of `MAX_DENOMINATOR`
/// it must fit the 64-bit state.
const PRECISION: u32 = 40;

/// Zero bits the decoder may pull past the end of its input before the
/// stream is considered truncated. A well-formed stream needs at most
/// `PRECISION` bits of look-ahead.
const MAX_PADDING_BITS: u64 = 2 * PRECISION as u64;

/// Source of symbols decoded against a frequency table
pub trait SymbolDecoder {
    /// Decode the next symbol under `table`. Does not update the table.
    fn decode_symbol(&mut self, table: &FrequencyTable) -> Result<u32>;
}

/// Sink for symbols encoded against a frequency table
pub trait SymbolEncoder {
    /// Encode `symbol` under `table`. Does not update the table.
    fn encode_symbol(&mut self, table: &FrequencyTable, symbol: u32) -> Result<()>;
}

#[derive(Debug, Error)]
#[error("symbol {0} has no probability mass")]
struct UncodableSymbol(u32);

/// Read-only coding view of one frequency table. Adaptation stays with the
/// owning `ContextModel`, which also feeds symbols that are never coded.
struct TableModel<'t>(&'t FrequencyTable);

impl Model for TableModel<'_> {
    type B = u64;
    type Symbol = u32;
    type ValueError = UncodableSymbol;

    fn probability(&self, symbol: Option<&u32>) -> std::result::Result<Range<u64>, UncodableSymbol> {
        match symbol {
            Some(&s) => {
                let (low, freq) = self.0.interval(s).ok_or(UncodableSymbol(s))?;
                Ok(u64::from(low)..u64::from(low) + u64::from(freq))
            }
            // No end-of-stream symbol; the whole range keeps the state sane
            None => Ok(0..self.denominator()),
        }
    }

    fn denominator(&self) -> u64 {
        u64::from(self.0.total())
    }

    fn max_denominator(&self) -> u64 {
        MAX_DENOMINATOR
    }

    fn symbol(&self, value: u64) -> Option<u32> {
        u32::try_from(value).ok().and_then(|v| self.0.find(v))
    }
}

/// Coding interval captured when a symbol was encoded
#[derive(Debug, Clone, Copy)]
struct Interval {
    low: u32,
    freq: u32,
    total: u32,
}

/// Replays captured intervals in order; symbol `i` is the i-th interval
struct IntervalReplay<'a> {
    intervals: &'a [Interval],
    next: usize,
}

impl Model for IntervalReplay<'_> {
    type B = u64;
    type Symbol = usize;
    type ValueError = UncodableSymbol;

    fn probability(&self, symbol: Option<&usize>) -> std::result::Result<Range<u64>, UncodableSymbol> {
        let index = symbol.copied().unwrap_or(self.intervals.len());
        let interval = self
            .intervals
            .get(index)
            .ok_or(UncodableSymbol(index as u32))?;
        Ok(u64::from(interval.low)..u64::from(interval.low) + u64::from(interval.freq))
    }

    fn denominator(&self) -> u64 {
        self.intervals
            .get(self.next)
            .map_or(1, |interval| u64::from(interval.total))
    }

    fn max_denominator(&self) -> u64 {
        MAX_DENOMINATOR
    }

    fn symbol(&self, _value: u64) -> Option<usize> {
        None
    }

    fn update(&mut self, _symbol: Option<&usize>) {
        self.next += 1;
    }
}

/// Arithmetic encoder writing to any `Write`.
///
/// Intervals are captured as symbols arrive (the tables keep adapting
/// underneath) and run through the engine in one pass on `finish`.
pub struct ArithmeticEncoder<W: Write> {
    writer: W,
    intervals: Vec<Interval>,
}

impl<W: Write> ArithmeticEncoder<W> {
    pub fn new(writer: W) -> Self {
        ArithmeticEncoder {
            writer,
            intervals: Vec::new(),
        }
    }

    /// Symbols accepted so far
    pub fn symbols(&self) -> usize {
        self.intervals.len()
    }

    /// Code every captured symbol, byte-align, and return the inner writer
    /// along with the number of payload bytes produced
    pub fn finish(mut self) -> Result<(W, u64)> {
        let mut bits = BitWriter::endian(Vec::new(), BigEndian);
        {
            let replay = IntervalReplay {
                intervals: &self.intervals,
                next: 0,
            };
            let mut encoder = Encoder::with_precision(replay, &mut bits, PRECISION);
            for index in 0..self.intervals.len() {
                encoder
                    .encode(Some(&index))
                    .map_err(|e| CodecError::corrupt(format!("arithmetic encoder: {e:?}")))?;
            }
            encoder.flush()?;
        }
        bits.byte_align()?;

        let payload = bits.into_writer();
        self.writer.write_all(&payload)?;
        self.writer.flush()?;
        Ok((self.writer, payload.len() as u64))
    }
}

impl<W: Write> SymbolEncoder for ArithmeticEncoder<W> {
    fn encode_symbol(&mut self, table: &FrequencyTable, symbol: u32) -> Result<()> {
        let (low, freq) = table
            .interval(symbol)
            .ok_or(CodecError::SymbolOutOfRange {
                model: "arithmetic",
                symbol,
                alphabet: table.alphabet_size(),
            })?;
        self.intervals.push(Interval {
            low,
            freq,
            total: table.total(),
        });
        Ok(())
    }
}

/// Input wrapper that turns reads far past the end into an error.
///
/// The engine pads an exhausted input with zero bits; a stream that keeps
/// asking for more than `MAX_PADDING_BITS` of them was cut short.
struct PaddingGuard<R> {
    inner: R,
    padding_bits: u64,
}

impl<R: Read> Read for PaddingGuard<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            // One empty read per padded bit
            self.padding_bits += 1;
            if self.padding_bits > MAX_PADDING_BITS {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "arithmetic stream truncated",
                ));
            }
        }
        Ok(n)
    }
}

type DecoderState<R> = decoder::State<u64, BitReader<PaddingGuard<R>, BigEndian>>;

/// Arithmetic decoder reading from any `Read`
pub struct ArithmeticDecoder<R: Read> {
    // Taken while a symbol is in flight, always put back
    state: Option<DecoderState<R>>,
}

impl<R: Read> ArithmeticDecoder<R> {
    pub fn new(reader: R) -> Result<Self> {
        let input = BitReader::endian(
            PaddingGuard {
                inner: reader,
                padding_bits: 0,
            },
            BigEndian,
        );
        let placeholder = FrequencyTable::new(1, crate::frequency::TableInit::Uniform);
        let (_, state) =
            Decoder::with_precision(TableModel(&placeholder), input, PRECISION).into_inner();
        Ok(ArithmeticDecoder { state: Some(state) })
    }
}

impl<R: Read> SymbolDecoder for ArithmeticDecoder<R> {
    fn decode_symbol(&mut self, table: &FrequencyTable) -> Result<u32> {
        let state = self
            .state
            .take()
            .ok_or_else(|| CodecError::corrupt("decoder state lost"))?;

        let mut decoder = Decoder::with_state(state, TableModel(table));
        let decoded = decoder.decode();
        let (_, state) = decoder.into_inner();
        self.state = Some(state);

        match decoded {
            Ok(Some(symbol)) => Ok(symbol),
            Ok(None) => Err(CodecError::corrupt(format!(
                "no symbol inside a table of total {}",
                table.total()
            ))),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
                ) =>
            {
                Err(CodecError::TruncatedStream)
            }
            Err(e) => Err(e.into()),
        }
    }
}
