// Reference sequence loading
// Sequential FASTA reader handing out one upper-cased chromosome at a time

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use rrc_common::{CodecError, Result};

/// Default ceiling on a single chromosome (2^28 bases)
pub const DEFAULT_MAX_REFERENCE_LENGTH: u64 = 1 << 28;

/// One chromosome of the reference, upper-cased, indexed 1-based by reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    name: String,
    bases: Vec<u8>,
}

impl Reference {
    /// Build a reference from raw bases (upper-cased on the way in)
    pub fn new(name: impl Into<String>, mut bases: Vec<u8>) -> Self {
        bases.make_ascii_uppercase();
        Reference {
            name: name.into(),
            bases,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Bases from 1-based `position` to the end of the chromosome
    pub fn suffix_from(&self, position: u32) -> Result<&[u8]> {
        if position == 0 || position as usize > self.bases.len() + 1 {
            return Err(CodecError::ReferenceOverrun {
                position: position as u64,
                reference_len: self.bases.len() as u64,
            });
        }
        Ok(&self.bases[position as usize - 1..])
    }

    /// `len` bases starting at 1-based `position`
    pub fn window(&self, position: u32, len: u32) -> Result<&[u8]> {
        let suffix = self.suffix_from(position)?;
        suffix
            .get(..len as usize)
            .ok_or(CodecError::ReferenceOverrun {
                position: position as u64 + len as u64 - 1,
                reference_len: self.bases.len() as u64,
            })
    }
}

/// FASTA reader yielding chromosomes in file order
pub struct ReferenceLoader<R> {
    reader: BufReader<R>,
    buffer: Vec<u8>,
    next_header: Option<String>, // Header read ahead while finishing the previous record
    max_reference_length: u64,
}

impl<R: Read> ReferenceLoader<R> {
    pub fn new(reader: R, max_reference_length: u64) -> Self {
        ReferenceLoader {
            reader: BufReader::with_capacity(1 << 20, reader),
            buffer: Vec::with_capacity(1024),
            next_header: None,
            max_reference_length,
        }
    }

    fn read_line(&mut self) -> Result<bool> {
        self.buffer.clear();
        Ok(self.reader.read_until(b'\n', &mut self.buffer)? > 0)
    }

    /// Load the next chromosome.
    ///
    /// `Ok(None)` is the end-of-reference signal; a header with no sequence
    /// lines yields a zero-length chromosome instead.
    pub fn next_chromosome(&mut self) -> Result<Option<Reference>> {
        let mut bases = Vec::new();

        let name = match self.next_header.take() {
            Some(header) => header,
            None => loop {
                if !self.read_line()? {
                    return Ok(None);
                }
                if self.buffer.iter().all(|c| c.is_ascii_whitespace()) {
                    continue;
                }
                if self.buffer[0] == b'>' {
                    break parse_header(&self.buffer);
                }
                // Sequence before any header: keep it under an empty name
                self.append_bases(&mut bases)?;
                break String::new();
            },
        };

        while self.read_line()? {
            if self.buffer.first() == Some(&b'>') {
                self.next_header = Some(parse_header(&self.buffer));
                break;
            }
            self.append_bases(&mut bases)?;
        }

        Ok(Some(Reference::new(name, bases)))
    }

    fn append_bases(&self, bases: &mut Vec<u8>) -> Result<()> {
        bases.extend(
            self.buffer
                .iter()
                .filter(|c| !c.is_ascii_whitespace())
                .map(|c| c.to_ascii_uppercase()),
        );
        if bases.len() as u64 > self.max_reference_length {
            return Err(CodecError::CapacityExceeded {
                what: "reference length",
                value: bases.len() as u64,
                limit: self.max_reference_length,
            });
        }
        Ok(())
    }
}

impl ReferenceLoader<Box<dyn Read>> {
    /// Open a FASTA file (supports .gz files)
    pub fn open<P: AsRef<Path>>(path: P, max_reference_length: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let reader: Box<dyn Read> = if path.extension().and_then(|s| s.to_str()) == Some("gz") {
            // MultiGzDecoder also handles BGZF (multi-member gzip)
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };

        Ok(ReferenceLoader::new(reader, max_reference_length))
    }
}

/// Sequence name: header text after '>' up to the first whitespace
fn parse_header(line: &[u8]) -> String {
    let text = String::from_utf8_lossy(&line[1..]);
    text.split_whitespace().next().unwrap_or("").to_string()
}
