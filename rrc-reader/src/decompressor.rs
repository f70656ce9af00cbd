// RRC Decompressor
// Decodes the reads of a container against a FASTA reference

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rrc_common::{ArithmeticDecoder, CodecError, ContainerHeader};
use rrc_core::{DecoderConfig, DecoderSession, ReadRecord, Reference, ReferenceLoader};

/// One decoded read with the chromosome it aligns to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRead {
    pub chromosome: String,
    /// 0-based index of the read in the container
    pub index: u64,
    pub record: ReadRecord,
}

/// Read just the container header
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<ContainerHeader> {
    let path = path.as_ref();
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open container {}", path.display()))?,
    );
    ContainerHeader::read(&mut reader)
        .with_context(|| format!("Failed to read container header of {}", path.display()))
}

/// Sequential container decoder
pub struct Decompressor {
    config: DecoderConfig,
    header: ContainerHeader,
    session: DecoderSession,
    source: ArithmeticDecoder<Box<dyn Read>>,
    loader: ReferenceLoader<Box<dyn Read>>,
    chromosome: Option<Reference>,
    next_block: usize,
    remaining_in_block: u64,
    reads_decoded: u64,
}

impl Decompressor {
    /// Open a container and its reference FASTA (plain or gzipped)
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        container_path: P,
        reference_path: Q,
        config: DecoderConfig,
    ) -> Result<Self> {
        let container_path = container_path.as_ref();
        let reference_path = reference_path.as_ref();

        let container = File::open(container_path)
            .with_context(|| format!("Failed to open container {}", container_path.display()))?;
        let loader = ReferenceLoader::open(reference_path, config.max_reference_length)
            .with_context(|| format!("Failed to open reference {}", reference_path.display()))?;

        Self::from_parts(Box::new(BufReader::new(container)), loader, config)
    }

    /// Decode from an in-memory or otherwise opened container and reference
    pub fn from_readers<C, F>(container: C, reference: F, config: DecoderConfig) -> Result<Self>
    where
        C: Read + 'static,
        F: Read + 'static,
    {
        let reference: Box<dyn Read> = Box::new(reference);
        let loader = ReferenceLoader::new(reference, config.max_reference_length);
        Self::from_parts(Box::new(container), loader, config)
    }

    fn from_parts(
        mut container: Box<dyn Read>,
        loader: ReferenceLoader<Box<dyn Read>>,
        config: DecoderConfig,
    ) -> Result<Self> {
        let header =
            ContainerHeader::read(&mut container).context("Failed to read container header")?;

        if config.verbosity > 0 {
            eprintln!(
                "Container: {} reads in {} chromosome blocks",
                header.total_reads(),
                header.block_read_counts.len()
            );
        }
        if config.verbosity > 1 {
            eprintln!(
                "Limits: max_read_length={}, max_alphabet_cardinality={}, snp_position_buckets={}, explicit_cigars={}",
                header.limits.max_read_length,
                header.limits.max_alphabet_cardinality,
                header.limits.snp_position_buckets,
                header.explicit_cigars
            );
        }

        let session = DecoderSession::new(header.limits, header.explicit_cigars, config.clone())
            .context("Failed to build decoder models")?;
        let source = ArithmeticDecoder::new(container).context("Failed to start payload decoder")?;

        Ok(Decompressor {
            config,
            header,
            session,
            source,
            loader,
            chromosome: None,
            next_block: 0,
            remaining_in_block: 0,
            reads_decoded: 0,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn reads_decoded(&self) -> u64 {
        self.reads_decoded
    }

    /// Load the chromosome for the next block and restart positions
    fn advance_block(&mut self) -> Result<bool> {
        let Some(&count) = self.header.block_read_counts.get(self.next_block) else {
            return Ok(false);
        };

        let chromosome = self
            .loader
            .next_chromosome()
            .with_context(|| format!("Failed to load reference for block {}", self.next_block))?
            .ok_or_else(|| {
                CodecError::InvalidContainer(format!(
                    "Reference ends after {} chromosomes but the container has {} blocks",
                    self.next_block,
                    self.header.block_read_counts.len()
                ))
            })?;

        if self.config.verbosity > 1 {
            eprintln!(
                "Block {}: chromosome {} ({} bp), {count} reads",
                self.next_block,
                chromosome.name(),
                chromosome.len()
            );
        }

        self.session.start_chromosome();
        self.chromosome = Some(chromosome);
        self.remaining_in_block = count;
        self.next_block += 1;
        Ok(true)
    }

    /// Decode the next read; `None` once every block is exhausted
    pub fn next_read(&mut self) -> Result<Option<DecodedRead>> {
        while self.remaining_in_block == 0 {
            if !self.advance_block()? {
                return Ok(None);
            }
        }

        let chromosome = self
            .chromosome
            .as_ref()
            .ok_or_else(|| anyhow!("No chromosome loaded for block {}", self.next_block))?;
        let record = self
            .session
            .decode_read(&mut self.source, chromosome)
            .with_context(|| {
                format!(
                    "decode of chromosome {} aborted at read {}",
                    chromosome.name(),
                    self.reads_decoded
                )
            })?;

        let read = DecodedRead {
            chromosome: chromosome.name().to_string(),
            index: self.reads_decoded,
            record,
        };
        self.remaining_in_block -= 1;
        self.reads_decoded += 1;
        Ok(Some(read))
    }

    /// Decode everything that is left
    pub fn read_all(&mut self) -> Result<Vec<DecodedRead>> {
        let mut reads = Vec::new();
        while let Some(read) = self.next_read()? {
            reads.push(read);
        }
        Ok(reads)
    }

    /// Decode every remaining read as SAM-style lines; returns the number written
    pub fn write_sam<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        let mut written = 0u64;
        while let Some(read) = self.next_read()? {
            read.record
                .write_sam_line(writer, &read.index.to_string(), &read.chromosome)
                .context("Failed to write SAM line")?;
            written += 1;
        }

        if self.config.verbosity > 0 {
            eprintln!("Decoded {written} reads");
            let imbalances = self.session.indel_imbalances();
            if imbalances > 0 {
                eprintln!("Warning: {imbalances} reads had unequal deletion and insertion counts");
            }
        }
        Ok(written)
    }
}
