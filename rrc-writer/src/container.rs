// Container writer
// Buffers the arithmetic-coded payload while counting reads per chromosome
// block, then writes header and payload in one go

use std::io::Write;

use rrc_common::{ArithmeticEncoder, CodecError, CodecLimits, ContainerHeader, Result};

use crate::encoder::{ReadEdits, ReadEncoder};

pub struct ContainerWriter {
    header: ContainerHeader,
    encoder: ReadEncoder,
    payload: ArithmeticEncoder<Vec<u8>>,
}

impl ContainerWriter {
    pub fn new(limits: CodecLimits, explicit_cigars: bool) -> Result<Self> {
        Ok(ContainerWriter {
            header: ContainerHeader::new(limits, explicit_cigars),
            encoder: ReadEncoder::new(limits, explicit_cigars)?,
            payload: ArithmeticEncoder::new(Vec::new()),
        })
    }

    /// Open the block for the next chromosome of the reference
    pub fn start_block(&mut self) {
        self.header.block_read_counts.push(0);
        self.encoder.start_chromosome();
    }

    /// Encode a read of the current block against its chromosome bases
    pub fn add_read(&mut self, read: &ReadEdits, reference: &[u8]) -> Result<()> {
        let Some(count) = self.header.block_read_counts.last_mut() else {
            return Err(CodecError::InvalidContainer(
                "read added before any chromosome block".to_string(),
            ));
        };
        self.encoder.encode_read(&mut self.payload, read, reference)?;
        *count += 1;
        Ok(())
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    /// Write header and payload; returns total bytes written
    pub fn finish<W: Write>(self, writer: &mut W) -> Result<u64> {
        let (payload, payload_len) = self.payload.finish()?;
        let header_len = self.header.write(writer)?;
        writer.write_all(&payload)?;
        Ok(header_len as u64 + payload_len)
    }
}
