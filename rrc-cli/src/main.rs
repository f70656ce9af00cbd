// RRC CLI
// Decodes reference-based read containers to SAM-style text

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rrc_reader::{read_header, Decompressor, DecompressorConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rrc")]
#[command(version, about = "Reference-based read container decoder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode a container against its reference into SAM lines
    Decode {
        /// Reference FASTA (plain or .gz), chromosomes in container block order
        #[arg(short = 'r', long)]
        reference: PathBuf,

        /// Input container file path
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Verbosity level (0=quiet, 1=normal, 2=verbose)
        #[arg(short = 'v', long, default_value_t = 1)]
        verbosity: u32,

        /// Fail on reads whose deletion and insertion counts differ
        #[arg(long)]
        strict_indels: bool,
    },

    /// Display the header of a container
    Info {
        /// Input container file path
        container: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            reference,
            input,
            output,
            verbosity,
            strict_indels,
        } => decode_command(reference, input, output, verbosity, strict_indels)?,

        Commands::Info { container } => info_command(container)?,
    }

    Ok(())
}

fn decode_command(
    reference: PathBuf,
    input: PathBuf,
    output: Option<PathBuf>,
    verbosity: u32,
    strict_indels: bool,
) -> Result<()> {
    let config = DecompressorConfig {
        verbosity,
        strict_indel_balance: strict_indels,
        ..DecompressorConfig::default()
    };

    if verbosity > 0 {
        eprintln!("Decoding {input:?} against {reference:?}");
    }
    let mut decompressor = Decompressor::open(&input, &reference, config)?;

    let written = match output {
        Some(output_path) => {
            let file = File::create(&output_path)
                .with_context(|| format!("Failed to create output {output_path:?}"))?;
            let mut writer = BufWriter::new(file);
            let written = decompressor.write_sam(&mut writer)?;
            writer.flush()?;
            written
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            let written = decompressor.write_sam(&mut writer)?;
            writer.flush()?;
            written
        }
    };

    if verbosity > 1 {
        eprintln!("Wrote {written} SAM lines");
    }
    Ok(())
}

fn info_command(container: PathBuf) -> Result<()> {
    let header = read_header(&container)?;

    println!("Container: {}", container.display());
    println!("  max read length:          {}", header.limits.max_read_length);
    println!(
        "  max alphabet cardinality:  {}",
        header.limits.max_alphabet_cardinality
    );
    println!(
        "  SNP position buckets:      {}",
        header.limits.snp_position_buckets
    );
    println!("  explicit CIGARs:           {}", header.explicit_cigars);
    println!("  chromosome blocks:         {}", header.block_read_counts.len());
    println!("  total reads:               {}", header.total_reads());
    for (block, count) in header.block_read_counts.iter().enumerate() {
        println!("    block {block}: {count} reads");
    }

    Ok(())
}
