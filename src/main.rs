use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tinirdb::{
    pipeline,
    rdb::{DecoderConfig, EncoderConfig},
};
use tokio::{
    fs::File,
    io::{self, BufReader, BufWriter},
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
    /// Fail on uncompressed sorted sets instead of decoding them
    #[arg(long, global = true)]
    no_sorted_sets: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every record in the file
    Dump {
        /// The RDB file to read
        file: PathBuf,
    },
    /// Write the commands that recreate the data to stdout, in RESP
    Protocol {
        /// The RDB file to read
        file: PathBuf,
    },
    /// Decode a file and encode it again
    Rewrite {
        /// The RDB file to read
        input: PathBuf,
        /// Where to write the new file
        output: PathBuf,
        /// Never compress strings
        #[arg(long)]
        no_compress: bool,
        /// Only compress strings longer than this many bytes
        #[arg(long, value_name = "BYTES")]
        compression_threshold: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup logging. Output goes to stdout, so logs go to stderr
    #[cfg(debug_assertions)]
    tracing_subscriber::fmt()
        .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    #[cfg(not(debug_assertions))]
    tracing_subscriber::fmt()
        .event_format(tracing_subscriber::fmt::format::json().flatten_event(true))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let decoder_config = DecoderConfig {
        decode_sorted_sets: !args.no_sorted_sets,
    };

    let summary = match args.command {
        Command::Dump { file } => {
            let reader = open(&file).await?;
            pipeline::dump(reader, BufWriter::new(io::stdout()), decoder_config).await?
        }
        Command::Protocol { file } => {
            let reader = open(&file).await?;
            pipeline::to_protocol(reader, BufWriter::new(io::stdout()), decoder_config).await?
        }
        Command::Rewrite {
            input,
            output,
            no_compress,
            compression_threshold,
        } => {
            let mut encoder_config = EncoderConfig {
                compress: !no_compress,
                ..Default::default()
            };
            if let Some(threshold) = compression_threshold {
                encoder_config.compression_threshold = threshold;
            }

            let reader = open(&input).await?;
            let writer = File::create(&output)
                .await
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let summary =
                pipeline::rewrite(reader, BufWriter::new(writer), decoder_config, encoder_config)
                    .await?;
            info!("Wrote {}", output.display());
            summary
        }
    };

    info!(
        "RDB version {}: {} keys, {} database selectors",
        summary.version, summary.keys, summary.databases
    );
    Ok(())
}

async fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}
