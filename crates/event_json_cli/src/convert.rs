use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use clap::Parser;
use event_json::{
    EncoderError, EncoderErrorCode, OutputRegistry, OutputSink, ReadError, RecordReader,
    RegistryError, WriterSink,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, FileConfig};

#[derive(Debug, Parser)]
pub struct Args {
    /// Newline-delimited JSON records to read (default: stdin).
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Destination for the JSON document (default: stdout).
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// TOML settings file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output module to write with.
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Log and skip unreadable lines and rejected records instead of aborting.
    #[arg(long)]
    pub skip_invalid: bool,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to open input `{path}`: {source}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create output `{path}`: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("input line {line_number}: {source}")]
    Read {
        line_number: usize,
        #[source]
        source: ReadError,
    },
    #[error("input line {line_number}: {source}")]
    Encode {
        line_number: usize,
        #[source]
        source: EncoderError,
    },
    #[error(transparent)]
    Envelope(#[from] EncoderError),
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Summary {
    pub written: u64,
    pub skipped: u64,
}

pub fn run(args: Args) -> Result<Summary, Error> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let limits = file_config.reader_limits()?;

    let registry = OutputRegistry::with_defaults();
    // Resolve the module before touching the output path.
    registry.get(&args.format)?;

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path).map_err(|source| Error::OpenInput {
                path: path.clone(),
                source,
            })?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };
    let sink: Box<dyn OutputSink + Send> = match &args.output {
        Some(path) => Box::new(WriterSink::create(path).map_err(|source| {
            Error::CreateOutput {
                path: path.clone(),
                source,
            }
        })?),
        None => Box::new(WriterSink::stdout()),
    };

    let mut module = registry.create(&args.format, sink, file_config.encoder_config())?;
    let mut summary = Summary::default();

    module.write_header()?;
    for line in RecordReader::new(input, limits) {
        let line_number = line.line_number;
        let record = match line.outcome {
            Ok(record) => record,
            Err(source) if args.skip_invalid && source != ReadError::Io => {
                warn!(line_number, error = %source, "skipping unreadable input line");
                summary.skipped += 1;
                continue;
            }
            Err(source) => return Err(Error::Read { line_number, source }),
        };

        match module.write_event(&record) {
            Ok(()) => summary.written += 1,
            Err(source)
                if args.skip_invalid && source.code() == EncoderErrorCode::Serialization =>
            {
                warn!(line_number, error = %source, "skipping rejected record");
                summary.skipped += 1;
            }
            Err(source) => return Err(Error::Encode { line_number, source }),
        }
    }
    module.write_footer()?;

    info!(
        format = module.name(),
        written = summary.written,
        skipped = summary.skipped,
        "conversion finished"
    );
    Ok(summary)
}
