use clap::{Parser, error::ErrorKind};
use std::{path::PathBuf, process::ExitCode};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use xmltlv::{EncodeOptions, to_tlv::DEFAULT_MAX_DEPTH};

/// Encode an XML document as a compact tag-length-value stream.
#[derive(Parser, Debug)]
#[command(name = "xmltlv", version, about, long_about = None)]
struct Cli {
    /// XML document to read
    input: PathBuf,

    /// File to write the encoded stream to
    output: PathBuf,

    /// Deepest element nesting to accept
    #[arg(long, value_name = "DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Log more detail (-v for info, -vv for debug); RUST_LOG overrides this
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    debug!(?cli, "starting");
    let options = EncodeOptions::default().max_depth(cli.max_depth);
    match xmltlv::convert_file(&cli.input, &cli.output, &options) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("conversion failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
