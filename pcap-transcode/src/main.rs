#![warn(clippy::all)]

#[macro_use]
extern crate log;

mod naming;

use clap::{crate_version, Parser};
use libpcap_tools::{CaptureFormat, Config, Error};
use pcap_transcode::{transcode_file, AesKey, PipelineConfig, TranscodeError};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Pcap file conversion tool
///
/// Converts between pcap and pcap-ng, with optional gzip compression and AES-128-CFB
/// encryption on either side.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file
    #[arg(short = 'f', long = "file", value_name = "INPUT")]
    input: String,

    /// Output file (default: derived from the input name)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<String>,

    /// Compress output with gzip
    #[arg(short = 'z', long)]
    compress: bool,

    /// Decompress gzip input
    #[arg(short, long)]
    decompress: bool,

    /// Write pcap-ng output (default: pcap)
    #[arg(long)]
    ng: bool,

    /// Input format (default: inferred from the file name)
    #[arg(long, value_name = "FORMAT")]
    input_format: Option<CaptureFormat>,

    /// Encrypt output with this 16 bytes key
    #[arg(long = "ek", value_name = "KEY")]
    encrypt_key: Option<String>,

    /// Decrypt input with this 16 bytes key
    #[arg(long = "dk", value_name = "KEY")]
    decrypt_key: Option<String>,

    /// Configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<String>,

    /// Be verbose
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(config: &mut Config, filename: &str) -> Result<(), io::Error> {
    debug!("Loading configuration {filename}");
    let path = Path::new(&filename);
    let file = File::open(path)?;
    config.load_config(file)
}

fn parse_key(key: Option<&String>) -> Result<Option<AesKey>, Error> {
    key.map(|k| AesKey::from_slice(k.as_bytes())).transpose()
}

fn build_pipeline(args: &Args) -> Result<PipelineConfig, Error> {
    // keys are checked before any file is touched
    let encrypt_key = parse_key(args.encrypt_key.as_ref())?;
    let decrypt_key = parse_key(args.decrypt_key.as_ref())?;

    let hints = naming::parse_name(&args.input);
    if hints.compressed && !args.decompress {
        warn!("input name ends with .gz, but decompression is not enabled (-d)");
    } else if args.decompress && !hints.compressed {
        warn!("decompression is enabled, but input name does not end with .gz");
    }
    if hints.encrypted && decrypt_key.is_none() {
        warn!("input name ends with .aes, but no decryption key was given (--dk)");
    }
    let input_format = args.input_format.unwrap_or(hints.format);
    let output_format = if args.ng {
        CaptureFormat::Segmented
    } else {
        CaptureFormat::Classic
    };
    let output = match &args.output {
        Some(output) => output.clone(),
        None => naming::output_name(
            &args.input,
            input_format,
            output_format,
            args.compress,
            encrypt_key.is_some(),
        ),
    };
    Ok(PipelineConfig {
        input: PathBuf::from(&args.input),
        output: PathBuf::from(output),
        input_format,
        output_format,
        decompress_input: args.decompress,
        compress_output: args.compress,
        decrypt_key,
        encrypt_key,
    })
}

fn run(args: &Args) -> Result<PipelineConfig, TranscodeError> {
    let mut config = Config::default();
    if let Some(filename) = &args.config {
        load_config(&mut config, filename).map_err(|e| {
            Error::Config(format!("could not load config file '{filename}': {e}"))
        })?;
    }
    let cfg = build_pipeline(args)?;
    transcode_file(&cfg, &config)?;
    Ok(cfg)
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::INFO } else { Level::WARN };
    let env_filter = EnvFilter::try_from_env("PCAP_TRANSCODE_LOG")
        .unwrap_or_else(|_| EnvFilter::from_default_env().add_directive(level.into()));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .compact()
        .init();

    debug!("Pcap transcode tool {}", crate_version!());

    match run(&args) {
        Ok(cfg) => {
            println!(
                "Successful conversion: {} -> {}",
                cfg.input.display(),
                cfg.output.display()
            );
        }
        Err(e) => {
            error!("{e}");
            ::std::process::exit(1);
        }
    }
}
