//! Conversion between pcap and pcap-ng captures
//!
//! Each side of the conversion is a stack of optional stream layers: AES-128-CFB encryption
//! and gzip compression. On input, data is decrypted, then decompressed, then decoded. On
//! output, records are encoded, then compressed, then encrypted.

#[macro_use]
extern crate log;

pub mod cipher;
pub mod compression;
mod error;
pub mod pipeline;
pub mod stream;
pub mod transcoder;

pub use cipher::AesKey;
pub use error::*;
pub use pipeline::{Pipeline, PipelineConfig};
pub use transcoder::{TranscodeStats, Transcoder};

use libpcap_tools::Config;

/// Transcode `cfg.input` into `cfg.output`
///
/// - the configuration is validated before any file is opened
/// - the input is opened first, so the output header can use the input metadata
/// - `cfg.output` will be created, or truncated if the file exists
///
/// The output is complete only if `Ok` is returned. On error, the output layers are still
/// released, and the file contains whatever was written before the failure.
pub fn transcode_file(
    cfg: &PipelineConfig,
    config: &Config,
) -> Result<TranscodeStats, TranscodeError> {
    let pipeline = Pipeline::new(cfg, config)?;
    let input = pipeline.open_input()?;
    let info = *input.info();
    info!(
        "Transcoding {} ({}, link type {}, snaplen {}) to {} ({})",
        cfg.input.display(),
        input.format(),
        info.link_type,
        info.snaplen,
        cfg.output.display(),
        cfg.output_format
    );
    let output = pipeline.create_output(&info)?;
    Transcoder::new(input, output, config).run()
}
