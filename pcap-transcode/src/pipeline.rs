use crate::cipher::{AesKey, CipherReader, CipherWriter};
use crate::compression::{compression_level, gzip_reader, GzipWriter};
use crate::error::{Stage, TranscodeError};
use crate::stream::{FileSink, Sink};
use flate2::Compression;
use libpcap_tools::*;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// What to read, what to write, and which transforms to stack on each side
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_format: CaptureFormat,
    pub output_format: CaptureFormat,
    pub decompress_input: bool,
    pub compress_output: bool,
    pub decrypt_key: Option<AesKey>,
    pub encrypt_key: Option<AesKey>,
}

impl PipelineConfig {
    /// Plain classic to classic copy, without any transform
    pub fn new<P1: Into<PathBuf>, P2: Into<PathBuf>>(input: P1, output: P2) -> Self {
        PipelineConfig {
            input: input.into(),
            output: output.into(),
            input_format: CaptureFormat::Classic,
            output_format: CaptureFormat::Classic,
            decompress_input: false,
            compress_output: false,
            decrypt_key: None,
            encrypt_key: None,
        }
    }

    /// Reject configurations that would clobber the input
    pub fn validate(&self) -> Result<(), Error> {
        let same = self.input == self.output
            || matches!(
                (fs::canonicalize(&self.input), fs::canonicalize(&self.output)),
                (Ok(a), Ok(b)) if a == b
            );
        if same {
            return Err(Error::Config(format!(
                "output file '{}' is the input file",
                self.output.display()
            )));
        }
        Ok(())
    }
}

/// One optional stream transform
enum Layer<'a> {
    Cipher(&'a AesKey),
    Gzip,
}

/// Input transforms, innermost (closest to the file) first
fn input_layers(cfg: &PipelineConfig) -> Vec<Layer<'_>> {
    [
        cfg.decrypt_key.as_ref().map(Layer::Cipher),
        cfg.decompress_input.then_some(Layer::Gzip),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Output transforms, innermost (closest to the file) first: data is compressed, then encrypted
fn output_layers(cfg: &PipelineConfig) -> Vec<Layer<'_>> {
    [
        cfg.encrypt_key.as_ref().map(Layer::Cipher),
        cfg.compress_output.then_some(Layer::Gzip),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Builds the reader and writer chains of a run
pub struct Pipeline<'a> {
    cfg: &'a PipelineConfig,
    config: &'a Config,
    level: Compression,
}

impl<'a> Pipeline<'a> {
    /// Validate the configuration. No file is touched.
    pub fn new(cfg: &'a PipelineConfig, config: &'a Config) -> Result<Self, TranscodeError> {
        cfg.validate()?;
        let level = compression_level(config)?;
        Ok(Pipeline { cfg, config, level })
    }

    /// Open the input file, stack the decryption and decompression layers, and decode the
    /// capture header
    pub fn open_input(&self) -> Result<InputChain, TranscodeError> {
        let path = &self.cfg.input;
        let err = |e: Error| TranscodeError::stage(Stage::OpenInput, path, e);
        let file = File::open(path).map_err(|e| err(e.into()))?;
        let mut reader: Box<dyn Read> = Box::new(BufReader::new(file));
        for layer in input_layers(self.cfg) {
            reader = match layer {
                Layer::Cipher(key) => {
                    debug!("input: AES-128-CFB decryption");
                    Box::new(CipherReader::new(reader, key).map_err(|e| err(e.into()))?)
                }
                Layer::Gzip => {
                    debug!("input: gzip decompression");
                    Box::new(gzip_reader(reader).map_err(err)?)
                }
            };
        }
        let reader = CaptureReader::open(self.cfg.input_format, reader, self.config).map_err(err)?;
        Ok(InputChain {
            reader,
            path: path.clone(),
        })
    }

    /// Create (or truncate) the output file, stack the encryption and compression layers,
    /// and write the capture header described by `info`
    pub fn create_output(&self, info: &CaptureInfo) -> Result<OutputChain, TranscodeError> {
        let path = &self.cfg.output;
        let err = |e: Error| TranscodeError::stage(Stage::CreateOutput, path, e);
        let file = File::create(path).map_err(|e| err(e.into()))?;
        let mut sink: Box<dyn Sink> = Box::new(FileSink::new(file));
        for layer in output_layers(self.cfg) {
            sink = match layer {
                Layer::Cipher(key) => {
                    debug!("output: AES-128-CFB encryption");
                    Box::new(CipherWriter::new(sink, key).map_err(|e| err(e.into()))?)
                }
                Layer::Gzip => {
                    debug!("output: gzip compression ({:?})", self.level);
                    Box::new(GzipWriter::new(sink, self.level))
                }
            };
        }
        let mut writer = CaptureWriter::new(self.cfg.output_format, sink);
        match writer.init_file(info) {
            Ok(sz) => Ok(OutputChain {
                writer,
                path: path.clone(),
                bytes_written: sz as u64,
            }),
            Err(e) => {
                let _ = writer.into_inner().finish();
                Err(err(e))
            }
        }
    }
}

/// Input file behind its decoding layers
pub struct InputChain {
    reader: CaptureReader<Box<dyn Read>>,
    path: PathBuf,
}

impl InputChain {
    /// Metadata of the input capture
    pub fn info(&self) -> &CaptureInfo {
        self.reader.info()
    }

    pub fn format(&self) -> CaptureFormat {
        self.reader.format()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn next_record(&mut self) -> Result<Option<PacketRecord>, Error> {
        self.reader.next_record()
    }
}

/// Output file behind its encoding layers
pub struct OutputChain {
    writer: CaptureWriter<Box<dyn Sink>>,
    path: PathBuf,
    bytes_written: u64,
}

impl OutputChain {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes produced by the capture encoder, header included
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn write_packet(&mut self, record: &PacketRecord) -> Result<usize, Error> {
        let sz = self.writer.write_packet(record)?;
        self.bytes_written += sz as u64;
        Ok(sz)
    }

    /// Finish every layer, innermost first, and report the first failure
    pub fn finish(self) -> Result<u64, Error> {
        self.writer.into_inner().finish()?;
        Ok(self.bytes_written)
    }

    /// Release every layer, ignoring errors
    pub fn abort(self) {
        if let Err(e) = self.writer.into_inner().finish() {
            debug!("ignoring error while closing '{}': {}", self.path.display(), e);
        }
    }
}
