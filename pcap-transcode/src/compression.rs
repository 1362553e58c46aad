//! gzip stream adapters

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use libpcap_tools::{Config, Error};
use std::io::{self, BufRead, BufReader, Read, Write};

pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Read the gzip level from the `compression_level` key (0 to 9)
pub fn compression_level(config: &Config) -> Result<Compression, Error> {
    match config.get_usize("compression_level") {
        None => Ok(Compression::new(DEFAULT_COMPRESSION_LEVEL)),
        Some(level) if level <= 9 => Ok(Compression::new(level as u32)),
        Some(level) => Err(Error::Config(format!(
            "invalid compression_level {level}, expected 0 to 9"
        ))),
    }
}

/// Compressing writer. The gzip trailer is written by [`GzipWriter::finish_stream`].
pub struct GzipWriter<W: Write>(GzEncoder<W>);

impl<W: Write> GzipWriter<W> {
    pub fn new(inner: W, level: Compression) -> Self {
        GzipWriter(GzEncoder::new(inner, level))
    }

    /// Write the remaining compressed data and the trailer, and return the wrapped writer
    pub fn finish_stream(self) -> io::Result<W> {
        self.0.finish()
    }
}

impl<W: Write> Write for GzipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Wrap `r` with a gzip decoder, accepting concatenated members.
///
/// The gzip header is checked immediately, so a stream that is not gzip is rejected
/// before any record is decoded.
pub fn gzip_reader<R: Read>(r: R) -> Result<BufReader<MultiGzDecoder<R>>, Error> {
    let mut reader = BufReader::new(MultiGzDecoder::new(r));
    reader.fill_buf().map_err(|e| match e.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            Error::Format(format!("input is not a valid gzip stream: {e}"))
        }
        _ => Error::Io(e),
    })?;
    Ok(reader)
}
