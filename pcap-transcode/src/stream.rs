use crate::cipher::CipherWriter;
use crate::compression::GzipWriter;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Output stream layer that must be finished explicitly
///
/// Finishing a layer writes its pending data (gzip trailer, buffered bytes), then finishes
/// the layer it wraps, so the innermost layer is always finished first.
pub trait Sink: Write {
    fn finish(self: Box<Self>) -> io::Result<()>;
}

/// Output file, buffered
pub struct FileSink(BufWriter<File>);

impl FileSink {
    pub fn new(file: File) -> Self {
        FileSink(BufWriter::new(file))
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Sink for FileSink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let file = self.0.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()
    }
}

impl Sink for CipherWriter<Box<dyn Sink>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        // ciphertext is never held back, only the wrapped layer needs finishing
        self.into_inner().finish()
    }
}

impl Sink for GzipWriter<Box<dyn Sink>> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let inner = self.finish_stream()?;
        inner.finish()
    }
}
