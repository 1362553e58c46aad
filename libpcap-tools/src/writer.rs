use crate::context::CaptureInfo;
use crate::error::Error;
use crate::format::CaptureFormat;
use crate::packet::PacketRecord;
use crate::pcap::PcapWriter;
use crate::pcapng::PcapNGWriter;
use std::io::Write;

/// Serializer for one output container format
pub trait Writer {
    /// Emit the file header. Must be called exactly once, before any packet.
    fn init_file(&mut self, info: &CaptureInfo) -> Result<usize, Error>;

    /// Emit one record, in the container format of the writer
    fn write_packet(&mut self, record: &PacketRecord) -> Result<usize, Error>;
}

/// Writer for the format selected at runtime
pub enum CaptureWriter<W: Write> {
    Classic(PcapWriter<W>),
    Segmented(PcapNGWriter<W>),
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(format: CaptureFormat, w: W) -> Self {
        match format {
            CaptureFormat::Classic => CaptureWriter::Classic(PcapWriter::new(w)),
            CaptureFormat::Segmented => CaptureWriter::Segmented(PcapNGWriter::new(w)),
        }
    }

    pub fn format(&self) -> CaptureFormat {
        match self {
            CaptureWriter::Classic(_) => CaptureFormat::Classic,
            CaptureWriter::Segmented(_) => CaptureFormat::Segmented,
        }
    }

    /// Unwrap the underlying stream
    pub fn into_inner(self) -> W {
        match self {
            CaptureWriter::Classic(w) => w.into_inner(),
            CaptureWriter::Segmented(w) => w.into_inner(),
        }
    }
}

impl<W: Write> Writer for CaptureWriter<W> {
    fn init_file(&mut self, info: &CaptureInfo) -> Result<usize, Error> {
        match self {
            CaptureWriter::Classic(w) => w.init_file(info),
            CaptureWriter::Segmented(w) => w.init_file(info),
        }
    }

    fn write_packet(&mut self, record: &PacketRecord) -> Result<usize, Error> {
        match self {
            CaptureWriter::Classic(w) => w.write_packet(record),
            CaptureWriter::Segmented(w) => w.write_packet(record),
        }
    }
}
