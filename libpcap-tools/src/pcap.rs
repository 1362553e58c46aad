use crate::context::CaptureInfo;
use crate::error::Error;
use crate::packet::PacketRecord;
use crate::timestamp::TsPrecision;
use crate::writer::Writer;
use pcap_parser::{LegacyPcapBlock, PcapHeader, ToVec};
use std::io::Write;

const PCAP_MAGIC_NANO: u32 = 0xa1b2_3c4d;

/// Writer for the legacy pcap format
pub struct PcapWriter<W>
where
    W: Write,
{
    w: W,
    precision: Option<TsPrecision>,
}

impl<W: Write> PcapWriter<W> {
    pub fn new(w: W) -> Self {
        PcapWriter { w, precision: None }
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

impl<W: Write> Writer for PcapWriter<W> {
    fn init_file(&mut self, info: &CaptureInfo) -> Result<usize, Error> {
        if self.precision.is_some() {
            return Err(Error::format("pcap header already written"));
        }
        let mut hdr = PcapHeader::new();
        hdr.snaplen = info.snaplen;
        hdr.network = info.link_type;
        if info.precision == TsPrecision::Nano {
            hdr.magic_number = PCAP_MAGIC_NANO;
        }
        let s = hdr
            .to_vec()
            .map_err(|_| Error::format("Pcap header serialization failed"))?;
        self.w.write_all(&s)?;
        self.precision = Some(info.precision);
        Ok(s.len())
    }

    fn write_packet(&mut self, record: &PacketRecord) -> Result<usize, Error> {
        let precision = self
            .precision
            .ok_or_else(|| Error::format("packet written before pcap header"))?;
        let block = LegacyPcapBlock {
            ts_sec: record.ts.secs,
            ts_usec: record.ts.fraction(precision),
            caplen: record.data.len() as u32,
            origlen: record.origlen,
            data: &record.data,
        };
        let s = block
            .to_vec_raw()
            .map_err(|_| Error::format("Pcap block serialization failed"))?;
        self.w.write_all(&s)?;
        Ok(s.len())
    }
}
