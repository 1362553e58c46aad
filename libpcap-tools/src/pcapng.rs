use crate::context::CaptureInfo;
use crate::error::Error;
use crate::packet::PacketRecord;
use crate::timestamp::TsPrecision;
use crate::writer::Writer;
use pcap_parser::pcapng::*;
use pcap_parser::ToVec;
use std::io::Write;

/// Writer for the pcap-ng format
///
/// The output holds one section and one interface: every record is written as an
/// Enhanced Packet Block for interface 0.
pub struct PcapNGWriter<W>
where
    W: Write,
{
    w: W,
    precision: Option<TsPrecision>,
}

impl<W: Write> PcapNGWriter<W> {
    pub fn new(w: W) -> Self {
        PcapNGWriter { w, precision: None }
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

impl<W: Write> Writer for PcapNGWriter<W> {
    fn init_file(&mut self, info: &CaptureInfo) -> Result<usize, Error> {
        if self.precision.is_some() {
            return Err(Error::format("pcap-ng header already written"));
        }
        // write SHB and IDB
        let shb = SectionHeaderBlock {
            block_type: SHB_MAGIC,
            block_len1: 28, // no options
            bom: BOM_MAGIC,
            major_version: 1,
            minor_version: 0,
            section_len: -1,
            options: Vec::new(),
            block_len2: 28,
        };
        let v = shb
            .to_vec_raw()
            .map_err(|_| Error::format("SHB serialization failed"))?;
        self.w.write_all(&v)?;
        let mut idb = InterfaceDescriptionBlock {
            block_type: IDB_MAGIC,
            block_len1: 20,
            linktype: info.link_type,
            reserved: 0,
            snaplen: info.snaplen,
            options: vec![],
            block_len2: 20,
            if_tsresol: info.precision.if_tsresol(),
            if_tsoffset: 0,
        };
        // to_vec will add options automatically
        let v2 = idb
            .to_vec()
            .map_err(|_| Error::format("IDB serialization failed"))?;
        self.w.write_all(&v2)?;
        self.precision = Some(info.precision);
        Ok(v.len() + v2.len())
    }

    fn write_packet(&mut self, record: &PacketRecord) -> Result<usize, Error> {
        let precision = self
            .precision
            .ok_or_else(|| Error::format("packet written before pcap-ng header"))?;
        let ts = record.ts.to_units(precision.units_per_sec());
        let mut epb = EnhancedPacketBlock {
            block_type: EPB_MAGIC,
            block_len1: 32,
            if_id: 0,
            ts_high: (ts >> 32) as u32,
            ts_low: (ts & 0xffff_ffff) as u32,
            caplen: record.data.len() as u32,
            origlen: record.origlen,
            data: &record.data,
            options: Vec::new(),
            block_len2: 32,
        };
        // to_vec will adjust length
        let v = epb
            .to_vec()
            .map_err(|_| Error::format("EPB serialization failed"))?;
        self.w.write_all(&v)?;
        Ok(v.len())
    }
}
