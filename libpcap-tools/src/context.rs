use crate::error::Error;
use crate::timestamp::TsPrecision;
use pcap_parser::pcapng::InterfaceDescriptionBlock;
use pcap_parser::{Linktype, PcapHeader};

/// Snapshot length used when the input does not declare one
pub const DEFAULT_SNAPLEN: u32 = 262_144;

/// Per-file declarations shared by all records of a capture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaptureInfo {
    /// The `Linktype` used for data format
    pub link_type: Linktype,
    /// Maximum number of octets captured from each packet
    pub snaplen: u32,
    /// Time resolution of the records
    pub precision: TsPrecision,
}

impl CaptureInfo {
    pub fn new(link_type: Linktype, snaplen: u32) -> Self {
        CaptureInfo {
            link_type,
            snaplen,
            precision: TsPrecision::Micro,
        }
    }

    pub fn with_precision(self, precision: TsPrecision) -> Self {
        CaptureInfo { precision, ..self }
    }
}

/// Information related to a network interface used for capture
#[derive(Clone, Debug)]
pub struct InterfaceInfo {
    /// The `Linktype` used for data format
    pub link_type: Linktype,
    /// Time resolution
    pub if_tsresol: u8,
    /// Time resolution units
    pub ts_unit: u64,
    /// Time offset, in seconds
    pub if_tsoffset: i64,
    /// Maximum number of octets captured from each packet (0: unlimited)
    pub snaplen: u32,
}

impl Default for InterfaceInfo {
    fn default() -> Self {
        InterfaceInfo {
            link_type: Linktype(0),
            if_tsresol: 6,
            ts_unit: 1_000_000,
            if_tsoffset: 0,
            snaplen: 0,
        }
    }
}

impl InterfaceInfo {
    #[inline]
    pub fn precision(&self) -> TsPrecision {
        TsPrecision::from_units(self.ts_unit)
    }
}

pub fn legacy_build_interface(hdr: &PcapHeader) -> InterfaceInfo {
    let (if_tsresol, ts_unit) = if hdr.is_nanosecond_precision() {
        (9, 1_000_000_000)
    } else {
        (6, 1_000_000)
    };
    InterfaceInfo {
        link_type: hdr.network,
        if_tsresol,
        ts_unit,
        if_tsoffset: 0,
        snaplen: hdr.snaplen,
    }
}

#[allow(clippy::unnecessary_cast)]
pub fn pcapng_build_interface(idb: &InterfaceDescriptionBlock) -> Result<InterfaceInfo, Error> {
    let if_tsresol = idb.if_tsresol;
    let ts_unit = pcap_parser::build_ts_resolution(if_tsresol).ok_or_else(|| {
        Error::Format(format!("invalid interface time resolution {if_tsresol:#x}"))
    })?;
    Ok(InterfaceInfo {
        link_type: idb.linktype,
        if_tsresol,
        ts_unit,
        if_tsoffset: idb.if_tsoffset as i64,
        snaplen: idb.snaplen,
    })
}
