use crate::timestamp::Timestamp;
use pcap_parser::Linktype;

/// One captured frame, decoded from a classic or a segmented capture
///
/// The payload is owned: each decoded record is independent from the parser buffer,
/// and `data.len()` is always equal to `caplen`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketRecord {
    /// Index of the capture interface (always 0 for classic captures)
    pub interface: u32,
    pub ts: Timestamp,
    pub link_type: Linktype,
    /// Number of bytes stored in the capture
    pub caplen: u32,
    /// Length of the frame on the wire
    pub origlen: u32,
    pub data: Vec<u8>,
    /// Position of the record in the input, starting at 1
    pub pcap_index: usize,
}

impl PacketRecord {
    /// Returns `true` if the frame was cut when captured
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.origlen > self.caplen
    }
}
