use std::fmt;
use std::str::FromStr;

/// Capture container format
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CaptureFormat {
    /// Legacy pcap: one global header, then flat records
    Classic,
    /// Pcap-NG: sections, interfaces and packet blocks
    Segmented,
}

// https://www.tcpdump.org/manpages/pcap-savefile.5.html
fn pcap_matcher(buf: &[u8]) -> bool {
    matches!(
        buf,
        [0xa1, 0xb2, 0xc3, 0xd4, ..]
            | [0xd4, 0xc3, 0xb2, 0xa1, ..]
            | [0xa1, 0xb2, 0x3c, 0x4d, ..]
            | [0x4d, 0x3c, 0xb2, 0xa1, ..]
    )
}

fn pcapng_shb_magic_matcher(buf: &[u8]) -> bool {
    buf.len() >= 4 && buf[0] == 0x0a && buf[1] == 0x0d && buf[2] == 0x0d && buf[3] == 0x0a
}

fn pcapng_bom_magic_matcher(buf: &[u8]) -> bool {
    buf.len() >= 12
        && (buf[8..12] == [0x1a, 0x2b, 0x3c, 0x4d] || buf[8..12] == [0x4d, 0x3c, 0x2b, 0x1a])
}

impl CaptureFormat {
    /// Guess the container format from the first bytes of a (decoded) stream
    pub fn detect(head: &[u8]) -> Option<CaptureFormat> {
        if pcap_matcher(head) {
            Some(CaptureFormat::Classic)
        } else if pcapng_shb_magic_matcher(head) && pcapng_bom_magic_matcher(head) {
            Some(CaptureFormat::Segmented)
        } else {
            None
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CaptureFormat::Classic => "pcap",
            CaptureFormat::Segmented => "pcapng",
        }
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CaptureFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pcap" | "classic" => Ok(CaptureFormat::Classic),
            "pcapng" | "segmented" | "ng" => Ok(CaptureFormat::Segmented),
            _ => Err(format!("unknown capture format '{s}'")),
        }
    }
}
