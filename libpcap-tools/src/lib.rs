//! Building blocks to read and write network captures
//!
//! Both the legacy pcap format ([`CaptureFormat::Classic`]) and pcap-ng
//! ([`CaptureFormat::Segmented`]) are supported. A [`CaptureReader`] decodes records from any
//! [`Read`](std::io::Read) stream, and a [`CaptureWriter`] serializes them to any
//! [`Write`](std::io::Write) stream, so that compression or encryption layers can be stacked
//! on both sides.

#[macro_use]
extern crate log;

mod config;
mod context;
mod error;
mod format;
mod packet;
mod pcap;
mod pcapng;
mod reader;
mod timestamp;
mod writer;

pub use config::*;
pub use context::*;
pub use error::*;
pub use format::CaptureFormat;
pub use packet::PacketRecord;
pub use pcap::PcapWriter;
pub use pcap_parser::Linktype;
pub use pcapng::PcapNGWriter;
pub use reader::CaptureReader;
pub use timestamp::*;
pub use writer::{CaptureWriter, Writer};
