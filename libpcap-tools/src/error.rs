use pcap_parser::PcapError;
use std::fmt::Debug;
use std::io;
use thiserror::Error;

/// Errors raised while reading or writing captures
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid option or key, detected before any I/O
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unparseable or inconsistent container data
    #[error("format error: {0}")]
    Format(String),

    /// The stream ended inside a record
    #[error("record {index} is truncated: its header promises more bytes than the stream holds")]
    Truncated { index: usize },
}

impl Error {
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Convert a pcap-parser error raised while reading record `index`
    pub(crate) fn from_pcap<I: Debug>(e: PcapError<I>, index: usize) -> Self {
        match e {
            PcapError::UnexpectedEof => Error::Truncated { index },
            PcapError::ReadError => Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "read error in underlying stream",
            )),
            PcapError::HeaderNotRecognized => Error::format("capture header not recognized"),
            e => Error::Format(format!("{e:?}")),
        }
    }
}
