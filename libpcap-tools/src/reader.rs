use crate::config::Config;
use crate::context::*;
use crate::error::Error;
use crate::format::CaptureFormat;
use crate::packet::PacketRecord;
use crate::timestamp::Timestamp;
use pcap_parser::pcapng::Block;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader};
use std::cell::RefCell;
use std::io::{self, Cursor, Read};
use std::rc::Rc;

/// Number of bytes needed to recognize both container magics
const HEAD_LEN: usize = 12;

type Source<R> = FullReader<io::Chain<Cursor<Vec<u8>>, R>>;

/// Last error raised by the source. The parser only reports `ReadError`, without the cause.
type ErrorSlot = Rc<RefCell<Option<io::Error>>>;

enum ReaderInner<R: Read> {
    Classic(LegacyPcapReader<Source<R>>),
    Segmented(PcapNGReader<Source<R>>),
}

/// Result of handling one parsed block
enum Step<T> {
    Emit(T),
    Skip,
}

struct BufferLimits {
    capacity: usize,
    max_size: usize,
}

/// Decoder for classic and segmented captures
///
/// `CaptureReader` validates the container header when opened, exposes the capture
/// metadata ([`CaptureInfo`]), then yields [`PacketRecord`]s in file order, one at a time.
///
/// ## example
///
/// ```
/// use libpcap_tools::{CaptureFormat, CaptureReader, Config};
/// use std::io::Cursor;
///
/// let config = Config::default();
/// let input = Cursor::new(vec![1, 2, 3, 4, 5]);
/// // not a capture: rejected when opening
/// assert!(CaptureReader::open(CaptureFormat::Classic, input, &config).is_err());
/// ```
pub struct CaptureReader<R: Read> {
    inner: ReaderInner<R>,
    info: CaptureInfo,
    interfaces: Vec<InterfaceInfo>,
    limits: BufferLimits,
    last_error: ErrorSlot,
    pcap_index: usize,
    failed: bool,
}

/// Read until `buf` is full or the stream ends
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut len = 0;
    while len < buf.len() {
        match reader.read(&mut buf[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(len)
}

/// Reader filling the whole buffer on each call
///
/// The parser decodes file headers from the result of a single `read`, which decoders
/// like gzip would otherwise cut at arbitrary positions.
struct FullReader<R> {
    inner: R,
    pending: Option<io::Error>,
    last_error: ErrorSlot,
}

impl<R> FullReader<R> {
    /// Keep `e` for the reader, and return a copy of its kind to the parser
    fn fail(&mut self, e: io::Error) -> io::Error {
        let kind = e.kind();
        *self.last_error.borrow_mut() = Some(e);
        io::Error::from(kind)
    }
}

impl<R: Read> Read for FullReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.pending.take() {
            return Err(self.fail(e));
        }
        let mut len = 0;
        while len < buf.len() {
            match self.inner.read(&mut buf[len..]) {
                Ok(0) => break,
                Ok(n) => len += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if len == 0 => return Err(self.fail(e)),
                Err(e) => {
                    // deliver the bytes read so far, report the error on next call
                    self.pending = Some(e);
                    break;
                }
            }
        }
        Ok(len)
    }
}

/// Convert a parser error, restoring the cause of read errors
fn parse_error<I: std::fmt::Debug>(e: PcapError<I>, last_error: &ErrorSlot, index: usize) -> Error {
    match e {
        PcapError::ReadError => match last_error.borrow_mut().take() {
            Some(e) => Error::Io(e),
            None => Error::from_pcap(e, index),
        },
        e => Error::from_pcap(e, index),
    }
}

fn header_error<I: std::fmt::Debug>(e: PcapError<I>, last_error: &ErrorSlot) -> Error {
    match e {
        PcapError::Incomplete(_) | PcapError::UnexpectedEof | PcapError::Eof => {
            Error::format("capture header is truncated")
        }
        e => parse_error(e, last_error, 0),
    }
}

/// Double the parser buffer, up to the configured maximum
fn grow<P: PcapReaderIterator>(
    reader: &mut P,
    limits: &mut BufferLimits,
    index: usize,
) -> Result<(), Error> {
    if limits.capacity >= limits.max_size {
        return Err(Error::Format(format!(
            "block of record {} does not fit in a {} bytes buffer",
            index, limits.max_size
        )));
    }
    limits.capacity = limits.capacity.saturating_mul(2).min(limits.max_size);
    debug!("growing parser buffer to {} bytes", limits.capacity);
    if !reader.grow(limits.capacity) {
        return Err(Error::format("could not grow parser buffer"));
    }
    Ok(())
}

/// Pull blocks from `reader` until `handle` emits a value or the stream ends
fn pull<P, T, F>(
    reader: &mut P,
    limits: &mut BufferLimits,
    last_error: &ErrorSlot,
    index: usize,
    mut handle: F,
) -> Result<Option<T>, Error>
where
    P: PcapReaderIterator,
    F: FnMut(&PcapBlockOwned<'_>) -> Result<Step<T>, Error>,
{
    let mut last_incomplete = false;
    loop {
        match reader.next() {
            Ok((offset, block)) => {
                last_incomplete = false;
                let step = handle(&block);
                reader.consume(offset);
                match step? {
                    Step::Emit(t) => return Ok(Some(t)),
                    Step::Skip => continue,
                }
            }
            Err(PcapError::Eof) => return Ok(None),
            Err(PcapError::Incomplete(_)) => {
                if last_incomplete {
                    if reader.reader_exhausted() {
                        return Err(Error::Truncated { index });
                    }
                    // refill did not help, the block is larger than the buffer
                    grow(reader, limits, index)?;
                }
                last_incomplete = true;
                reader
                    .refill()
                    .map_err(|e| parse_error(e, last_error, index))?;
            }
            Err(PcapError::BufferTooSmall) => {
                grow(reader, limits, index)?;
                reader
                    .refill()
                    .map_err(|e| parse_error(e, last_error, index))?;
            }
            Err(e) => return Err(parse_error(e, last_error, index)),
        }
    }
}

fn classic_step(
    block: &PcapBlockOwned,
    interfaces: &[InterfaceInfo],
    index: usize,
) -> Result<Step<PacketRecord>, Error> {
    match block {
        PcapBlockOwned::Legacy(b) => {
            let if_info = interfaces
                .first()
                .ok_or_else(|| Error::format("record found before the file header"))?;
            let data = b
                .data
                .get(..b.caplen as usize)
                .ok_or(Error::Truncated { index })?;
            let ts = Timestamp::from_fraction(b.ts_sec, u64::from(b.ts_usec), if_info.ts_unit);
            Ok(Step::Emit(PacketRecord {
                interface: 0,
                ts,
                link_type: if_info.link_type,
                caplen: b.caplen,
                origlen: b.origlen,
                data: data.to_vec(),
                pcap_index: index,
            }))
        }
        _ => {
            warn!("unexpected block in classic capture");
            Ok(Step::Skip)
        }
    }
}

fn segmented_step(
    block: &PcapBlockOwned,
    interfaces: &mut Vec<InterfaceInfo>,
    index: usize,
) -> Result<Step<PacketRecord>, Error> {
    match block {
        PcapBlockOwned::NG(Block::SectionHeader(_)) => {
            debug!("pcap-ng: new section");
            interfaces.clear();
            Ok(Step::Skip)
        }
        PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
            interfaces.push(pcapng_build_interface(idb)?);
            Ok(Step::Skip)
        }
        PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
            let if_info = interfaces.get(epb.if_id as usize).ok_or_else(|| {
                Error::Format(format!(
                    "record {} references unknown interface {}",
                    index, epb.if_id
                ))
            })?;
            let data = epb.data.get(..epb.caplen as usize).ok_or_else(|| {
                Error::Format(format!(
                    "record {}: captured length {} exceeds block size",
                    index, epb.caplen
                ))
            })?;
            let ts = (u64::from(epb.ts_high) << 32) | u64::from(epb.ts_low);
            let ts = Timestamp::from_units(ts, if_info.ts_unit, if_info.if_tsoffset)
                .ok_or_else(|| {
                    Error::Format(format!(
                        "record {index}: timestamp out of range (offset {}s)",
                        if_info.if_tsoffset
                    ))
                })?;
            Ok(Step::Emit(PacketRecord {
                interface: epb.if_id,
                ts,
                link_type: if_info.link_type,
                caplen: epb.caplen,
                origlen: epb.origlen,
                data: data.to_vec(),
                pcap_index: index,
            }))
        }
        PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
            let if_info = interfaces.first().ok_or_else(|| {
                Error::Format(format!("record {index}: simple packet without interface"))
            })?;
            // SPB data is padded, its captured length is bounded by the snaplen
            let mut caplen = spb.origlen as usize;
            if if_info.snaplen > 0 {
                caplen = caplen.min(if_info.snaplen as usize);
            }
            let data = &spb.data[..caplen.min(spb.data.len())];
            Ok(Step::Emit(PacketRecord {
                interface: 0,
                ts: Timestamp::default(),
                link_type: if_info.link_type,
                caplen: data.len() as u32,
                origlen: spb.origlen,
                data: data.to_vec(),
                pcap_index: index,
            }))
        }
        PcapBlockOwned::NG(_) => {
            trace!("skipping pcap-ng block");
            Ok(Step::Skip)
        }
        _ => {
            warn!("unexpected block in pcap-ng capture");
            Ok(Step::Skip)
        }
    }
}

impl<R: Read> CaptureReader<R> {
    /// Open a capture of the given format and parse its header.
    ///
    /// For segmented captures, blocks are read up to the first interface description,
    /// whose link type and snapshot length become the capture metadata.
    pub fn open(format: CaptureFormat, mut reader: R, config: &Config) -> Result<Self, Error> {
        let mut head = vec![0; HEAD_LEN];
        let len = read_full(&mut reader, &mut head)?;
        head.truncate(len);
        if head.is_empty() {
            return Err(Error::format("missing capture header: stream is empty"));
        }
        match CaptureFormat::detect(&head) {
            Some(f) if f == format => (),
            Some(f) => {
                return Err(Error::Format(format!(
                    "expected a {format} capture, found a {f} header"
                )))
            }
            None => {
                return Err(Error::Format(format!(
                    "unrecognized capture magic {:02x?}",
                    &head[..head.len().min(4)]
                )))
            }
        }

        let capacity = config.buffer_initial_capacity();
        let limits = BufferLimits {
            capacity,
            max_size: config.buffer_max_size().max(capacity),
        };
        let last_error = ErrorSlot::default();
        let source = FullReader {
            inner: Cursor::new(head).chain(reader),
            pending: None,
            last_error: last_error.clone(),
        };
        let inner = match format {
            CaptureFormat::Classic => {
                ReaderInner::Classic(LegacyPcapReader::new(capacity, source)
                    .map_err(|e| header_error(e, &last_error))?)
            }
            CaptureFormat::Segmented => {
                ReaderInner::Segmented(PcapNGReader::new(capacity, source)
                    .map_err(|e| header_error(e, &last_error))?)
            }
        };
        let mut reader = CaptureReader {
            inner,
            info: CaptureInfo::new(Linktype(0), 0),
            interfaces: Vec::new(),
            limits,
            last_error,
            pcap_index: 0,
            failed: false,
        };
        reader.read_header(config.default_snaplen())?;
        Ok(reader)
    }

    fn read_header(&mut self, default_snaplen: u32) -> Result<(), Error> {
        let interfaces = &mut self.interfaces;
        let found = match &mut self.inner {
            ReaderInner::Classic(reader) => pull(reader, &mut self.limits, &self.last_error, 0, |block| match block {
                PcapBlockOwned::LegacyHeader(hdr) => {
                    interfaces.push(legacy_build_interface(hdr));
                    Ok(Step::Emit(()))
                }
                _ => Err(Error::format("missing pcap file header")),
            })?,
            ReaderInner::Segmented(reader) => {
                pull(reader, &mut self.limits, &self.last_error, 0, |block| match block {
                    PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                        interfaces.clear();
                        Ok(Step::Skip)
                    }
                    PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                        interfaces.push(pcapng_build_interface(idb)?);
                        Ok(Step::Emit(()))
                    }
                    PcapBlockOwned::NG(Block::EnhancedPacket(_))
                    | PcapBlockOwned::NG(Block::SimplePacket(_)) => Err(Error::format(
                        "packet block found before any interface description",
                    )),
                    _ => Ok(Step::Skip),
                })?
            }
        };
        let if_info = match (found, self.interfaces.first()) {
            (Some(()), Some(if_info)) => if_info,
            _ => return Err(Error::format("no interface description in capture")),
        };
        let snaplen = if if_info.snaplen == 0 {
            debug!("input declares no snaplen, using {}", default_snaplen);
            default_snaplen
        } else {
            if_info.snaplen
        };
        self.info = CaptureInfo::new(if_info.link_type, snaplen).with_precision(if_info.precision());
        debug!(
            "{} capture, link type: {}, snaplen: {}, precision: {:?}",
            self.format(),
            self.info.link_type,
            self.info.snaplen,
            self.info.precision
        );
        Ok(())
    }

    /// Capture metadata resolved from the header
    pub fn info(&self) -> &CaptureInfo {
        &self.info
    }

    pub fn format(&self) -> CaptureFormat {
        match self.inner {
            ReaderInner::Classic(_) => CaptureFormat::Classic,
            ReaderInner::Segmented(_) => CaptureFormat::Segmented,
        }
    }

    /// Interfaces of the current section
    pub fn interfaces(&self) -> &[InterfaceInfo] {
        &self.interfaces
    }

    /// Number of records decoded so far
    pub fn packets_read(&self) -> usize {
        self.pcap_index
    }

    /// Decode the next record.
    ///
    /// Returns `Ok(None)` at the clean end of the stream, and `Error::Truncated` if the
    /// stream ends inside a record.
    pub fn next_record(&mut self) -> Result<Option<PacketRecord>, Error> {
        let index = self.pcap_index + 1;
        let interfaces = &mut self.interfaces;
        let res = match &mut self.inner {
            ReaderInner::Classic(reader) => pull(reader, &mut self.limits, &self.last_error, index, |block| {
                classic_step(block, interfaces, index)
            }),
            ReaderInner::Segmented(reader) => pull(reader, &mut self.limits, &self.last_error, index, |block| {
                segmented_step(block, interfaces, index)
            }),
        };
        match res {
            Ok(Some(record)) => {
                self.pcap_index = index;
                trace!("record {}: {} bytes at {}", index, record.caplen, record.ts);
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<PacketRecord, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.next_record().transpose()
    }
}
