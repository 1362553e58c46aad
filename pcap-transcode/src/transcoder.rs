use crate::error::{Stage, TranscodeError};
use crate::pipeline::{InputChain, OutputChain};
use libpcap_tools::{CaptureInfo, Config, Error, PacketRecord};

/// Counters of a transcoding run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Records copied to the output
    pub num_packets: u64,
    /// Captured payload bytes copied to the output
    pub num_bytes: u64,
    /// Bytes produced by the capture encoder, before compression and encryption
    pub bytes_written: u64,
    /// Records whose captured length exceeds the output snapshot length
    pub oversize: u64,
}

enum State {
    Running,
    Done,
    Failed(TranscodeError),
}

/// Copies every record of an input chain to an output chain
pub struct Transcoder {
    input: InputChain,
    output: OutputChain,
    info: CaptureInfo,
    strict_snaplen: bool,
    warned_interface: bool,
    stats: TranscodeStats,
}

impl Transcoder {
    pub fn new(input: InputChain, output: OutputChain, config: &Config) -> Self {
        let info = *input.info();
        Transcoder {
            input,
            output,
            info,
            strict_snaplen: config.get_bool("strict_snaplen").unwrap_or(false),
            warned_interface: false,
            stats: TranscodeStats::default(),
        }
    }

    fn read_error(&self, e: Error) -> TranscodeError {
        TranscodeError::stage(Stage::ReadInput, self.input.path(), e)
    }

    /// Check one record against the output session, before it is encoded
    fn check_record(&mut self, record: &PacketRecord) -> Result<(), Error> {
        if record.interface != 0 && !self.warned_interface {
            warn!(
                "record {} comes from interface {}, it is written to the single output interface",
                record.pcap_index, record.interface
            );
            self.warned_interface = true;
        }
        if self.info.snaplen > 0 && record.caplen > self.info.snaplen {
            self.stats.oversize += 1;
            if self.strict_snaplen {
                return Err(Error::Format(format!(
                    "record {}: captured length {} exceeds snaplen {}",
                    record.pcap_index, record.caplen, self.info.snaplen
                )));
            }
            warn!(
                "record {}: captured length {} exceeds snaplen {}",
                record.pcap_index, record.caplen, self.info.snaplen
            );
        }
        Ok(())
    }

    /// Pull one record from the input and write it to the output
    fn step(&mut self) -> State {
        let record = match self.input.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => return State::Done,
            Err(e) => return State::Failed(self.read_error(e)),
        };
        if let Err(e) = self.check_record(&record) {
            // the record is valid input, the output session can not hold it
            return State::Failed(TranscodeError::stage(
                Stage::WriteOutput,
                self.output.path(),
                e,
            ));
        }
        trace!(
            "writing record {} ({} bytes, ts {})",
            record.pcap_index,
            record.caplen,
            record.ts
        );
        match self.output.write_packet(&record) {
            Ok(_) => {
                self.stats.num_packets += 1;
                self.stats.num_bytes += record.data.len() as u64;
                State::Running
            }
            Err(e) => State::Failed(TranscodeError::stage(
                Stage::WriteOutput,
                self.output.path(),
                e,
            )),
        }
    }

    /// Copy all records, then finish the output.
    ///
    /// The output layers are released on every path. On failure, the first error is
    /// returned and the output is left as written so far.
    pub fn run(mut self) -> Result<TranscodeStats, TranscodeError> {
        let mut state = State::Running;
        while let State::Running = state {
            state = self.step();
        }
        let Transcoder {
            output, mut stats, ..
        } = self;
        match state {
            State::Failed(e) => {
                output.abort();
                Err(e)
            }
            _ => {
                let path = output.path().to_path_buf();
                stats.bytes_written = output.bytes_written();
                output
                    .finish()
                    .map_err(|e| TranscodeError::stage(Stage::Finalize, path, e))?;
                info!("Done.");
                info!("Stats: {:?}", stats);
                Ok(stats)
            }
        }
    }
}
