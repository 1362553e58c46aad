use libpcap_tools::*;
use pcap_transcode::cipher::CipherReader;
use pcap_transcode::compression::gzip_reader;
use pcap_transcode::*;
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const KEY: &[u8] = b"sixteen byte key";

fn record(index: usize, secs: u32, micros: u32, data: Vec<u8>) -> PacketRecord {
    PacketRecord {
        interface: 0,
        ts: Timestamp::new(secs, micros * 1000),
        link_type: Linktype::ETHERNET,
        caplen: data.len() as u32,
        origlen: data.len() as u32,
        data,
        pcap_index: index,
    }
}

fn records(n: usize) -> Vec<PacketRecord> {
    (1..=n)
        .map(|i| record(i, 1_500_000_000 + i as u32, (i * 17) as u32, vec![i as u8; 40 + i]))
        .collect()
}

fn write_capture(path: &Path, format: CaptureFormat, info: &CaptureInfo, records: &[PacketRecord]) {
    let mut w = CaptureWriter::new(format, File::create(path).unwrap());
    w.init_file(info).unwrap();
    for r in records {
        w.write_packet(r).unwrap();
    }
}

fn read_capture(data: Vec<u8>, format: CaptureFormat) -> (CaptureInfo, Vec<PacketRecord>) {
    let config = Config::default();
    let reader = CaptureReader::open(format, Cursor::new(data), &config).unwrap();
    let info = *reader.info();
    (info, reader.collect::<Result<Vec<_>, _>>().unwrap())
}

fn decrypt(data: Vec<u8>) -> Vec<u8> {
    let key = AesKey::from_slice(KEY).unwrap();
    let mut out = Vec::new();
    CipherReader::new(Cursor::new(data), &key)
        .unwrap()
        .read_to_end(&mut out)
        .unwrap();
    out
}

fn gunzip(data: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::new();
    gzip_reader(Cursor::new(data))
        .unwrap()
        .read_to_end(&mut out)
        .unwrap();
    out
}

struct Setup {
    _dir: TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn setup(input_name: &str, output_name: &str) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    Setup {
        input: dir.path().join(input_name),
        output: dir.path().join(output_name),
        _dir: dir,
    }
}

#[test]
fn classic_to_compressed_segmented() {
    let s = setup("in.pcap", "out.pcapng.gz");
    let info = CaptureInfo::new(Linktype::RAW, 65535);
    let input = records(3);
    write_capture(&s.input, CaptureFormat::Classic, &info, &input);

    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.output_format = CaptureFormat::Segmented;
    cfg.compress_output = true;
    let stats = transcode_file(&cfg, &Config::default()).unwrap();
    assert_eq!(stats.num_packets, 3);
    assert_eq!(stats.num_bytes, input.iter().map(|r| r.data.len() as u64).sum());

    let data = gunzip(fs::read(&s.output).unwrap());
    assert_eq!(stats.bytes_written, data.len() as u64);
    let (out_info, out) = read_capture(data, CaptureFormat::Segmented);
    assert_eq!(out_info.link_type, Linktype::RAW);
    assert_eq!(out_info.snaplen, 65535);
    assert_eq!(out.len(), 3);
    for (a, b) in input.iter().zip(out.iter()) {
        assert_eq!(a.ts, b.ts);
        assert_eq!(a.data, b.data);
        assert_eq!(a.origlen, b.origlen);
        assert_eq!(a.pcap_index, b.pcap_index);
    }
}

#[test]
fn segmented_and_back() {
    let s = setup("in.pcap", "mid.pcapng");
    let back = s.input.with_file_name("back.pcap");
    let info = CaptureInfo::new(Linktype::ETHERNET, 1514);
    let mut input = records(5);
    input[2].origlen = 1400;
    write_capture(&s.input, CaptureFormat::Classic, &info, &input);

    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.output_format = CaptureFormat::Segmented;
    transcode_file(&cfg, &Config::default()).unwrap();
    let mut cfg = PipelineConfig::new(&s.output, &back);
    cfg.input_format = CaptureFormat::Segmented;
    transcode_file(&cfg, &Config::default()).unwrap();

    let (out_info, out) = read_capture(fs::read(&back).unwrap(), CaptureFormat::Classic);
    assert_eq!(out_info, info);
    assert_eq!(out, input);
    // same format round trip is byte-exact
    assert_eq!(fs::read(&back).unwrap(), fs::read(&s.input).unwrap());
}

#[test]
fn record_order() {
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535);
    for n in [0, 1, 50] {
        let s = setup("in.pcap", "out.pcap");
        let input = records(n);
        write_capture(&s.input, CaptureFormat::Classic, &info, &input);
        let stats =
            transcode_file(&PipelineConfig::new(&s.input, &s.output), &Config::default()).unwrap();
        assert_eq!(stats.num_packets, n as u64);
        let (_, out) = read_capture(fs::read(&s.output).unwrap(), CaptureFormat::Classic);
        assert_eq!(out, input);
    }
}

#[test]
fn compressed_then_encrypted() {
    let s = setup("in.pcap", "out.pcap.gz.aes");
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535);
    let input = records(4);
    write_capture(&s.input, CaptureFormat::Classic, &info, &input);

    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.compress_output = true;
    cfg.encrypt_key = Some(AesKey::from_slice(KEY).unwrap());
    transcode_file(&cfg, &Config::default()).unwrap();

    let raw = fs::read(&s.output).unwrap();
    // outer layer is the cipher, not gzip
    assert!(gzip_reader(Cursor::new(raw.clone())).is_err());
    let (_, out) = read_capture(gunzip(decrypt(raw)), CaptureFormat::Classic);
    assert_eq!(out, input);

    // and the pipeline reads it back the same way
    let back = s.input.with_file_name("back.pcap");
    let mut cfg = PipelineConfig::new(&s.output, &back);
    cfg.decompress_input = true;
    cfg.decrypt_key = Some(AesKey::from_slice(KEY).unwrap());
    transcode_file(&cfg, &Config::default()).unwrap();
    assert_eq!(fs::read(&back).unwrap(), fs::read(&s.input).unwrap());
}

#[test]
fn wrong_decryption_key() {
    let s = setup("in.pcap", "out.pcap.aes");
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535);
    write_capture(&s.input, CaptureFormat::Classic, &info, &records(2));
    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.encrypt_key = Some(AesKey::from_slice(KEY).unwrap());
    transcode_file(&cfg, &Config::default()).unwrap();

    let back = s.input.with_file_name("back.pcap");
    let mut cfg = PipelineConfig::new(&s.output, &back);
    cfg.decrypt_key = Some(AesKey::from_slice(b"another key 1234").unwrap());
    let err = transcode_file(&cfg, &Config::default()).unwrap_err();
    assert_eq!(err.failed_stage(), Some(Stage::OpenInput));
    assert!(matches!(err.error(), Error::Format(_)));
    // the output is created after the input header is validated
    assert!(!back.exists());
}

#[test]
fn truncated_input() {
    let s = setup("in.pcap", "out.pcapng");
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535);
    write_capture(&s.input, CaptureFormat::Classic, &info, &records(3));
    let mut data = fs::read(&s.input).unwrap();
    data.truncate(data.len() - 5);
    fs::write(&s.input, data).unwrap();

    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.output_format = CaptureFormat::Segmented;
    let err = transcode_file(&cfg, &Config::default()).unwrap_err();
    assert_eq!(err.failed_stage(), Some(Stage::ReadInput));
    assert!(matches!(err.error(), Error::Truncated { index: 3 }));
    // records decoded before the failure were flushed
    let (_, out) = read_capture(fs::read(&s.output).unwrap(), CaptureFormat::Segmented);
    assert_eq!(out.len(), 2);
}

#[test]
fn not_compressed_input() {
    let s = setup("in.pcap.gz", "out.pcap");
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535);
    write_capture(&s.input, CaptureFormat::Classic, &info, &records(1));
    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.decompress_input = true;
    let err = transcode_file(&cfg, &Config::default()).unwrap_err();
    assert_eq!(err.failed_stage(), Some(Stage::OpenInput));
    assert!(matches!(err.error(), Error::Format(_)));
}

#[test]
fn output_is_input() {
    let s = setup("in.pcap", "unused");
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535);
    write_capture(&s.input, CaptureFormat::Classic, &info, &records(2));
    let before = fs::read(&s.input).unwrap();
    let cfg = PipelineConfig::new(&s.input, &s.input);
    let err = transcode_file(&cfg, &Config::default()).unwrap_err();
    assert!(matches!(err, TranscodeError::Config(Error::Config(_))));
    assert_eq!(fs::read(&s.input).unwrap(), before);
}

#[test]
fn snaplen_policy() {
    let s = setup("in.pcap", "out.pcap");
    // records are larger than the declared snaplen
    let info = CaptureInfo::new(Linktype::ETHERNET, 41);
    write_capture(&s.input, CaptureFormat::Classic, &info, &records(3));

    let cfg = PipelineConfig::new(&s.input, &s.output);
    let stats = transcode_file(&cfg, &Config::default()).unwrap();
    assert_eq!(stats.num_packets, 3);
    assert_eq!(stats.oversize, 2);

    let mut config = Config::default();
    config.set("strict_snaplen", true);
    let err = transcode_file(&cfg, &config).unwrap_err();
    assert!(matches!(err.error(), Error::Format(_)));
    assert!(matches!(
        &err,
        TranscodeError::Stage { stage: Stage::WriteOutput, file, .. } if file == &s.output
    ));
    let (_, out) = read_capture(fs::read(&s.output).unwrap(), CaptureFormat::Classic);
    assert_eq!(out.len(), 1);
}

#[test]
fn unlimited_snaplen_is_replaced() {
    let s = setup("in.pcapng", "out.pcap");
    let info = CaptureInfo::new(Linktype::ETHERNET, 0);
    write_capture(&s.input, CaptureFormat::Segmented, &info, &records(2));

    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.input_format = CaptureFormat::Segmented;
    transcode_file(&cfg, &Config::default()).unwrap();
    let (out_info, out) = read_capture(fs::read(&s.output).unwrap(), CaptureFormat::Classic);
    assert_eq!(out_info.snaplen, DEFAULT_SNAPLEN);
    assert_eq!(out.len(), 2);
}

#[test]
fn nanosecond_input() {
    let s = setup("in.pcap", "out.pcapng.gz");
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535).with_precision(TsPrecision::Nano);
    let mut input = records(2);
    input[0].ts = Timestamp::new(1_600_000_000, 123_456_789);
    write_capture(&s.input, CaptureFormat::Classic, &info, &input);

    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.output_format = CaptureFormat::Segmented;
    cfg.compress_output = true;
    transcode_file(&cfg, &Config::default()).unwrap();
    let (out_info, out) = read_capture(gunzip(fs::read(&s.output).unwrap()), CaptureFormat::Segmented);
    assert_eq!(out_info.precision, TsPrecision::Nano);
    assert_eq!(out[0].ts, Timestamp::new(1_600_000_000, 123_456_789));
}

#[test]
fn truncated_compressed_input() {
    let s = setup("in.pcap", "mid.pcap.gz");
    let info = CaptureInfo::new(Linktype::ETHERNET, 65535);
    write_capture(&s.input, CaptureFormat::Classic, &info, &records(200));
    let mut cfg = PipelineConfig::new(&s.input, &s.output);
    cfg.compress_output = true;
    transcode_file(&cfg, &Config::default()).unwrap();
    let mut data = fs::read(&s.output).unwrap();
    data.truncate(data.len() / 2);
    fs::write(&s.output, data).unwrap();

    let back = s.input.with_file_name("back.pcap");
    let mut cfg = PipelineConfig::new(&s.output, &back);
    cfg.decompress_input = true;
    let err = transcode_file(&cfg, &Config::default()).unwrap_err();
    assert_eq!(err.failed_stage(), Some(Stage::ReadInput));
    // the decoder error is reported, not a generic read failure
    match err.error() {
        Error::Io(e) => {
            assert!(matches!(
                e.kind(),
                std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::InvalidInput
                    | std::io::ErrorKind::InvalidData
            ));
            assert!(!e.to_string().contains("underlying stream"));
        }
        e => panic!("unexpected error {:?}", e),
    }
}
