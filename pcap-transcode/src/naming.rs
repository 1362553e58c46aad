//! File name conventions: `.gz` for compressed files, `.aes` for encrypted files, and a
//! trailing `ng` for pcap-ng captures (`trace.pcapng.gz.aes`).

use libpcap_tools::CaptureFormat;

const AES_SUFFIX: &str = ".aes";
const GZ_SUFFIX: &str = ".gz";
const NG_SUFFIX: &str = "ng";

/// What the suffixes of a file name tell about its content
#[derive(Debug, PartialEq, Eq)]
pub struct NameHints<'a> {
    /// Name without the `.aes` and `.gz` suffixes
    pub stem: &'a str,
    pub encrypted: bool,
    pub compressed: bool,
    pub format: CaptureFormat,
}

pub fn parse_name(name: &str) -> NameHints<'_> {
    let (stem, encrypted) = match name.strip_suffix(AES_SUFFIX) {
        Some(stem) => (stem, true),
        None => (name, false),
    };
    let (stem, compressed) = match stem.strip_suffix(GZ_SUFFIX) {
        Some(stem) => (stem, true),
        None => (stem, false),
    };
    let format = if stem.ends_with(NG_SUFFIX) {
        CaptureFormat::Segmented
    } else {
        CaptureFormat::Classic
    };
    NameHints {
        stem,
        encrypted,
        compressed,
        format,
    }
}

/// Build the output name from the input name and the output transforms
pub fn output_name(
    input: &str,
    input_format: CaptureFormat,
    output_format: CaptureFormat,
    compress: bool,
    encrypt: bool,
) -> String {
    let stem = parse_name(input).stem;
    let stem = match input_format {
        CaptureFormat::Segmented => stem.strip_suffix(NG_SUFFIX).unwrap_or(stem),
        CaptureFormat::Classic => stem,
    };
    let mut name = stem.to_string();
    if output_format == CaptureFormat::Segmented {
        name.push_str(NG_SUFFIX);
    }
    if compress {
        name.push_str(GZ_SUFFIX);
    }
    if encrypt {
        name.push_str(AES_SUFFIX);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use libpcap_tools::CaptureFormat::*;

    #[test]
    fn input_hints() {
        let h = parse_name("trace.pcapng.gz.aes");
        assert_eq!(h.stem, "trace.pcapng");
        assert!(h.encrypted && h.compressed);
        assert_eq!(h.format, Segmented);
        let h = parse_name("trace.pcap.gz");
        assert_eq!((h.stem, h.encrypted, h.compressed), ("trace.pcap", false, true));
        assert_eq!(h.format, Classic);
        // suffixes are only recognized in this order
        let h = parse_name("trace.pcap.aes.gz");
        assert_eq!((h.stem, h.encrypted, h.compressed), ("trace.pcap.aes", false, true));
        assert_eq!(parse_name("capture").format, Classic);
    }

    #[test]
    fn synthesized_output() {
        assert_eq!(
            output_name("trace.pcap", Classic, Segmented, true, false),
            "trace.pcapng.gz"
        );
        assert_eq!(
            output_name("trace.pcapng.gz.aes", Segmented, Classic, false, false),
            "trace.pcap"
        );
        assert_eq!(
            output_name("trace.pcap", Classic, Classic, true, true),
            "trace.pcap.gz.aes"
        );
        assert_eq!(
            output_name("trace.pcapng", Segmented, Segmented, false, true),
            "trace.pcapng.aes"
        );
        // same name: rejected later by the pipeline
        assert_eq!(output_name("a.pcap", Classic, Classic, false, false), "a.pcap");
    }
}
