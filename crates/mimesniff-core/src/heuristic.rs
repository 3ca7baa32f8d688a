//! Text/binary fallback for content that no rule recognises.

/// Generic type for content that looks like text.
pub const TEXT_PLAIN: &str = "text/plain";

/// Generic type for everything else, including empty content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Control bytes that still occur in ordinary text files:
/// BEL, BS, TAB, LF, VT, FF, CR and ESC.
const TEXT_CONTROLS: &[u8] = b"\x07\x08\t\n\x0b\x0c\r\x1b";

fn is_disallowed(byte: u8) -> bool {
    (byte < 0x20 && !TEXT_CONTROLS.contains(&byte)) || byte == 0x7f
}

/// True when `sample` contains no disallowed control bytes.
///
/// Bytes above 0x7F are allowed so that UTF-8 and 8-bit legacy encodings
/// classify as text.
pub fn looks_like_text(sample: &[u8]) -> bool {
    !sample.iter().copied().any(is_disallowed)
}

/// Classify content that matched no magic rule by inspecting its first
/// `probe_len` bytes.
pub fn classify_unmatched(data: &[u8], probe_len: usize) -> &'static str {
    if data.is_empty() {
        return OCTET_STREAM;
    }
    let sample = &data[..data.len().min(probe_len)];
    if looks_like_text(sample) {
        TEXT_PLAIN
    } else {
        OCTET_STREAM
    }
}
