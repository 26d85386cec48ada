// Text decoding for CSV and JSON inputs

use std::fmt;

use encoding_rs::{GB18030, GBK, UTF_8};

/// Encodings tried when a text file does not declare one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvEncoding {
    /// UTF-8, with an optional byte-order mark
    Utf8Sig,
    Gbk,
    Gb18030,
    /// ISO-8859-1; decodes any byte sequence
    Latin1,
}

/// Fixed fallback precedence for seller exports.
pub const DEFAULT_ORDER: [CsvEncoding; 4] = [
    CsvEncoding::Utf8Sig,
    CsvEncoding::Gbk,
    CsvEncoding::Gb18030,
    CsvEncoding::Latin1,
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

impl CsvEncoding {
    pub fn label(self) -> &'static str {
        match self {
            CsvEncoding::Utf8Sig => "utf-8-sig",
            CsvEncoding::Gbk => "gbk",
            CsvEncoding::Gb18030 => "gb18030",
            CsvEncoding::Latin1 => "latin-1",
        }
    }

    /// Decode the whole buffer strictly. Returns `None` on the first
    /// malformed sequence; no replacement characters are ever produced.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            CsvEncoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                UTF_8
                    .decode_without_bom_handling_and_without_replacement(body)
                    .map(|s| s.into_owned())
            }
            CsvEncoding::Gbk => GBK
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
            CsvEncoding::Gb18030 => GB18030
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
            CsvEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

impl fmt::Display for CsvEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decode with the first encoding in `order` that accepts the bytes.
/// On failure, returns the encodings that were attempted.
pub fn decode_with_fallback(
    bytes: &[u8],
    order: &[CsvEncoding],
) -> Result<(String, CsvEncoding), Vec<CsvEncoding>> {
    for &encoding in order {
        if let Some(text) = encoding.decode(bytes) {
            return Ok((text, encoding));
        }
        log::debug!("input is not valid {}", encoding);
    }
    Err(order.to_vec())
}
