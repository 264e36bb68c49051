use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use chardetng::EncodingDetector as CharsetGuesser;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use thiserror::Error;

/// 以位元組推測文字編碼的能力。 / Capability that guesses a text encoding from raw bytes.
///
/// Implementations must always answer; an undecidable input falls back to a
/// default instead of failing.
pub trait EncodingDetector: Send + Sync {
    fn detect(&self, bytes: &[u8]) -> &'static Encoding;
}

/// 預設偵測器：BOM、UTF-16 啟發式、UTF-8 驗證，最後交給 chardetng。 /
/// Default detector: BOM, UTF-16 heuristic, strict UTF-8, then `chardetng`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SniffingDetector;

impl EncodingDetector for SniffingDetector {
    fn detect(&self, bytes: &[u8]) -> &'static Encoding {
        if bytes.is_empty() {
            return UTF_8;
        }
        if let Some((encoding, _)) = Encoding::for_bom(bytes) {
            return encoding;
        }
        if looks_like_utf16(bytes, false) {
            return UTF_16LE;
        }
        if looks_like_utf16(bytes, true) {
            return UTF_16BE;
        }
        if std::str::from_utf8(bytes).is_ok() {
            return UTF_8;
        }
        let mut guesser = CharsetGuesser::new();
        guesser.feed(bytes, true);
        guesser.guess(None, true)
    }
}

/// 永遠回傳同一編碼的偵測器，供測試或強制覆寫使用。 / Detector pinned to a single encoding.
#[derive(Debug, Clone, Copy)]
pub struct FixedEncoding(pub &'static Encoding);

impl EncodingDetector for FixedEncoding {
    fn detect(&self, _bytes: &[u8]) -> &'static Encoding {
        self.0
    }
}

/// 解碼後的文字與其來源編碼。 / Decoded text along with the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: &'static Encoding,
    /// 是否有位元組被替換為 U+FFFD。 / Whether malformed sequences were replaced.
    pub had_errors: bool,
}

impl DecodedText {
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// 讀取原始檔時的錯誤。 / Errors raised while reading a source file.
#[derive(Debug, Error)]
pub enum SourceReadError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 以指定編碼解碼；無效序列以替換字元取代，永不失敗。 /
/// Decodes with the given encoding, substituting U+FFFD for invalid sequences.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> DecodedText {
    let (cow, had_errors) = encoding.decode_with_bom_removal(bytes);
    let text = match cow {
        Cow::Borrowed(slice) => slice.to_owned(),
        Cow::Owned(string) => string,
    };
    DecodedText {
        text,
        encoding,
        had_errors,
    }
}

/// 讀取檔案、偵測編碼並解碼。只有 I/O 會失敗。 /
/// Reads a file, detects its encoding and decodes it. Only I/O can fail.
pub fn read_source_file(
    path: &Path,
    detector: &dyn EncodingDetector,
) -> Result<DecodedText, SourceReadError> {
    let io_err = |source| SourceReadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(io_err)?;

    let encoding = detector.detect(&bytes);
    let decoded = decode_text(&bytes, encoding);
    tracing::debug!(
        path = %path.display(),
        encoding = decoded.encoding_name(),
        had_errors = decoded.had_errors,
        "decoded source file"
    );
    Ok(decoded)
}

fn looks_like_utf16(bytes: &[u8], big_endian: bool) -> bool {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return false;
    }

    let sample_len = bytes.len().min(64);
    let mut zero_count = 0;
    let mut total = 0;

    for chunk in bytes[..sample_len].chunks_exact(2) {
        let zero_byte = if big_endian { chunk[0] } else { chunk[1] };
        if zero_byte == 0 {
            zero_count += 1;
        }
        total += 1;
    }

    total > 0 && zero_count * 2 >= total
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{EUC_KR, SHIFT_JIS, WINDOWS_1252};
    use std::fs;

    #[test]
    fn empty_input_defaults_to_utf8() {
        assert_eq!(SniffingDetector.detect(b""), UTF_8);
    }

    #[test]
    fn detects_byte_order_marks() {
        assert_eq!(SniffingDetector.detect(b"\xEF\xBB\xBFusing System;"), UTF_8);
        assert_eq!(SniffingDetector.detect(b"\xFF\xFEu\x00s\x00"), UTF_16LE);
        assert_eq!(SniffingDetector.detect(b"\xFE\xFF\x00u\x00s"), UTF_16BE);
    }

    #[test]
    fn detects_utf16_without_bom() {
        let payload: Vec<u8> = "namespace App;"
            .encode_utf16()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();
        assert_eq!(SniffingDetector.detect(&payload), UTF_16LE);
        let decoded = decode_text(&payload, UTF_16LE);
        assert_eq!(decoded.text, "namespace App;");
    }

    #[test]
    fn plain_ascii_is_utf8() {
        assert_eq!(SniffingDetector.detect(b"class Program {}"), UTF_8);
    }

    #[test]
    fn legacy_korean_is_guessed() {
        // 與 C# 原始碼常見的 CP949 註解。 / Typical CP949 comment in C# sources.
        let source = "// 프로그램 관리자 창을 초기화합니다\n// 설정 파일을 읽어서 목록을 갱신합니다\n";
        let (encoded, _, _) = EUC_KR.encode(source);
        let detected = SniffingDetector.detect(encoded.as_ref());
        assert_eq!(detected, EUC_KR);
        let decoded = decode_text(encoded.as_ref(), detected);
        assert_eq!(decoded.text, source);
        assert!(!decoded.had_errors);
    }

    #[test]
    fn decode_strips_bom() {
        let decoded = decode_text(b"\xEF\xBB\xBFhello", UTF_8);
        assert_eq!(decoded.text, "hello");
        assert_eq!(decoded.encoding_name(), "UTF-8");
    }

    #[test]
    fn decode_replaces_invalid_sequences() {
        let decoded = decode_text(&[b'a', 0x82, 0xFF, b'b'], SHIFT_JIS);
        assert!(decoded.had_errors);
        assert!(decoded.text.contains('\u{FFFD}'));
        assert!(decoded.text.starts_with('a'));
        assert!(decoded.text.ends_with('b'));
    }

    #[test]
    fn fixed_encoding_ignores_input() {
        let detector = FixedEncoding(WINDOWS_1252);
        assert_eq!(detector.detect(b"\xEF\xBB\xBFutf8"), WINDOWS_1252);
    }

    #[test]
    fn read_source_file_uses_detector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Legacy.cs");
        fs::write(&path, [b'c', 0xE9, b'!']).unwrap();

        let decoded = read_source_file(&path, &FixedEncoding(WINDOWS_1252)).unwrap();
        assert_eq!(decoded.text, "cé!");
        assert_eq!(decoded.encoding, WINDOWS_1252);
    }

    #[test]
    fn read_source_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.cs");
        let err = read_source_file(&path, &SniffingDetector).unwrap_err();
        let SourceReadError::Io { path: reported, source } = err;
        assert_eq!(reported, path);
        assert_eq!(source.kind(), io::ErrorKind::NotFound);
    }
}
