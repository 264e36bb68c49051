use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::encoding::{read_source_file, EncodingDetector, SniffingDetector};

/// 將多個檔案串接成單一可捲動文字。 / Concatenates files into one scrollable text view.
#[derive(Clone)]
pub struct ContentRenderer {
    detector: Arc<dyn EncodingDetector>,
    separator: String,
}

impl Default for ContentRenderer {
    fn default() -> Self {
        Self::new(Arc::new(SniffingDetector), 60)
    }
}

impl ContentRenderer {
    pub fn new(detector: Arc<dyn EncodingDetector>, separator_width: usize) -> Self {
        Self {
            detector,
            separator: "=".repeat(separator_width),
        }
    }

    /// 依序輸出每個檔案的標頭與內容；單一檔案失敗只影響該檔案。 /
    /// Emits a banner plus contents per file; a failing file only affects its own section.
    pub fn render(&self, searched_dir: &Path, paths: &[PathBuf]) -> String {
        if paths.is_empty() {
            return no_files_message(searched_dir);
        }

        let mut output = String::new();
        for path in paths {
            let _ = writeln!(output, "{}", self.separator);
            let _ = writeln!(output, "File: {}", path.display());
            let _ = writeln!(output, "{}", self.separator);
            match read_source_file(path, self.detector.as_ref()) {
                Ok(decoded) => {
                    output.push_str(&decoded.text);
                    if !decoded.text.is_empty() && !decoded.text.ends_with('\n') {
                        output.push('\n');
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to read file");
                    let _ = writeln!(output, "<< file read error: {err} >>");
                }
            }
            output.push('\n');
        }
        output
    }
}

pub(crate) fn no_files_message(searched_dir: &Path) -> String {
    format!("No valid files found in: {}", searched_dir.display())
}
