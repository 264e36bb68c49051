use std::fs;
use std::path::{Path, PathBuf};

use egui::{FontData, FontDefinitions, FontFamily};

const FALLBACK_NAME: &str = "cjk_fallback";

/// 安裝 CJK 後備字型；找不到時回傳 `false`。 /
/// Installs a CJK fallback font behind the default families. Returns `false`
/// when no candidate font could be read.
pub fn install_cjk_fallback(ctx: &egui::Context) -> bool {
    let mut definitions = FontDefinitions::default();
    let found = match load_cjk_font() {
        Some((path, data)) => {
            tracing::info!(font = %path.display(), "installed CJK fallback font");
            definitions
                .font_data
                .insert(FALLBACK_NAME.to_owned(), FontData::from_owned(data));
            for family in [FontFamily::Proportional, FontFamily::Monospace] {
                if let Some(fonts) = definitions.families.get_mut(&family) {
                    fonts.push(FALLBACK_NAME.to_owned());
                }
            }
            true
        }
        None => {
            tracing::warn!("no CJK font found; Korean and CJK comments may not render");
            false
        }
    };
    ctx.set_fonts(definitions);
    found
}

fn load_cjk_font() -> Option<(PathBuf, Vec<u8>)> {
    font_candidates()
        .into_iter()
        .filter(|path| path.exists())
        .find_map(|path| fs::read(&path).ok().map(|bytes| (path, bytes)))
}

/// 韓文字型優先，其次才是泛 CJK 字型。 / Korean faces first, then pan-CJK collections.
fn font_candidates() -> Vec<PathBuf> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut candidates: Vec<PathBuf> = vec![
        manifest_dir.join("assets/fonts/NotoSansKR-Regular.otf"),
        PathBuf::from("assets/fonts/NotoSansKR-Regular.otf"),
    ];

    #[cfg(target_os = "windows")]
    {
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\malgun.ttf"));
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\gulim.ttc"));
        candidates.push(PathBuf::from(r"C:\Windows\Fonts\batang.ttc"));
    }

    #[cfg(target_os = "macos")]
    {
        candidates.push(PathBuf::from(
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
        ));
        candidates.push(PathBuf::from(
            "/Library/Fonts/NotoSansKR-Regular.otf",
        ));
    }

    #[cfg(target_os = "linux")]
    {
        candidates.push(PathBuf::from(
            "/usr/share/fonts/opentype/noto/NotoSansCJKkr-Regular.otf",
        ));
        candidates.push(PathBuf::from(
            "/usr/share/fonts/google-noto-cjk/NotoSansCJKkr-Regular.otf",
        ));
        candidates.push(PathBuf::from(
            "/usr/share/fonts/truetype/nanum/NanumGothic.ttf",
        ));
        candidates.push(PathBuf::from(
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        ));
        candidates.push(PathBuf::from(
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        ));
    }

    candidates
}
