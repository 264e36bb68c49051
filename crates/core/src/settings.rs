use std::collections::BTreeSet;

const DEFAULT_SEPARATOR_WIDTH: usize = 60;

/// Extensions that are always collected.
pub const BASE_EXTENSIONS: &[&str] = &[".cs", ".xaml"];
/// Directory names skipped at every depth (exact, case-sensitive).
pub const EXCLUDED_DIRS: &[&str] = &["bin", "obj", "Properties"];

/// 使用者切換的副檔名篩選。 / Extension toggles controlled by the viewer checkboxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    pub include_csproj: bool,
    pub include_xml: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_csproj: false,
            include_xml: true,
        }
    }
}

/// 以小寫、含前導點的副檔名集合。 / Lowercase extensions including the leading dot.
pub type ExtensionSet = BTreeSet<String>;

/// 檢視器的執行期設定（不寫入磁碟）。 / Runtime viewer settings; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerSettings {
    pub base_extensions: Vec<String>,
    pub excluded_dirs: Vec<String>,
    pub separator_width: usize,
    /// 新視窗的初始勾選狀態。 / Initial checkbox state for a new session.
    pub filters: FilterConfig,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            base_extensions: BASE_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            excluded_dirs: EXCLUDED_DIRS.iter().map(|dir| dir.to_string()).collect(),
            separator_width: DEFAULT_SEPARATOR_WIDTH,
            filters: FilterConfig::default(),
        }
    }
}

impl ViewerSettings {
    pub fn sanitize(&mut self) {
        if self.separator_width == 0 {
            self.separator_width = DEFAULT_SEPARATOR_WIDTH;
        }
        self.separator_width = self.separator_width.clamp(8, 200);
        for ext in &mut self.base_extensions {
            *ext = normalize_extension(ext);
        }
        self.base_extensions.retain(|ext| ext.len() > 1);
        self.excluded_dirs.retain(|dir| !dir.is_empty());
    }

    /// 基本副檔名加上勾選的 `.csproj` / `.xml`。 / Base set unioned with the toggled extras.
    pub fn allowed_extensions(&self, filters: &FilterConfig) -> ExtensionSet {
        let mut allowed: ExtensionSet = self
            .base_extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .collect();
        if filters.include_csproj {
            allowed.insert(".csproj".to_string());
        }
        if filters.include_xml {
            allowed.insert(".xml".to_string());
        }
        allowed
    }
}

fn normalize_extension(ext: &str) -> String {
    let lowered = ext.trim().to_lowercase();
    if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}
