//! Solution descriptor parsing and project directory resolution.
//! 解析 `.sln` 專案宣告並推導專案資料夾。

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PROJECT_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"Project\("(?P<type>[^"]+)"\)\s*=\s*"(?P<name>[^"]+)"\s*,\s*"(?P<path>[^"]+\.csproj)"\s*,\s*"\{(?P<guid>[^}]+)\}""#,
    )
    .expect("project declaration pattern")
});

/// 從 `.sln` 宣告中擷取的專案參照。 / A project reference extracted from a solution declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionReference {
    pub project_type_id: String,
    pub project_name: String,
    /// 相對於 `.sln` 所在資料夾、以 `.csproj` 結尾的路徑。 / Path relative to the solution directory.
    pub project_relative_path: String,
    /// 不含大括號的專案 GUID。 / Project GUID without the surrounding braces.
    pub project_guid: String,
}

impl SolutionReference {
    fn from_captures(caps: &Captures<'_>) -> Self {
        Self {
            project_type_id: caps["type"].to_string(),
            project_name: caps["name"].to_string(),
            project_relative_path: caps["path"].to_string(),
            project_guid: caps["guid"].to_string(),
        }
    }
}

/// 僅回傳第一個 C# 專案宣告；其餘專案會被忽略。 /
/// Returns the first C# project declaration only; later projects are ignored.
pub fn parse_solution(text: &str) -> Option<SolutionReference> {
    PROJECT_DECLARATION
        .captures(text)
        .map(|caps| SolutionReference::from_captures(&caps))
}

/// 依出現順序列出所有 C# 專案宣告。 / Lists every C# project declaration in document order.
pub fn parse_solution_projects(text: &str) -> Vec<SolutionReference> {
    PROJECT_DECLARATION
        .captures_iter(text)
        .map(|caps| SolutionReference::from_captures(&caps))
        .collect()
}

/// Computes `normalize(dirname(dirname(solution) / relative))` without touching the disk.
///
/// Both `\` and `/` separate components in `relative`, since solution files
/// are written with Windows separators.
pub fn resolve_project_dir(solution_path: &Path, relative: &str) -> PathBuf {
    let mut joined = solution_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    for segment in relative.split(['\\', '/']) {
        if !segment.is_empty() {
            joined.push(segment);
        }
    }
    let project_file = normalize_lexically(&joined);
    project_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(project_file)
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if at_normal {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
