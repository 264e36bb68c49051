use std::ffi::OsStr;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::settings::{ExtensionSet, EXCLUDED_DIRS};

/// 專案資料夾無法走訪時的錯誤；呼叫端視為「找不到檔案」。 /
/// Raised when the project folder cannot be walked; callers treat it as "no files".
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("project folder does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("project path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("cannot access project folder {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read project folder {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Recursive collector that skips build-output directories.
#[derive(Debug, Clone)]
pub struct ProjectFileCollector {
    excluded_dirs: Vec<String>,
}

impl Default for ProjectFileCollector {
    fn default() -> Self {
        Self::new(EXCLUDED_DIRS.iter().map(|dir| dir.to_string()))
    }
}

impl ProjectFileCollector {
    pub fn new(excluded_dirs: impl IntoIterator<Item = String>) -> Self {
        Self {
            excluded_dirs: excluded_dirs.into_iter().collect(),
        }
    }

    /// 收集副檔名符合 `allowed` 的檔案，依每層檔名排序。 /
    /// Collects files whose lowercase extension is in `allowed`, sorted by name per directory.
    pub fn collect(&self, root: &Path, allowed: &ExtensionSet) -> Result<Vec<PathBuf>, CollectError> {
        match fs::metadata(root) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(CollectError::NotADirectory(root.to_path_buf())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CollectError::MissingRoot(root.to_path_buf()))
            }
            Err(source) => {
                return Err(CollectError::Unreadable {
                    path: root.to_path_buf(),
                    source,
                })
            }
        }

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_excluded(entry));

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    return Err(CollectError::Walk {
                        path: root.to_path_buf(),
                        source: err,
                    })
                }
                Err(err) => {
                    tracing::warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !is_file_like(&entry) {
                continue;
            }
            if extension_key(entry.path()).is_some_and(|ext| allowed.contains(&ext)) {
                files.push(entry.into_path());
            }
        }

        tracing::debug!(root = %root.display(), count = files.len(), "collected project files");
        Ok(files)
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.excluded_dirs.iter().any(|dir| *dir == name)
    }
}

/// 使用預設排除清單收集檔案。 / Collects with the default excluded directory names.
pub fn collect_project_files(
    root: &Path,
    allowed: &ExtensionSet,
) -> Result<Vec<PathBuf>, CollectError> {
    ProjectFileCollector::default().collect(root, allowed)
}

fn is_file_like(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

fn extension_key(path: &Path) -> Option<String> {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{FilterConfig, ViewerSettings};

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "// source").unwrap();
        path
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|path| {
                path.strip_prefix(root)
                    .unwrap()
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }

    fn allowed(filters: FilterConfig) -> ExtensionSet {
        ViewerSettings::default().allowed_extensions(&filters)
    }

    #[test]
    fn skips_excluded_directories_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Main.cs");
        touch(root, "bin/Debug/Generated.cs");
        touch(root, "obj/AssemblyInfo.cs");
        touch(root, "Properties/Settings.cs");
        touch(root, "Views/Controls/bin/Leak.cs");
        touch(root, "Views/Controls/obj/Leak.cs");
        touch(root, "Views/Properties/Leak.cs");
        touch(root, "Views/Controls/Button.xaml");

        let files = collect_project_files(root, &allowed(FilterConfig::default())).unwrap();
        assert_eq!(names(root, &files), vec!["Main.cs", "Views/Controls/Button.xaml"]);
    }

    #[test]
    fn exclusion_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Bin/Kept.cs");
        touch(root, "properties/Kept.cs");

        let files = collect_project_files(root, &allowed(FilterConfig::default())).unwrap();
        assert_eq!(names(root, &files), vec!["Bin/Kept.cs", "properties/Kept.cs"]);
    }

    #[test]
    fn root_named_like_excluded_dir_is_still_walked() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("obj");
        touch(&root, "Inside.cs");

        let files = collect_project_files(&root, &allowed(FilterConfig::default())).unwrap();
        assert_eq!(names(&root, &files), vec!["Inside.cs"]);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Upper.CS");
        touch(root, "Layout.XAML");
        touch(root, "README.md");
        touch(root, "noext");

        let files = collect_project_files(root, &allowed(FilterConfig::default())).unwrap();
        assert_eq!(names(root, &files), vec!["Layout.XAML", "Upper.CS"]);
    }

    #[test]
    fn csproj_toggle_only_adds_project_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "App.csproj");
        touch(root, "App.cs");
        touch(root, "App.config.xml");
        touch(root, "Nested/Other.csproj");

        let off = FilterConfig {
            include_csproj: false,
            include_xml: true,
        };
        let on = FilterConfig {
            include_csproj: true,
            ..off
        };
        let without = collect_project_files(root, &allowed(off)).unwrap();
        let with = collect_project_files(root, &allowed(on)).unwrap();

        let added: Vec<_> = with.iter().filter(|path| !without.contains(path)).collect();
        assert!(without.iter().all(|path| with.contains(path)));
        assert_eq!(added.len(), 2);
        assert!(added
            .iter()
            .all(|path| path.extension().unwrap() == "csproj"));
    }

    #[test]
    fn missing_root_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Missing");
        let err = collect_project_files(&root, &allowed(FilterConfig::default())).unwrap_err();
        assert!(matches!(err, CollectError::MissingRoot(ref path) if path == &root));
        assert!(err.to_string().contains("Missing"));
    }

    #[test]
    fn file_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(dir.path(), "App.cs");
        let err = collect_project_files(&file, &allowed(FilterConfig::default())).unwrap_err();
        assert!(matches!(err, CollectError::NotADirectory(_)));
    }

    #[test]
    fn custom_exclusions_are_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "Main.cs");
        touch(root, "Generated/Auto.cs");
        touch(root, "bin/Kept.cs");

        let collector = ProjectFileCollector::new(["Generated".to_string()]);
        let files = collector
            .collect(root, &allowed(FilterConfig::default()))
            .unwrap();
        assert_eq!(names(root, &files), vec!["Main.cs", "bin/Kept.cs"]);
    }
}
