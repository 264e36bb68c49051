//! End-to-end run: solution text → project folder → file listing → rendered view.
//! 串接解析、走訪與輸出的完整流程。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::collector::ProjectFileCollector;
use crate::encoding::{EncodingDetector, SniffingDetector};
use crate::render::{no_files_message, ContentRenderer};
use crate::settings::{FilterConfig, ViewerSettings};
use crate::solution::{parse_solution, resolve_project_dir, SolutionReference};

pub const NO_PROJECT_MESSAGE: &str = "No valid project found in the .sln file.";
pub const NOTHING_OPENED_MESSAGE: &str = "No .sln file has been opened yet.";

/// 在走訪前就中止流程的錯誤。 / Errors that stop a run before any traversal happens.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read solution file {path}: {source}")]
    SolutionUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}", NO_PROJECT_MESSAGE)]
    NoProject { path: PathBuf },
}

/// 解析與走訪後、尚未讀取內容的結果。 / Result of parsing and traversal, before any file is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectListing {
    pub reference: SolutionReference,
    pub project_dir: PathBuf,
    pub files: Vec<PathBuf>,
    /// 專案資料夾不存在或無法讀取時的原因。 / Why the folder could not be walked, if it could not.
    pub walk_error: Option<String>,
}

/// 一次執行的最終結果，交給顯示層。 / Final outcome of one run, handed to the display layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Rendered {
        reference: SolutionReference,
        project_dir: PathBuf,
        files: Vec<PathBuf>,
        text: String,
    },
    NoFiles {
        project_dir: PathBuf,
        reason: Option<String>,
    },
    NoProject {
        solution: PathBuf,
    },
    SolutionUnreadable {
        solution: PathBuf,
        message: String,
    },
    NothingOpened,
}

impl PipelineOutcome {
    /// 顯示於檢視區的文字。 / Text shown in the viewer pane.
    pub fn display_text(&self) -> String {
        match self {
            PipelineOutcome::Rendered { text, .. } => text.clone(),
            PipelineOutcome::NoFiles {
                project_dir,
                reason: None,
            } => no_files_message(project_dir),
            PipelineOutcome::NoFiles {
                project_dir,
                reason: Some(reason),
            } => format!("{}\n({reason})", no_files_message(project_dir)),
            PipelineOutcome::NoProject { .. } => NO_PROJECT_MESSAGE.to_string(),
            PipelineOutcome::SolutionUnreadable { solution, message } => {
                format!("Failed to read solution file {}: {message}", solution.display())
            }
            PipelineOutcome::NothingOpened => NOTHING_OPENED_MESSAGE.to_string(),
        }
    }

    /// 解析前即失敗的結果（CLI 以非零代碼結束）。 / Whether the run failed before traversal.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PipelineOutcome::NoProject { .. } | PipelineOutcome::SolutionUnreadable { .. }
        )
    }

    pub fn file_count(&self) -> usize {
        match self {
            PipelineOutcome::Rendered { files, .. } => files.len(),
            _ => 0,
        }
    }

    pub fn project_dir(&self) -> Option<&Path> {
        match self {
            PipelineOutcome::Rendered { project_dir, .. }
            | PipelineOutcome::NoFiles { project_dir, .. } => Some(project_dir),
            _ => None,
        }
    }
}

impl From<PipelineError> for PipelineOutcome {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::SolutionUnreadable { path, source } => {
                PipelineOutcome::SolutionUnreadable {
                    solution: path,
                    message: source.to_string(),
                }
            }
            PipelineError::NoProject { path } => PipelineOutcome::NoProject { solution: path },
        }
    }
}

/// 無狀態的執行器；每次執行都重新讀取篩選並重新走訪。 /
/// Stateless runner; every run reads filters afresh and walks the tree again.
#[derive(Clone)]
pub struct Pipeline {
    settings: ViewerSettings,
    collector: ProjectFileCollector,
    renderer: ContentRenderer,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ViewerSettings::default(), Arc::new(SniffingDetector))
    }
}

impl Pipeline {
    pub fn new(mut settings: ViewerSettings, detector: Arc<dyn EncodingDetector>) -> Self {
        settings.sanitize();
        let collector = ProjectFileCollector::new(settings.excluded_dirs.iter().cloned());
        let renderer = ContentRenderer::new(detector, settings.separator_width);
        Self {
            settings,
            collector,
            renderer,
        }
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    /// 解析 `.sln` 並走訪第一個專案，不讀取檔案內容。 /
    /// Parses the solution and walks its first project without reading file contents.
    pub fn list(
        &self,
        solution: &Path,
        filters: &FilterConfig,
    ) -> Result<ProjectListing, PipelineError> {
        let bytes = fs::read(solution).map_err(|source| PipelineError::SolutionUnreadable {
            path: solution.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes);

        let reference = parse_solution(&text).ok_or_else(|| PipelineError::NoProject {
            path: solution.to_path_buf(),
        })?;
        tracing::info!(
            solution = %solution.display(),
            project = %reference.project_name,
            relative = %reference.project_relative_path,
            "parsed solution"
        );

        let project_dir = resolve_project_dir(solution, &reference.project_relative_path);
        let allowed = self.settings.allowed_extensions(filters);
        let (files, walk_error) = match self.collector.collect(&project_dir, &allowed) {
            Ok(files) => (files, None),
            Err(err) => {
                tracing::warn!(project_dir = %project_dir.display(), error = %err, "project folder unavailable");
                (Vec::new(), Some(err.to_string()))
            }
        };

        Ok(ProjectListing {
            reference,
            project_dir,
            files,
            walk_error,
        })
    }

    /// 執行完整流程；所有錯誤都轉為可顯示的結果。 / Runs the whole flow; every error becomes a displayable outcome.
    pub fn run(&self, solution: &Path, filters: &FilterConfig) -> PipelineOutcome {
        let listing = match self.list(solution, filters) {
            Ok(listing) => listing,
            Err(err) => {
                tracing::info!(solution = %solution.display(), error = %err, "run stopped early");
                return err.into();
            }
        };

        if listing.files.is_empty() {
            return PipelineOutcome::NoFiles {
                project_dir: listing.project_dir,
                reason: listing.walk_error,
            };
        }

        let text = self.renderer.render(&listing.project_dir, &listing.files);
        tracing::info!(
            project_dir = %listing.project_dir.display(),
            files = listing.files.len(),
            "rendered project"
        );
        PipelineOutcome::Rendered {
            reference: listing.reference,
            project_dir: listing.project_dir,
            files: listing.files,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_solution(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("App.sln");
        fs::write(&path, body).unwrap();
        path
    }

    const APP_DECLARATION: &str = "Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"App\", \"App\\App.csproj\", \"{11111111-1111-1111-1111-111111111111}\"\nEndProject\n";

    #[test]
    fn missing_declaration_yields_no_project() {
        let dir = tempfile::tempdir().unwrap();
        let solution = write_solution(dir.path(), "Global\nEndGlobal\n");

        let outcome = Pipeline::default().run(&solution, &FilterConfig::default());
        assert_eq!(
            outcome,
            PipelineOutcome::NoProject {
                solution: solution.clone()
            }
        );
        assert_eq!(outcome.display_text(), NO_PROJECT_MESSAGE);
        assert!(outcome.is_failure());
    }

    #[test]
    fn unreadable_solution_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let solution = dir.path().join("Missing.sln");

        let outcome = Pipeline::default().run(&solution, &FilterConfig::default());
        assert!(matches!(outcome, PipelineOutcome::SolutionUnreadable { .. }));
        assert!(outcome.display_text().starts_with("Failed to read solution file"));
    }

    #[test]
    fn invalid_utf8_in_solution_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = vec![0xFF, 0xFE, 0x80, b'\n'];
        body.extend_from_slice(APP_DECLARATION.as_bytes());
        let solution = dir.path().join("App.sln");
        fs::write(&solution, body).unwrap();
        fs::create_dir_all(dir.path().join("App")).unwrap();
        fs::write(dir.path().join("App/Main.cs"), "class Main {}").unwrap();

        let outcome = Pipeline::default().run(&solution, &FilterConfig::default());
        assert_eq!(outcome.file_count(), 1);
    }

    #[test]
    fn missing_project_folder_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let solution = write_solution(dir.path(), APP_DECLARATION);

        let outcome = Pipeline::default().run(&solution, &FilterConfig::default());
        let expected_dir = dir.path().join("App");
        match &outcome {
            PipelineOutcome::NoFiles {
                project_dir,
                reason,
            } => {
                assert_eq!(project_dir, &expected_dir);
                assert!(reason.is_some());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(outcome
            .display_text()
            .starts_with(&format!("No valid files found in: {}", expected_dir.display())));
        assert!(!outcome.is_failure());
    }

    #[test]
    fn empty_project_folder_yields_no_files_without_reason() {
        let dir = tempfile::tempdir().unwrap();
        let solution = write_solution(dir.path(), APP_DECLARATION);
        fs::create_dir_all(dir.path().join("App/bin")).unwrap();
        fs::write(dir.path().join("App/bin/Skip.cs"), "").unwrap();

        let outcome = Pipeline::default().run(&solution, &FilterConfig::default());
        assert_eq!(
            outcome,
            PipelineOutcome::NoFiles {
                project_dir: dir.path().join("App"),
                reason: None,
            }
        );
    }

    #[test]
    fn list_exposes_reference_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let solution = write_solution(dir.path(), APP_DECLARATION);
        fs::create_dir_all(dir.path().join("App")).unwrap();
        fs::write(dir.path().join("App/Main.cs"), "class Main {}").unwrap();
        fs::write(dir.path().join("App/App.csproj"), "<Project />").unwrap();

        let listing = Pipeline::default()
            .list(&solution, &FilterConfig::default())
            .unwrap();
        assert_eq!(listing.reference.project_name, "App");
        assert_eq!(listing.files, vec![dir.path().join("App/Main.cs")]);
        assert!(listing.walk_error.is_none());
    }
}
