use std::path::{Path, PathBuf};

use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::settings::{FilterConfig, ViewerSettings};

/// 視窗範圍的狀態：最後開啟的 `.sln` 與目前的篩選。 /
/// Window-scoped state: the last opened solution plus the current filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    last_solution: Option<PathBuf>,
    filters: FilterConfig,
}

/// 一次執行所需的全部輸入，提交時即固定。 / Everything a run needs, frozen at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub solution: PathBuf,
    pub filters: FilterConfig,
}

impl RunRequest {
    pub fn execute(&self, pipeline: &Pipeline) -> PipelineOutcome {
        pipeline.run(&self.solution, &self.filters)
    }
}

impl Session {
    pub fn new(filters: FilterConfig) -> Self {
        Self {
            last_solution: None,
            filters,
        }
    }

    /// 以設定中的預設勾選建立新工作階段。 / Starts a session from the configured default toggles.
    pub fn from_settings(settings: &ViewerSettings) -> Self {
        Self::new(settings.filters)
    }

    pub fn last_solution(&self) -> Option<&Path> {
        self.last_solution.as_deref()
    }

    pub fn filters(&self) -> FilterConfig {
        self.filters
    }

    pub fn include_csproj(&self) -> bool {
        self.filters.include_csproj
    }

    pub fn include_xml(&self) -> bool {
        self.filters.include_xml
    }

    /// 只改變狀態，下次開啟或重新整理時生效。 / Pure state change; applies on the next open or refresh.
    pub fn set_include_csproj(&mut self, include: bool) {
        self.filters.include_csproj = include;
    }

    pub fn set_include_xml(&mut self, include: bool) {
        self.filters.include_xml = include;
    }

    /// 記住路徑（即使稍後失敗）並回傳本次執行的請求。 /
    /// Remembers the path, even if the run later fails, and returns the request for it.
    pub fn begin_open(&mut self, solution: impl Into<PathBuf>) -> RunRequest {
        let solution = solution.into();
        self.last_solution = Some(solution.clone());
        RunRequest {
            solution,
            filters: self.filters,
        }
    }

    /// 以記住的路徑與目前篩選建立請求；尚未開啟時回傳 `None`。 /
    /// Builds a request from the remembered path and the current filters.
    pub fn begin_refresh(&self) -> Option<RunRequest> {
        self.last_solution.as_ref().map(|solution| RunRequest {
            solution: solution.clone(),
            filters: self.filters,
        })
    }

    pub fn open(&mut self, pipeline: &Pipeline, solution: impl Into<PathBuf>) -> PipelineOutcome {
        self.begin_open(solution).execute(pipeline)
    }

    pub fn refresh(&self, pipeline: &Pipeline) -> PipelineOutcome {
        match self.begin_refresh() {
            Some(request) => request.execute(pipeline),
            None => PipelineOutcome::NothingOpened,
        }
    }
}
