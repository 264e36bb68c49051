//! Core of the solution viewer: locate the first C# project of a `.sln`,
//! collect its sources and concatenate them into one text view.
//! 解析 `.sln`、收集第一個專案的原始檔並串接成單一文字檢視。

pub mod collector;
pub mod encoding;
pub mod pipeline;
pub mod render;
pub mod session;
pub mod settings;
pub mod solution;
pub mod worker;

pub use collector::{collect_project_files, CollectError, ProjectFileCollector};
pub use encoding::{
    decode_text, read_source_file, DecodedText, EncodingDetector, FixedEncoding,
    SniffingDetector, SourceReadError,
};
pub use pipeline::{
    Pipeline, PipelineError, PipelineOutcome, ProjectListing, NOTHING_OPENED_MESSAGE,
    NO_PROJECT_MESSAGE,
};
pub use render::ContentRenderer;
pub use session::{RunRequest, Session};
pub use settings::{ExtensionSet, FilterConfig, ViewerSettings, BASE_EXTENSIONS, EXCLUDED_DIRS};
pub use solution::{parse_solution, parse_solution_projects, resolve_project_dir, SolutionReference};
pub use worker::{PipelineWorker, RunResult, WorkerError};
