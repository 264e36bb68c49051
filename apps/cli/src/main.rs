use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use slnview_core::{
    parse_solution_projects, FilterConfig, Pipeline, PipelineOutcome, NO_PROJECT_MESSAGE,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "slnview-cli",
    about = "Print the sources of the first C# project in a Visual Studio solution",
    author,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 串接輸出第一個專案的原始檔。 / Print the concatenated sources of the first project.
    Render(ViewArgs),
    /// 列出會被收集的檔案。 / List the files that would be collected.
    Files(ViewArgs),
    /// 列出方案中的所有 C# 專案。 / List every C# project declared in the solution.
    Projects(ProjectsArgs),
}

#[derive(Args)]
struct ViewArgs {
    /// `.sln` 檔案路徑。 / Path to the `.sln` file.
    #[arg(value_name = "SLN")]
    solution: PathBuf,

    /// 一併收集 `.csproj` 檔。 / Also collect `.csproj` files.
    #[arg(long)]
    include_csproj: bool,

    /// 不收集 `.xml` 檔（預設會收集）。 / Skip `.xml` files, which are collected by default.
    #[arg(long)]
    exclude_xml: bool,
}

impl ViewArgs {
    fn filters(&self) -> FilterConfig {
        FilterConfig {
            include_csproj: self.include_csproj,
            include_xml: !self.exclude_xml,
        }
    }
}

#[derive(Args)]
struct ProjectsArgs {
    /// `.sln` 檔案路徑。 / Path to the `.sln` file.
    #[arg(value_name = "SLN")]
    solution: PathBuf,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli { command } = Cli::parse();
    let pipeline = Pipeline::default();
    match command {
        Commands::Render(args) => execute_render(&pipeline, args),
        Commands::Files(args) => execute_files(&pipeline, args),
        Commands::Projects(args) => execute_projects(args),
    }
}

fn execute_render(pipeline: &Pipeline, args: ViewArgs) -> Result<()> {
    let solution = resolve_input_path(&args.solution)?;
    let outcome = pipeline.run(&solution, &args.filters());
    if outcome.is_failure() {
        bail!("{}", outcome.display_text());
    }
    match outcome {
        PipelineOutcome::Rendered { text, .. } => print!("{text}"),
        other => println!("{}", other.display_text()),
    }
    Ok(())
}

fn execute_files(pipeline: &Pipeline, args: ViewArgs) -> Result<()> {
    let solution = resolve_input_path(&args.solution)?;
    let listing = pipeline.list(&solution, &args.filters())?;
    if listing.files.is_empty() {
        eprintln!("warning: no valid files found in {}", listing.project_dir.display());
        if let Some(reason) = &listing.walk_error {
            eprintln!("warning: {reason}");
        }
        return Ok(());
    }
    for file in &listing.files {
        println!("{}", file.display());
    }
    Ok(())
}

fn execute_projects(args: ProjectsArgs) -> Result<()> {
    let solution = resolve_input_path(&args.solution)?;
    let bytes =
        fs::read(&solution).with_context(|| format!("failed to read {}", solution.display()))?;
    let projects = parse_solution_projects(&String::from_utf8_lossy(&bytes));
    if projects.is_empty() {
        bail!(NO_PROJECT_MESSAGE);
    }
    for project in projects {
        println!(
            "{}\t{}\t{{{}}}",
            project.project_name, project.project_relative_path, project.project_guid
        );
    }
    Ok(())
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
