use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::{egui, App, Frame};
use egui::{text::LayoutJob, Align, Color32, FontId, Galley, Layout, RichText, TextStyle};
use slnview_core::{Pipeline, PipelineOutcome, PipelineWorker, RunRequest, Session};

use crate::fonts;

const WORKING_LABEL: &str = "Working…";
const IDLE_LABEL: &str = "Open a .sln file to view its first C# project.";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 執行管線的方式：背景執行緒，或在執行緒無法建立時同步執行。 /
/// How runs are executed: on the background worker, or inline when the
/// worker thread could not be started.
enum Runner {
    Background(PipelineWorker),
    Inline(Pipeline),
}

pub struct SlnViewApp {
    session: Session,
    runner: Runner,
    output: String,
    status: String,
    font_warning: Option<String>,
    fonts_installed: bool,
}

impl SlnViewApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let pipeline = Pipeline::default();
        let session = Session::from_settings(pipeline.settings());
        let repaint = cc.egui_ctx.clone();
        let runner = match PipelineWorker::spawn_with_notifier(
            pipeline,
            Box::new(move || repaint.request_repaint()),
        ) {
            Ok(worker) => Runner::Background(worker),
            Err(err) => {
                tracing::error!(error = %err, "falling back to running on the UI thread");
                Runner::Inline(Pipeline::default())
            }
        };
        Self::with_runner(runner, session)
    }

    fn with_runner(runner: Runner, session: Session) -> Self {
        Self {
            session,
            runner,
            output: String::new(),
            status: IDLE_LABEL.to_owned(),
            font_warning: None,
            fonts_installed: false,
        }
    }

    fn ensure_fonts(&mut self, ctx: &egui::Context) {
        if self.fonts_installed {
            return;
        }
        if !fonts::install_cjk_fallback(ctx) {
            self.font_warning =
                Some("No CJK font found; non-Latin comments may show as boxes.".to_owned());
        }
        self.fonts_installed = true;
    }

    fn open_solution(&mut self) {
        let Some(path) = pick_solution_file() else {
            return;
        };
        tracing::info!(solution = %path.display(), "opening solution");
        let request = self.session.begin_open(path);
        self.submit(request);
    }

    fn refresh(&mut self) {
        match self.session.begin_refresh() {
            Some(request) => self.submit(request),
            None => self.apply(PipelineOutcome::NothingOpened),
        }
    }

    fn submit(&mut self, request: RunRequest) {
        match &mut self.runner {
            Runner::Background(worker) => {
                let ticket = worker.submit(request);
                tracing::debug!(ticket, "submitted run");
                self.status = WORKING_LABEL.to_owned();
            }
            Runner::Inline(pipeline) => {
                let outcome = request.execute(pipeline);
                self.apply(outcome);
            }
        }
    }

    fn poll_worker(&mut self, ctx: &egui::Context) {
        let (delivered, busy) = match &mut self.runner {
            Runner::Background(worker) => (worker.poll(), worker.is_busy()),
            Runner::Inline(_) => return,
        };
        if let Some(result) = delivered {
            self.apply(result.outcome);
        } else if busy {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
    }

    fn apply(&mut self, outcome: PipelineOutcome) {
        self.status = status_line(&outcome);
        self.output = outcome.display_text();
    }

    fn is_busy(&self) -> bool {
        matches!(&self.runner, Runner::Background(worker) if worker.is_busy())
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    if ui.button("Open .sln file").clicked() {
                        self.open_solution();
                    }
                    if ui.button("Refresh").clicked() {
                        self.refresh();
                    }
                    ui.separator();

                    let mut include_csproj = self.session.include_csproj();
                    if ui.checkbox(&mut include_csproj, "Include .csproj").changed() {
                        self.session.set_include_csproj(include_csproj);
                    }
                    let mut include_xml = self.session.include_xml();
                    if ui.checkbox(&mut include_xml, "Include .xml").changed() {
                        self.session.set_include_xml(include_xml);
                    }
                });
            });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                    if self.is_busy() {
                        ui.spinner();
                        ui.label(WORKING_LABEL);
                    } else {
                        ui.label(self.status.as_str());
                    }
                    if let Some(path) = self.session.last_solution() {
                        ui.separator();
                        ui.label(RichText::new(path.display().to_string()).weak());
                    }
                });
                if let Some(warning) = &self.font_warning {
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        ui.label(RichText::new(warning).color(Color32::from_rgb(200, 140, 0)));
                    });
                }
            });
    }

    fn show_output(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let font = TextStyle::Monospace.resolve(ui.style());
            let mut layouter = |ui: &egui::Ui, text: &str, _wrap_width: f32| -> Arc<Galley> {
                ui.fonts(|fonts| fonts.layout_job(unwrapped_job(text, font.clone(), ui)))
            };
            egui::ScrollArea::both()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    let mut view = self.output.as_str();
                    ui.add(
                        egui::TextEdit::multiline(&mut view)
                            .font(TextStyle::Monospace)
                            .desired_width(f32::INFINITY)
                            .layouter(&mut layouter),
                    );
                });
        });
    }
}

impl App for SlnViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.ensure_fonts(ctx);
        self.poll_worker(ctx);

        self.show_toolbar(ctx);
        self.show_status_bar(ctx);
        self.show_output(ctx);
    }
}

fn unwrapped_job(text: &str, font: FontId, ui: &egui::Ui) -> LayoutJob {
    LayoutJob::simple(
        text.to_owned(),
        font,
        ui.visuals().text_color(),
        f32::INFINITY,
    )
}

fn pick_solution_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Solution Files", &["sln"])
        .add_filter("All Files", &["*"])
        .pick_file()
}

/// 狀態列文字：專案目錄與檔案數，或失敗原因。 /
/// Status text: the project directory and file count, or why the run stopped.
fn status_line(outcome: &PipelineOutcome) -> String {
    match outcome {
        PipelineOutcome::Rendered {
            project_dir, files, ..
        } => {
            let noun = if files.len() == 1 { "file" } else { "files" };
            format!("{} ({} {noun})", project_dir.display(), files.len())
        }
        PipelineOutcome::NoFiles { project_dir, .. } => {
            format!("{} (0 files)", project_dir.display())
        }
        PipelineOutcome::NoProject { .. }
        | PipelineOutcome::SolutionUnreadable { .. }
        | PipelineOutcome::NothingOpened => outcome.display_text(),
    }
}
