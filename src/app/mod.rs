use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Context, Vec2};
use tracing::{error, info};

use crate::blueprint::{Blueprint, load_blueprint};
use crate::config::SimulationConfig;

mod graph;
mod physics;
mod render;
mod ui;

use graph::GraphCanvas;

/// Startup settings resolved from the command line.
#[derive(Clone, Debug, Default)]
pub struct LaunchOptions {
    pub blueprint: Option<PathBuf>,
    pub filter: Option<String>,
    pub physics: SimulationConfig,
    pub seed: Option<u64>,
}

type LoadResult = Result<Blueprint, String>;

pub struct BlueprintApp {
    options: LaunchOptions,
    path_input: String,
    state: AppState,
    reload_rx: Option<Receiver<LoadResult>>,
}

enum AppState {
    Idle,
    Loading { rx: Receiver<LoadResult> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    blueprint: Blueprint,
    filter: Option<String>,
    tech_values: Vec<String>,
    search: String,
    selected: Option<String>,
    hovered: Option<usize>,
    pan: Vec2,
    zoom: f32,
    live_physics: bool,
    physics: SimulationConfig,
    canvas: GraphCanvas,
    search_match_cache: Option<SearchMatchCache>,
}

struct SearchMatchCache {
    query: String,
    generation: u64,
    matches: Arc<HashSet<usize>>,
}

impl BlueprintApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        let path_input = options
            .blueprint
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        let state = match &options.blueprint {
            Some(path) => Self::start_load(path.clone()),
            None => AppState::Idle,
        };

        Self {
            options,
            path_input,
            state,
            reload_rx: None,
        }
    }

    fn spawn_load(path: PathBuf) -> Receiver<LoadResult> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_blueprint(&path).map_err(|error| format!("{error:#}"));
            if let Err(message) = &result {
                error!(path = %path.display(), %message, "blueprint load failed");
            }
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(path: PathBuf) -> AppState {
        info!(path = %path.display(), "loading blueprint");
        AppState::Loading {
            rx: Self::spawn_load(path),
        }
    }

    fn ready(options: &LaunchOptions, blueprint: Blueprint) -> AppState {
        info!(
            nodes = blueprint.nodes.len(),
            edges = blueprint.edges.len(),
            "blueprint ready"
        );
        AppState::Ready(Box::new(ViewModel::new(
            blueprint,
            options.filter.clone(),
            options.physics,
            options.seed,
        )))
    }

    fn open_requested_path(&mut self) -> Option<AppState> {
        let trimmed = self.path_input.trim();
        if trimmed.is_empty() {
            return None;
        }
        let path = PathBuf::from(trimmed);
        self.options.blueprint = Some(path.clone());
        Some(Self::start_load(path))
    }

    fn draw_waiting(&mut self, ctx: &Context) -> Option<AppState> {
        let mut transition = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("Waiting for a blueprint");
                ui.add_space(6.0);
                ui.label("Open a generated architecture blueprint (JSON) to explore it.");
                ui.add_space(10.0);
                ui.horizontal(|ui| {
                    ui.text_edit_singleline(&mut self.path_input);
                    if ui.button("Open").clicked() {
                        transition = self.open_requested_path();
                    }
                });
            });
        });
        transition
    }
}

impl eframe::App for BlueprintApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;
        let mut waiting = false;

        match &mut self.state {
            AppState::Idle => waiting = true,
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(blueprint)) => transition = Some(Self::ready(&self.options, blueprint)),
                    Ok(Err(message)) => transition = Some(AppState::Error(message)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        transition =
                            Some(AppState::Error("Background load worker disconnected".to_owned()));
                    }
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading blueprint...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(message) => {
                let message = message.clone();
                let mut retry = false;
                let mut back = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load blueprint");
                    ui.add_space(6.0);
                    ui.label(message.as_str());
                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        retry = ui.button("Retry").clicked();
                        back = ui.button("Open another file").clicked();
                    });
                });

                if retry {
                    transition = match self.options.blueprint.clone() {
                        Some(path) => Some(Self::start_load(path)),
                        None => Some(AppState::Idle),
                    };
                } else if back {
                    transition = Some(AppState::Idle);
                }
            }
            AppState::Ready(model) => {
                let mut reload_requested = false;
                let is_reloading = self.reload_rx.is_some();
                let source = self
                    .options
                    .blueprint
                    .as_ref()
                    .map(|path| path.display().to_string());
                model.show(ctx, source.as_deref(), &mut reload_requested, is_reloading);

                if reload_requested
                    && self.reload_rx.is_none()
                    && let Some(path) = self.options.blueprint.clone()
                {
                    info!(path = %path.display(), "reloading blueprint");
                    self.reload_rx = Some(Self::spawn_load(path));
                }

                if let Some(rx) = self.reload_rx.take() {
                    match rx.try_recv() {
                        Ok(Ok(blueprint)) => model.replace_blueprint(blueprint),
                        Ok(Err(message)) => transition = Some(AppState::Error(message)),
                        Err(TryRecvError::Empty) => {
                            self.reload_rx = Some(rx);
                            ctx.request_repaint();
                        }
                        Err(TryRecvError::Disconnected) => {
                            transition =
                                Some(AppState::Error("Background load worker disconnected".to_owned()));
                        }
                    }
                }
            }
        }

        if waiting {
            transition = self.draw_waiting(ctx);
        }

        if let Some(next_state) = transition {
            self.reload_rx = None;
            self.state = next_state;
        }
    }
}
