//! The application shell: sidebar variant navigation, the per-variant form,
//! Submit/Reset, and the history side panel. Exports run on worker threads
//! and report back over a channel so typing never blocks on a capture.

use eframe::egui::{self, RichText};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::assets::{AssetGate, RenderAssets};
use crate::config::{AppConfig, StationVariant};
use crate::error::AppError;
use crate::export::{ExportOutcome, ExportPipeline};
use crate::fields::{self, SuggestionSource};
use crate::form::{today_at_station, FormEvent, FormState};
use crate::history::{HistoryStore, JsonFileStorage};
use crate::pdf::LetterPdfAssembler;
use crate::raster::GlyphRasterizer;

const LABEL_WIDTH: f32 = 140.0;
const INPUT_WIDTH: f32 = 320.0;

enum WorkerMsg {
    Export(Result<ExportOutcome, AppError>),
}

pub struct PermitApp {
    cfg: AppConfig,
    out_dir: PathBuf,
    active: StationVariant,
    menu_expanded: bool,
    forms: HashMap<StationVariant, FormState>,
    history: Arc<Mutex<HistoryStore>>,
    gate: AssetGate,
    assets: Option<Arc<RenderAssets>>,
    status: Option<String>,
    exports_in_flight: usize,
    tx: Sender<WorkerMsg>,
    rx: Receiver<WorkerMsg>,
}

impl PermitApp {
    pub fn new(cfg: AppConfig, out_dir: PathBuf, gate: AssetGate) -> Self {
        let storage_path = JsonFileStorage::default_path()
            .unwrap_or_else(|| PathBuf::from("permit-pdf-history.json"));
        let history = HistoryStore::load(Box::new(JsonFileStorage::new(storage_path)));

        // Each variant keeps its own form, date pre-filled.
        let mut forms = HashMap::new();
        for variant in StationVariant::all() {
            forms.insert(*variant, FormState::seeded(today_at_station()));
        }

        let (tx, rx) = mpsc::channel();
        PermitApp {
            cfg,
            out_dir,
            active: StationVariant::Gemini,
            menu_expanded: true,
            forms,
            history: Arc::new(Mutex::new(history)),
            gate,
            assets: None,
            status: None,
            exports_in_flight: 0,
            tx,
            rx,
        }
    }

    fn suggestions_for(&self, source: SuggestionSource) -> &[String] {
        match source {
            SuggestionSource::None => &[],
            SuggestionSource::Origins => &self.cfg.suggestions.origins,
            SuggestionSource::Truckers => &self.cfg.suggestions.truckers,
            SuggestionSource::Consignors => &self.cfg.suggestions.consignors,
        }
    }

    /// Submits the active form to the export pipeline on a worker thread.
    fn submit_export(&mut self) {
        // Nothing to print for the active selection: silent no-op.
        let Some(form) = self.forms.get(&self.active) else {
            return;
        };
        let Some(assets) = self.assets.clone() else {
            self.status =
                Some("Rendering assets are still loading, please retry in a moment".to_string());
            return;
        };

        let form = form.clone();
        let station = self.cfg.station(self.active).clone();
        let history = Arc::clone(&self.history);
        let out_dir = self.out_dir.clone();
        let tx = self.tx.clone();
        self.exports_in_flight += 1;

        std::thread::spawn(move || {
            let pipeline = ExportPipeline::default();
            let rasterizer = GlyphRasterizer::from_assets(&assets);
            let result = match history.lock() {
                Ok(mut history) => pipeline.run(
                    Some(&rasterizer),
                    &LetterPdfAssembler,
                    &form,
                    &station,
                    &mut history,
                    &out_dir,
                ),
                Err(_) => Err(AppError::Storage("history store is unavailable".to_string())),
            };
            let _ = tx.send(WorkerMsg::Export(result));
        });
    }

    fn drain_worker_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            let WorkerMsg::Export(result) = msg;
            self.exports_in_flight = self.exports_in_flight.saturating_sub(1);
            self.status = Some(match result {
                Ok(ExportOutcome::Saved { filename, .. }) => format!("Saved {}", filename),
                Ok(ExportOutcome::FallbackPrinted { reason, .. }) => format!(
                    "PDF capture failed ({}); opened a printable page instead",
                    reason
                ),
                Ok(ExportOutcome::NotReady) => {
                    "Rendering assets are still loading, please retry in a moment".to_string()
                }
                Err(e) => format!("Export failed: {}", e),
            });
        }
    }

    fn sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("nav").exact_width(200.0).show(ctx, |ui| {
            ui.add_space(12.0);
            let arrow = if self.menu_expanded { "▼" } else { "▶" };
            let header = ui.add(
                egui::Label::new(RichText::new(format!("PTT TYPE {}", arrow)).heading())
                    .sense(egui::Sense::click()),
            );
            if header.clicked() {
                self.menu_expanded = !self.menu_expanded;
            }
            ui.add_space(8.0);
            if self.menu_expanded {
                for variant in StationVariant::all() {
                    let selected = self.active == *variant;
                    if ui.selectable_label(selected, variant.label()).clicked() {
                        // Immediate switch; the other form keeps its state.
                        self.active = *variant;
                    }
                    ui.add_space(4.0);
                }
            }
        });
    }

    fn history_panel(&mut self, ctx: &egui::Context) {
        let records = match self.history.lock() {
            Ok(history) => history.records().to_vec(),
            Err(_) => Vec::new(),
        };

        let mut redownload = None;
        egui::SidePanel::right("history").default_width(230.0).show(ctx, |ui| {
            ui.add_space(12.0);
            ui.heading("Recent PDFs");
            ui.add_space(8.0);
            if records.is_empty() {
                ui.label("No documents yet");
                return;
            }
            egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                for record in &records {
                    if ui.link(record.filename.as_str()).clicked() {
                        redownload = Some(record.clone());
                    }
                    let stamp = record.created_at.get(..16).unwrap_or(&record.created_at);
                    ui.label(
                        RichText::new(format!("{} · {}", record.variant, stamp.replace('T', " ")))
                            .small()
                            .weak(),
                    );
                    ui.add_space(6.0);
                }
            });
        });

        if let Some(record) = redownload {
            let result = match self.history.lock() {
                Ok(history) => history.redownload(&record, &self.out_dir),
                Err(_) => Err(AppError::Storage("history store is unavailable".to_string())),
            };
            self.status = Some(match result {
                Ok(path) => format!("Saved {}", path.display()),
                Err(e) => format!("Could not redownload: {}", e),
            });
        }
    }

    fn field_row(
        ui: &mut egui::Ui,
        name: &str,
        value: &str,
        suggestions: &[String],
        events: &mut Vec<FormEvent>,
    ) {
        ui.horizontal(|ui| {
            ui.add_sized([LABEL_WIDTH, 20.0], egui::Label::new(format!("{}:", name)));
            let mut buf = value.to_string();
            let response = ui.add(egui::TextEdit::singleline(&mut buf).desired_width(INPUT_WIDTH));
            if response.changed() {
                events.push(FormEvent::Field { name: name.to_string(), value: buf });
            }
            if !suggestions.is_empty() {
                ui.menu_button("▾", |ui| {
                    for option in suggestions {
                        if ui.button(option.as_str()).clicked() {
                            events.push(FormEvent::Field {
                                name: name.to_string(),
                                value: option.clone(),
                            });
                            ui.close_menu();
                        }
                    }
                });
            }
        });
        ui.add_space(6.0);
    }

    fn form_panel(&mut self, ctx: &egui::Context) {
        let mut events: Vec<FormEvent> = Vec::new();
        let mut submit = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            ui.heading(format!("{} form", self.active.label()));
            ui.add_space(16.0);

            let Some(form) = self.forms.get(&self.active) else {
                ui.label("In developing...");
                return;
            };

            // Plain fields above the pallet groups, in registry order.
            for spec in &fields::REGISTRY[..4] {
                let options = self.suggestions_for(spec.suggestions);
                Self::field_row(ui, spec.name, form.get(spec.name), options, &mut events);
            }

            // Pallet/carton pairs side by side, mirroring the printed rows.
            for n in 1..=fields::BUP_GROUPS {
                let bup = fields::bup_info(n);
                let cartons = fields::cartons_count(n);
                ui.horizontal(|ui| {
                    ui.add_sized([LABEL_WIDTH, 20.0], egui::Label::new(format!("{}:", bup)));
                    let mut buf = form.get(&bup).to_string();
                    if ui
                        .add(egui::TextEdit::singleline(&mut buf).desired_width(140.0))
                        .changed()
                    {
                        events.push(FormEvent::Field { name: bup.clone(), value: buf });
                    }
                    ui.add_sized([110.0, 20.0], egui::Label::new(format!("{}:", cartons)));
                    let mut buf = form.get(&cartons).to_string();
                    if ui
                        .add(egui::TextEdit::singleline(&mut buf).desired_width(80.0))
                        .changed()
                    {
                        events.push(FormEvent::Field { name: cartons.clone(), value: buf });
                    }
                });
                ui.add_space(6.0);
            }

            for spec in &fields::REGISTRY[7..] {
                if spec.name.starts_with("Cartons Count") {
                    continue;
                }
                let options = self.suggestions_for(spec.suggestions);
                Self::field_row(ui, spec.name, form.get(spec.name), options, &mut events);
            }

            ui.add_space(16.0);
            if ui
                .add_sized([INPUT_WIDTH + LABEL_WIDTH, 32.0], egui::Button::new("Submit"))
                .clicked()
            {
                submit = true;
            }
            ui.add_space(6.0);
            if ui
                .add_sized([INPUT_WIDTH + LABEL_WIDTH, 32.0], egui::Button::new("RESET"))
                .clicked()
            {
                events.push(FormEvent::Reset);
            }

            ui.add_space(16.0);
            if let Some(status) = &self.status {
                ui.label(status.as_str());
            } else if self.assets.is_none() {
                ui.label(RichText::new("Loading rendering assets...").weak());
            }
        });

        if !events.is_empty() {
            if let Some(form) = self.forms.get_mut(&self.active) {
                for event in events {
                    form.apply(event);
                }
            }
        }
        if submit {
            self.submit_export();
        }
    }
}

impl eframe::App for PermitApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.assets.is_none() {
            self.assets = self.gate.poll();
        }
        self.drain_worker_messages();
        // Keep polling while background work is pending.
        if self.assets.is_none() || self.exports_in_flight > 0 {
            ctx.request_repaint_after(Duration::from_millis(150));
        }

        self.sidebar(ctx);
        self.history_panel(ctx);
        self.form_panel(ctx);
    }
}
