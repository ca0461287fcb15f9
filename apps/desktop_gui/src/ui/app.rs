use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::domain::{
    device_preset, ConnectionState, ProcessingStatus, Role, DEVICE_PRESETS,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;
use crate::controller::recorder::CaseDraft;
use crate::controller::reducer::Session;

pub const SETTINGS_STORAGE_KEY: &str = "operator_console.settings";

const ENV_NAME_CHOICES: [&str; 4] = ["Production", "Staging", "Development", "QA"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedConsoleSettings {
    pub show_thoughts: bool,
    pub text_scale: f32,
}

impl Default for PersistedConsoleSettings {
    fn default() -> Self {
        Self {
            show_thoughts: true,
            text_scale: 1.0,
        }
    }
}

impl PersistedConsoleSettings {
    fn sanitized(mut self) -> Self {
        self.text_scale = self.text_scale.clamp(0.8, 1.4);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleView {
    Chat,
    Library,
    History,
}

pub struct ConsoleApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    session: Session,
    view: ConsoleView,
    composer: String,
    status: String,
    settings: PersistedConsoleSettings,
    settings_open: bool,
    base_url_input: String,
    env_name_input: String,
    case_dialog: Option<CaseDraft>,
    reports: Vec<shared::protocol::ReportSummary>,
    report_base_url: String,
    snapshot_texture: Option<egui::TextureHandle>,
    snapshot_texture_revision: u64,
}

impl ConsoleApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        engine_url: String,
        persisted: Option<PersistedConsoleSettings>,
    ) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            session: Session::default(),
            view: ConsoleView::Chat,
            composer: String::new(),
            status: String::new(),
            settings: persisted.unwrap_or_default().sanitized(),
            settings_open: false,
            base_url_input: String::new(),
            env_name_input: ENV_NAME_CHOICES[0].to_string(),
            case_dialog: None,
            reports: Vec::new(),
            report_base_url: engine_url,
            snapshot_texture: None,
            snapshot_texture_revision: 0,
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    fn drain_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::ConnectionChanged(state) => {
                    self.session.apply_connection(state);
                    if state == ConnectionState::Connected {
                        // Refresh the library so replay targets are current.
                        self.dispatch(BackendCommand::LoadCases);
                    }
                }
                UiEvent::Engine(engine_event) => {
                    let saved_case = matches!(
                        engine_event,
                        shared::protocol::EngineEvent::SaveCaseSuccess { .. }
                    );
                    if let Some(notice) = self.session.apply_engine_event(engine_event) {
                        self.status = notice;
                    }
                    if saved_case {
                        // Pull the library so the new case shows up
                        // without a manual refresh.
                        self.dispatch(BackendCommand::LoadCases);
                    }
                }
                UiEvent::SubmissionFailed { reason } => {
                    self.session.submission_failed(&reason);
                    self.status = format!("Request failed: {reason}");
                }
                UiEvent::ReportsLoaded(reports) => {
                    self.reports = reports;
                    self.status = format!("Loaded {} report(s)", self.reports.len());
                }
                UiEvent::Info(text) => {
                    self.status = text;
                }
                UiEvent::Error(err) => {
                    self.status = err.status_line();
                }
            }
        }
    }

    fn submit_composer(&mut self) {
        let text = self.composer.trim().to_string();
        match self.session.submit_user_request(&text) {
            Ok(()) => {
                self.composer.clear();
                self.dispatch(BackendCommand::SubmitRequest { text });
            }
            Err(rejection) => {
                self.status =
                    UiError::from_message(UiErrorContext::SubmitRequest, rejection.to_string())
                        .status_line();
            }
        }
    }

    fn ensure_snapshot_texture(&mut self, ctx: &egui::Context) {
        if self.session.snapshot_revision == self.snapshot_texture_revision {
            return;
        }
        self.snapshot_texture_revision = self.session.snapshot_revision;
        let Some(frame) = self.session.latest_snapshot.as_ref() else {
            self.snapshot_texture = None;
            return;
        };
        let bytes = match STANDARD.decode(frame.image_b64.as_bytes()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "dropping undecodable snapshot frame");
                return;
            }
        };
        let decoded = match image::load_from_memory(&bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(error = %err, "dropping unreadable snapshot image");
                return;
            }
        };
        let rgba = decoded.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
        self.snapshot_texture = Some(ctx.load_texture(
            "browser_snapshot",
            color_image,
            egui::TextureOptions::LINEAR,
        ));
    }

    fn top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("console_top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let previous_view = self.view;
                ui.selectable_value(&mut self.view, ConsoleView::Chat, "Session");
                ui.selectable_value(&mut self.view, ConsoleView::Library, "Case Library");
                ui.selectable_value(&mut self.view, ConsoleView::History, "Reports");
                if self.view != previous_view {
                    match self.view {
                        ConsoleView::Library => self.dispatch(BackendCommand::LoadCases),
                        ConsoleView::History => self.dispatch(BackendCommand::FetchReports),
                        ConsoleView::Chat => {}
                    }
                }
                ui.separator();

                self.device_preset_picker(ui);

                if ui.button("Environment").clicked() {
                    self.settings_open = !self.settings_open;
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match self.session.connection_state {
                        ConnectionState::Connected => {
                            ui.colored_label(egui::Color32::from_rgb(0x43, 0xb5, 0x81), "connected");
                        }
                        ConnectionState::Connecting => {
                            ui.colored_label(egui::Color32::YELLOW, "connecting");
                            ui.spinner();
                        }
                        ConnectionState::Disconnected => {
                            ui.colored_label(egui::Color32::LIGHT_RED, "disconnected");
                            if ui.button("Reconnect").clicked() {
                                self.dispatch(BackendCommand::Reconnect);
                            }
                        }
                    }
                });
            });
        });
    }

    fn device_preset_picker(&mut self, ui: &mut egui::Ui) {
        let shown = self
            .session
            .pending_preset
            .clone()
            .unwrap_or_else(|| self.session.device_preset.clone());
        let label = device_preset(&shown)
            .map(|preset| preset.label.to_string())
            .unwrap_or_else(|| shown.clone());
        egui::ComboBox::from_id_salt("device_preset_picker")
            .selected_text(label)
            .show_ui(ui, |ui| {
                for preset in DEVICE_PRESETS {
                    let text = format!(
                        "{} ({}x{})",
                        preset.label, preset.width, preset.height
                    );
                    if ui.selectable_label(shown == preset.id, text).clicked()
                        && shown != preset.id
                    {
                        self.session.pending_preset = Some(preset.id.to_string());
                        self.dispatch(BackendCommand::SelectDevicePreset {
                            preset: preset.id.to_string(),
                        });
                    }
                }
            });
        if self.session.pending_preset.is_some() {
            ui.label("(switching...)");
        }
    }

    fn status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("console_status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.session.processing == ProcessingStatus::Running {
                    ui.spinner();
                    ui.label("Agent working");
                    ui.separator();
                }
                ui.label(self.status.as_str());
            });
        });
    }

    fn chat_view(&mut self, ctx: &egui::Context) {
        self.ensure_snapshot_texture(ctx);

        egui::SidePanel::right("snapshot_panel")
            .default_width(520.0)
            .show(ctx, |ui| {
                ui.heading("Browser");
                match self.snapshot_texture.clone() {
                    Some(texture) => {
                        let response = ui.add(
                            egui::Image::new(&texture)
                                .max_size(ui.available_size())
                                .sense(egui::Sense::click()),
                        );
                        if response.clicked() {
                            if let Some(pos) = response.interact_pointer_pos() {
                                let (x, y) = normalized_pointer(pos, response.rect);
                                self.dispatch(BackendCommand::Interact { x, y });
                            }
                        }
                    }
                    None => {
                        ui.weak("No snapshot yet. Frames appear while the agent works.");
                    }
                }
            });

        egui::TopBottomPanel::bottom("composer_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let editor = ui.add_enabled(
                    self.session.can_submit(),
                    egui::TextEdit::singleline(&mut self.composer)
                        .desired_width(ui.available_width() - 140.0)
                        .hint_text("Describe the next task for the agent"),
                );
                let submit_clicked = ui
                    .add_enabled(self.session.can_submit(), egui::Button::new("Send"))
                    .clicked();
                let enter_pressed = editor.lost_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if self.session.can_submit() && (submit_clicked || enter_pressed) {
                    self.submit_composer();
                }
                if self.session.processing == ProcessingStatus::Running
                    && ui.button("Stop").clicked()
                {
                    self.dispatch(BackendCommand::StopTask);
                }
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    let show_thoughts = self.settings.show_thoughts;
                    for entry in self.session.log.entries() {
                        match entry.role {
                            Role::User => {
                                ui.horizontal_wrapped(|ui| {
                                    ui.strong("You:");
                                    ui.label(&entry.content);
                                });
                            }
                            Role::System => {
                                ui.weak(&entry.content);
                            }
                            Role::Agent => {
                                if show_thoughts {
                                    for step in &entry.thoughts {
                                        ui.horizontal_wrapped(|ui| {
                                            ui.weak(format!("[{:?}]", step.phase).to_lowercase());
                                            ui.label(&step.detail);
                                        });
                                    }
                                }
                                if entry.in_progress {
                                    ui.horizontal(|ui| {
                                        ui.spinner();
                                        ui.weak("thinking...");
                                    });
                                } else if !entry.content.is_empty() {
                                    ui.horizontal_wrapped(|ui| {
                                        ui.strong("Agent:");
                                        ui.label(&entry.content);
                                    });
                                }
                            }
                        }
                        ui.add_space(6.0);
                    }
                });
        });
    }

    fn library_view(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Case Library");
                if ui.button("Refresh").clicked() {
                    self.dispatch(BackendCommand::LoadCases);
                }
                if ui.button("Save current session").clicked() {
                    match CaseDraft::from_conversation(&self.session.log) {
                        Ok(draft) => self.case_dialog = Some(draft),
                        Err(rejection) => self.status = rejection.to_string(),
                    }
                }
            });
            ui.separator();

            let cases = self.session.cases.clone();
            if cases.is_empty() {
                ui.weak("No saved cases. Run a session and save it as a case.");
            }
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for case in &cases {
                        ui.horizontal(|ui| {
                            ui.strong(&case.name);
                            ui.weak(format!(
                                "{} step(s), saved {}",
                                case.prompts.len(),
                                case.created_at.format("%Y-%m-%d %H:%M")
                            ));
                            if ui
                                .add_enabled(
                                    self.session.can_submit(),
                                    egui::Button::new("Replay"),
                                )
                                .clicked()
                            {
                                match self.session.begin_replay() {
                                    Ok(()) => {
                                        self.dispatch(BackendCommand::ReplayCase {
                                            case_id: case.id,
                                        });
                                        self.view = ConsoleView::Chat;
                                    }
                                    Err(rejection) => {
                                        self.status = rejection.to_string();
                                    }
                                }
                            }
                        });
                        if !case.description.is_empty() {
                            ui.label(&case.description);
                        }
                        ui.indent(("case_prompts", case.id), |ui| {
                            for (index, prompt) in case.prompts.iter().enumerate() {
                                ui.weak(format!("{}. {prompt}", index + 1));
                            }
                        });
                        ui.separator();
                    }
                });
        });

        self.case_dialog_window(ctx);
    }

    fn case_dialog_window(&mut self, ctx: &egui::Context) {
        let Some(mut draft) = self.case_dialog.take() else {
            return;
        };
        let mut keep_open = true;
        egui::Window::new("Save case")
            .collapsible(false)
            .resizable(false)
            .open(&mut keep_open)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Name");
                    ui.text_edit_singleline(&mut draft.name);
                });
                ui.horizontal(|ui| {
                    ui.label("Description");
                    ui.text_edit_singleline(&mut draft.description);
                });
                ui.weak(format!("{} prompt(s) captured", draft.prompts.len()));
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        match draft.validate() {
                            Ok(()) => {
                                self.dispatch(BackendCommand::SaveCase {
                                    name: draft.name.trim().to_string(),
                                    description: draft.description.trim().to_string(),
                                    prompts: draft.prompts.clone(),
                                });
                                return;
                            }
                            Err(rejection) => {
                                self.status = rejection.to_string();
                            }
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        return;
                    }
                    self.case_dialog = Some(draft.clone());
                });
            });
        if !keep_open {
            self.case_dialog = None;
        }
    }

    fn history_view(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Run Reports");
                if ui.button("Refresh").clicked() {
                    self.dispatch(BackendCommand::FetchReports);
                }
            });
            ui.separator();

            if self.reports.is_empty() {
                ui.weak("No reports fetched. Refresh to load the report history.");
            }
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for report in &self.reports {
                        ui.horizontal(|ui| {
                            ui.label(&report.date);
                            let url = format!(
                                "{}/{}",
                                self.report_base_url.trim_end_matches('/'),
                                report.path.trim_start_matches('/')
                            );
                            ui.hyperlink_to(&report.id, url);
                        });
                    }
                });
        });
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }
        let mut open = self.settings_open;
        egui::Window::new("Environment")
            .collapsible(false)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("BASE_URL");
                    ui.text_edit_singleline(&mut self.base_url_input);
                    if ui.button("Apply").clicked() && !self.base_url_input.trim().is_empty() {
                        self.dispatch(BackendCommand::SetEnvOverride {
                            key: "BASE_URL".to_string(),
                            value: self.base_url_input.trim().to_string(),
                        });
                    }
                });
                ui.horizontal(|ui| {
                    ui.label("ENV_NAME");
                    egui::ComboBox::from_id_salt("env_name_choice")
                        .selected_text(self.env_name_input.clone())
                        .show_ui(ui, |ui| {
                            for choice in ENV_NAME_CHOICES {
                                ui.selectable_value(
                                    &mut self.env_name_input,
                                    choice.to_string(),
                                    choice,
                                );
                            }
                        });
                    if ui.button("Apply").clicked() {
                        self.dispatch(BackendCommand::SetEnvOverride {
                            key: "ENV_NAME".to_string(),
                            value: self.env_name_input.clone(),
                        });
                    }
                });

                if !self.session.env_overrides.is_empty() {
                    ui.separator();
                    ui.weak("Active overrides:");
                    for (key, value) in &self.session.env_overrides {
                        ui.label(format!("{key} = {value}"));
                    }
                }

                ui.separator();
                ui.checkbox(&mut self.settings.show_thoughts, "Show agent reasoning");
                ui.add(
                    egui::Slider::new(&mut self.settings.text_scale, 0.8..=1.4)
                        .text("Text scale"),
                );
            });
        self.settings_open = open;
    }
}

impl eframe::App for ConsoleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_ui_events();
        ctx.set_zoom_factor(self.settings.text_scale);

        self.top_bar(ctx);
        self.status_bar(ctx);
        match self.view {
            ConsoleView::Chat => self.chat_view(ctx),
            ConsoleView::Library => self.library_view(ctx),
            ConsoleView::History => self.history_view(ctx),
        }
        self.settings_window(ctx);

        // Engine events arrive off the UI thread; poll for them.
        ctx.request_repaint_after(Duration::from_millis(100));
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        if let Ok(text) = serde_json::to_string(&self.settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, text);
        }
    }
}

/// Maps a pointer position inside the snapshot widget to normalized
/// page coordinates in [0, 1].
fn normalized_pointer(pos: egui::Pos2, rect: egui::Rect) -> (f64, f64) {
    let width = f64::from(rect.width()).max(1.0);
    let height = f64::from(rect.height()).max(1.0);
    let x = (f64::from(pos.x) - f64::from(rect.min.x)) / width;
    let y = (f64::from(pos.y) - f64::from(rect.min.y)) / height;
    (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
}
