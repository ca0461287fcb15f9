//! Desktop operator console for the browser-testing agent engine.

mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::app::{ConsoleApp, PersistedConsoleSettings, SETTINGS_STORAGE_KEY};

#[derive(Parser)]
#[command(name = "operator-console", about = "Operator console for the browser-testing agent")]
struct Args {
    /// Base URL of the agent engine.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    engine_url: String,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(args.engine_url.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Operator Console")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([980.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Operator Console",
        options,
        Box::new(move |cc| {
            let persisted = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedConsoleSettings>(&text).ok())
            });
            Ok(Box::new(ConsoleApp::new(
                cmd_tx,
                ui_rx,
                args.engine_url,
                persisted,
            )))
        }),
    )
}
