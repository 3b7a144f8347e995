#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Context;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use dispatch_board::config::Config;
use dispatch_board::ui::DispatchApp;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dispatch_board=info")))
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("using default config: {:#}", e);
        Config::default()
    });
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1400.0, 900.0])
        .with_min_inner_size([900.0, 600.0])
        .with_title("Dispatch Board");

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Dispatch Board",
        options,
        Box::new(|cc| Ok(Box::new(DispatchApp::new(cc, config, runtime)?))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
}
