//! Application entry point for the gravity-well particle viewer.
//!
//! This binary sets up logging and eframe/egui and delegates all
//! interactive logic and rendering to [`Viewer`] from the `viewer` module.
//!
//! An optional first argument names a JSON file holding a (partial)
//! [`SimConfig`]; missing fields take their default values.

mod viewer;

use sim_core::SimConfig;
use std::{error::Error, fs, path::Path};
use viewer::Viewer;

/// Reads a [`SimConfig`] from a JSON file.
fn load_config(path: &Path) -> Result<SimConfig, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let cfg: SimConfig = serde_json::from_str(&text)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Starts the native eframe application.
///
/// ### Returns
/// - `Ok(())` if the application runs to completion without errors.
/// - `Err` if eframe fails to create the native window or event loop.
fn main() -> eframe::Result<()> {
    env_logger::init();

    let cfg = match std::env::args_os().nth(1) {
        Some(path) => load_config(Path::new(&path)).unwrap_or_else(|e| {
            log::error!(
                "could not load config {}: {e}; using defaults",
                Path::new(&path).display()
            );
            SimConfig::default()
        }),
        None => SimConfig::default(),
    };
    log::info!(
        "starting with {} particles max, {} consumer wells",
        cfg.max_particles,
        cfg.consumer_count
    );

    let options = eframe::NativeOptions::default();

    eframe::run_native(
        "Gravity Wells",
        options,
        Box::new(|_cc| {
            // Construct the root app state for the viewer.
            Ok(Box::new(Viewer::new(cfg)?))
        }),
    )
}
