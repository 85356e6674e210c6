//! Implementations of the subcommands.
pub mod check;
pub mod provision;
pub mod resolve;
pub mod run;

use anyhow::{Context, Result};
use rlydoe_core::PresetCatalog;
use std::path::Path;

/// Built-in presets, extended with the presets under `conf_dir`.
fn catalog(conf_dir: Option<&Path>) -> Result<PresetCatalog> {
    let catalog = PresetCatalog::default();
    match conf_dir {
        Some(dir) => catalog
            .load_dir(dir)
            .with_context(|| format!("Failed to load presets from {:?}", dir)),
        None => Ok(catalog),
    }
}
