//! Interactive configurator with a round marble top on a trestle base.
//!
//! Writes the settings to `target/configurator-demo.json` and watches that
//! file: edit it while the window is open and the table updates live.

use std::path::PathBuf;

use tablecraft::catalog::{BaseStyle, ShapeKind, SurfaceSelector};
use tablecraft::config::{ConfiguratorParams, Settings};
use tablecraft::geometry::EdgeProfile;

fn main() {
    env_logger::init();

    let mut settings = Settings::default();
    settings.viewer.title = "tablecraft - configurator demo".into();
    settings.assets.asset_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets");
    settings.table = ConfiguratorParams {
        material: SurfaceSelector::named("calacatta"),
        shape: ShapeKind::Round,
        radius: 60.0,
        edge_profile: EdgeProfile::PencilRound,
        base_style: Some(BaseStyle::Trestle),
        ..ConfiguratorParams::default()
    };

    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join("configurator-demo.json");
    let watched = match write_settings(&path, &settings) {
        Ok(()) => {
            log::info!("Edit {} to change the table", path.display());
            Some(path)
        }
        Err(e) => {
            log::warn!("Could not write {}: {e}; hot reload disabled", path.display());
            None
        }
    };

    if let Err(e) = tablecraft::viewer::run(settings, watched) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn write_settings(path: &std::path::Path, settings: &Settings) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = settings.to_json().map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}
