//! Compose tables without a window and print what would be drawn.
//!
//! ```text
//! cargo run --example headless_compose -- [SETTINGS.json]
//! ```
//!
//! Without an argument the shop defaults are used. Loads run on worker
//! threads exactly as in the viewer; the example waits for them to settle.

use std::path::Path;
use std::time::Duration;

use tablecraft::capability::RenderingCapabilityProfile;
use tablecraft::catalog::ShapeKind;
use tablecraft::config::Settings;
use tablecraft::configurator::Configurator;
use tablecraft::geometry::EdgeProfile;
use tablecraft::scene::NodeRole;

fn main() {
    env_logger::init();

    let settings = match std::env::args().nth(1) {
        Some(path) => match Settings::load(Path::new(&path)) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
        None => Settings::default(),
    };

    let capability = RenderingCapabilityProfile::resolve(4096, &settings.capability);
    let mut configurator = match Configurator::with_standard_io(&settings, capability, std::time::Instant::now()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    report(&mut configurator);

    // The same table as a bullnose round top, to show an in-place update.
    let mut round = configurator.params().clone();
    round.shape = ShapeKind::Round;
    round.radius = 60.0;
    round.edge_profile = EdgeProfile::Bullnose;
    configurator.apply(round, std::time::Instant::now());
    report(&mut configurator);
}

fn report(configurator: &mut Configurator) {
    let positioned = configurator.settle(Duration::from_secs(10));

    println!("── Table ──────────────────────────────");
    for (label, value) in configurator.summary() {
        println!("{label:>10}: {value}");
    }
    println!("{:>10}: {:?}", "Texture", configurator.textures().phase());
    println!("{:>10}: {:?}", "Placement", configurator.composer().placement());
    if !positioned {
        println!("(top was not positioned within the timeout)");
    }

    let scene = configurator.scene();
    for role in [NodeRole::Base, NodeRole::Top] {
        for node in scene.nodes_with_role(role) {
            let b = node.bounds();
            println!(
                "{role:?}: {} triangles, y {:.3}..{:.3} m, {:.2} × {:.2} m",
                node.mesh.triangle_count(),
                b.min.y,
                b.max.y,
                b.size().x,
                b.size().z,
            );
        }
    }
    println!();
}
