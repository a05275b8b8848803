use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Command, arg};
use tablecraft::config::Settings;

fn cli() -> Command {
    Command::new("tablecraft")
        .about("Interactive stone table configurator.")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(arg!(-c --config <PATH> "Settings file (JSON); watched for changes"))
        .arg(arg!(-m --"memory-constrained" "Cap textures and drop mipmaps for low-memory devices"))
        .arg(arg!(--"dev-proxy" <PREFIX> "Fetch catalog textures through this URL prefix"))
}

fn main() -> ExitCode {
    env_logger::init();

    let matches = cli().get_matches();
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);

    let mut settings = match &config_path {
        Some(path) => match Settings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    if matches.get_flag("memory-constrained") {
        settings.capability.memory_constrained = true;
    }
    if let Some(prefix) = matches.get_one::<String>("dev-proxy") {
        settings.assets.dev_proxy_prefix = Some(prefix.clone());
    }

    match tablecraft::viewer::run(settings, config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
