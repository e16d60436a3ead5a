//! TriveniIO - sensor acquisition and telemetry broadcast daemon

use triveni_io::app::App;
use triveni_io::config::AppConfig;
use triveni_io::error::Result;
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "/etc/triveni.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `triveni-io <path>` (positional)
/// - `triveni-io --config <path>` (flag-based)
/// - `triveni-io -c <path>` (short flag)
///
/// Defaults to `/etc/triveni.toml` if not specified.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    None
}

fn load_config() -> Result<AppConfig> {
    match parse_config_path() {
        Some(path) => {
            log::info!("Using config: {}", path);
            AppConfig::from_file(&path)
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            log::info!("Using config: {}", DEFAULT_CONFIG_PATH);
            AppConfig::from_file(DEFAULT_CONFIG_PATH)
        }
        None => {
            log::warn!(
                "No config at {}, using built-in defaults",
                DEFAULT_CONFIG_PATH
            );
            Ok(AppConfig::default())
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("TriveniIO v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    App::new(config).run()
}
