pub mod charts;
pub mod input;
pub mod notify;
pub mod power;
pub mod scale;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod settings;
mod utils;

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{error, info};
use tokio::io::AsyncReadExt;

use charts::XmlChartFile;
use input::KeyDecoder;
use notify::StdoutNotifier;
use power::ShellPowerActions;
use scheduler::TokioScheduler;
use session::KioskSession;
use settings::SettingsStore;

const SETTINGS_ENV: &str = "VISUTEST_CONFIG";
const DEFAULT_SETTINGS_FILE: &str = "config.json";
const KEY_READ_CHUNK: usize = 64;

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Running VisuTest v{}", env!("CARGO_PKG_VERSION"));

    // All session state lives on this one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build event loop runtime")?;

    runtime.block_on(event_loop())
}

async fn event_loop() -> Result<()> {
    let settings_path = std::env::var(SETTINGS_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = SettingsStore::new(settings_path)?;
    let config = settings.kiosk_config()?;

    info!("Loading charts from file: '{}'", config.charts_xml.display());
    let charts = XmlChartFile::new(config.charts_xml.clone());
    let (scheduler, mut expiries) = TokioScheduler::channel();

    let mut session = KioskSession::new(
        settings,
        &charts,
        scheduler,
        Box::new(ShellPowerActions::new(&config.scripts_dir)),
        Box::new(StdoutNotifier),
    )?;
    session.start();

    // Raw chunks so each key is handled as soon as it is typed.
    let mut stdin = tokio::io::stdin();
    let mut decoder = KeyDecoder::default();
    let mut chunk = [0u8; KEY_READ_CHUNK];
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            read = stdin.read(&mut chunk) => {
                let len = match read {
                    Ok(0) => {
                        info!("Key input closed, shutting down");
                        break;
                    }
                    Ok(len) => len,
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        error!("Key input failed, shutting down: {err}");
                        break;
                    }
                };
                for key in decoder.feed(&chunk[..len]) {
                    session.handle_key(key);
                }
            }
            Some(expiry) = expiries.recv() => {
                if session.scheduler_mut().accept(&expiry) {
                    session.handle_timer(expiry.token);
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
