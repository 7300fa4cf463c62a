use rsb_bench::console::Console;
use rsb_bench::error::BenchError;
use rsb_bench::logger::initialize as LoggerInitialize;
use rsb_bench::paths;
use rsb_bench::platform::SimPlatform;

use rsb_core::config::DriverConfig;
use rsb_core::{DRIVER_COMPATIBLE, DRIVER_NAME};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;

use log::info;
use tokio::io::{BufReader, stdin, stdout};

#[tokio::main]
async fn main() -> Result<(), BenchError> {
    let env_file = paths::load_env();
    let bench_paths = paths::resolve()?;

    create_dir_all(&bench_paths.log_dir).map_err(|e| BenchError::Bench {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&bench_paths.log_dir)?;

    info!("{DRIVER_NAME} bench starting ({DRIVER_COMPATIBLE})");
    if let Some(env_file) = env_file {
        info!("Loaded .env from: {}", env_file.display());
    }
    info!("Log directory: {}", bench_paths.log_dir.display());

    let config = DriverConfig::load(&bench_paths.config_dir).map_err(|e| BenchError::Driver {
        message: format!("Failed to load config: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let platform = SimPlatform::new(&config);
    let driver = platform.attach(config).await?;
    let console = Console::new(platform, driver);

    console.run(BufReader::new(stdin()), stdout()).await?;
    console.close().await;

    info!("{DRIVER_NAME} bench stopped");
    Ok(())
}
