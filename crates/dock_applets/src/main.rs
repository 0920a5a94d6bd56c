use std::sync::Arc;

use anyhow::{Context, Result};
use applet_runtime::{application_lifecycle, AppBase, AppletRuntime};
use dockbus::DockConnection;

mod applets;
mod opts;

/// Crates whose logs are shown without `RUST_LOG`.
const LOG_TARGETS: &[&str] = &["dock_applets", "applet_runtime", "dockbus", "uptoshare", "videodl"];

fn main() {
    let opts = opts::Opt::from_env();

    let log_level_filter = if std::env::var("DOCK_APPLET_DEBUG").is_ok() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    if std::env::var("RUST_LOG").is_ok() {
        pretty_env_logger::init_timed();
    } else {
        let mut builder = pretty_env_logger::formatted_timed_builder();
        for &target in LOG_TARGETS {
            builder.filter(Some(target), log::LevelFilter::Debug);
        }
        builder.init();
        // The `Debug` key of the applet config raises it again at init.
        log::set_max_level(log_level_filter);
    }

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")
        .and_then(|rt| rt.block_on(run(opts)));

    if let Err(err) = result {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

async fn run(opts: opts::Opt) -> Result<()> {
    let paths = opts.paths().context("Failed to read the applet arguments")?;
    let new_applet = applets::find(&paths.name)?;
    log::debug!("Starting {}", paths);

    let con = DockConnection::connect(&paths.bus_path).await.context("Failed to connect to the session bus")?;
    let signals = con.signals().await.context("Failed to listen to the dock signals")?;

    let base = AppBase::new(paths, Arc::new(con.clone()));
    let applet = new_applet(base, &con).context("Failed to create the applet")?;
    let result = AppletRuntime::new(applet).run(signals).await;

    if let Err(err) = application_lifecycle::send_exit() {
        // nothing may be listening anymore
        log::debug!("{:?}", err);
    }
    result
}
