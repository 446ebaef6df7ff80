// Copyright (c) 2024-2025 The dmk developers

use std::sync::{Arc, Mutex};

use clap::Parser;
use log::{debug, info, LevelFilter};
use tokio::net::TcpListener;

use dmk_sim::*;

/// Virtual secure element device served over TCP
///
/// Speaks the same 64 byte frame protocol as a USB HID device so SDK
/// transports can exercise complete flows without hardware.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// Address to listen on
    #[clap(long, default_value = "127.0.0.1:1237", env = "DMK_SIM_BIND")]
    bind: String,

    /// Device name used in logs
    #[clap(long, default_value = "Nano X 0001")]
    name: String,

    /// Installed application, `name` or `name:version`, repeatable
    /// (defaults to a small catalogue when omitted)
    #[clap(long = "app", value_parser = parse_app)]
    apps: Vec<AppEntry>,

    /// Start with the device locked
    #[clap(long)]
    locked: bool,

    /// Start in factory state, not onboarded
    #[clap(long)]
    not_onboarded: bool,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

fn parse_app(v: &str) -> Result<AppEntry, String> {
    match v.split_once(':') {
        Some((name, version)) => Ok(AppEntry::new(name, version)),
        None => Ok(AppEntry::new(v, "1.0.0")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging
    let mut c = simplelog::ConfigBuilder::new();
    c.add_filter_allow_str("dmk");

    let _ = simplelog::SimpleLogger::init(args.log_level, c.build());

    let mut profile = DeviceProfile {
        name: args.name,
        onboarded: !args.not_onboarded,
        locked: args.locked,
        ..Default::default()
    };
    if !args.apps.is_empty() {
        profile.apps = args.apps;
    }

    info!(
        "starting {} with {} applications",
        profile.name,
        profile.apps.len()
    );

    let device = Arc::new(Mutex::new(VirtualDevice::new(profile)));
    let listener = TcpListener::bind(&args.bind).await?;

    // Serve until killed
    tokio::select!(
        r = serve(listener, device) => r?,
        _ = tokio::signal::ctrl_c() => {
            debug!("Exit!");
        },
    );

    Ok(())
}
