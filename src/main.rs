mod core;
mod window;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::core::context::Context;
use crate::window::manager::WindowManager;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// X display to manage (defaults to $DISPLAY)
    #[arg(long)]
    display: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    info!("Starting framewm...");

    let ctx = match Context::new(args.display.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to open X display: {}", e);
            return Err(e);
        }
    };
    info!(
        "Connected to display {} (screen {}, root window {:#x})",
        ctx.display_name, ctx.screen_num, ctx.root_window
    );

    let mut wm = WindowManager::new(ctx)?;

    if let Err(e) = wm.take_control() {
        error!("{}", e);
        return Err(e.into());
    }

    wm.reparent_existing()?;
    wm.run()
}
