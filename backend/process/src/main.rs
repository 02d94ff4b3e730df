use anyhow::Context;
use bank::{Service, store::FileStore, utils::now_millis};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use process::{Args, run};

fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let store = FileStore::open(&args.data_dir)
        .with_context(|| format!("Cannot open {}", args.data_dir.display()))?;
    let mut service = Service::open(store)?;

    for line in run(&mut service, args.command, now_millis())? {
        println!("{line}");
    }

    Ok(())
}
