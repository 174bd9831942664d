use std::{fs, time::Instant};

use anyhow::Context;
use clap::Parser;
use engine::report::matching_decimals;
use log::info;
use node::Args;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let spec = Args::parse().into_spec().context("invalid run spec")?;
    let digits = spec.digits as usize;
    let reference = spec.reference.clone();
    let rank = spec.rank;

    let started = Instant::now();
    let pi = tokio::select! {
        ret = node::run(spec) => ret.with_context(|| format!("rank {rank} failed"))?,
        _ = signal::ctrl_c() => {
            info!("received ctrl-c");
            return Ok(());
        }
    };

    let Some(pi) = pi else {
        info!("partial sum delivered, exiting");
        return Ok(());
    };

    info!(elapsed_ms = started.elapsed().as_millis() as u64; "pi computed");

    let text = pi.to_decimal(digits);
    println!("{text}");

    if let Some(path) = reference {
        let reference = fs::read_to_string(&path)
            .with_context(|| format!("failed to read reference digits {}", path.display()))?;
        println!("{} correct decimals", matching_decimals(&text, &reference));
    }

    Ok(())
}
