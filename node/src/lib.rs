//! A rank of a distributed π run: computes its partial sum on a thread team
//! and takes part in the reduction at the root.

mod args;
mod error;
pub mod net;
pub mod reducer;
pub mod spec;

use std::sync::Arc;

use engine::{
    Engine,
    float::{BigFloat, PackedSum, pack, unpack},
};
use log::info;

pub use args::Args;
pub use error::{NodeErr, Result};
pub use reducer::{Link, Reducer};
pub use spec::RunSpec;

/// Computes the packed partial sum of `rank` off the async runtime.
///
/// # Arguments
/// * `engine` - The engine of the run.
/// * `rank` - The rank whose partial sum to compute.
pub async fn compute_packet(engine: Arc<Engine>, rank: usize) -> Result<Vec<u8>> {
    let sum = tokio::task::spawn_blocking(move || engine.partial_sum(rank))
        .await
        .map_err(|e| NodeErr::ComputeTask(e.to_string()))??;

    Ok(pack(&sum))
}

/// Runs this rank's part of the run.
///
/// # Arguments
/// * `spec` - The run spec of this rank.
///
/// # Returns
/// π at the root, `None` at every other rank.
pub async fn run(spec: RunSpec) -> Result<Option<BigFloat>> {
    let config = spec.run_config()?;
    let precision = config.precision;

    info!(
        rank = spec.rank,
        world = spec.world,
        threads = spec.threads,
        iterations = config.iterations,
        precision = precision.bits();
        "starting {:?} run with {:?} strategy and {:?} distribution",
        config.formula,
        config.strategy,
        config.distribution
    );

    let run = config.fingerprint();
    let engine = Arc::new(Engine::new(config)?);
    let reducer = Reducer::new(spec.rank, spec.world, run, PackedSum::new(precision))?;

    if !reducer.is_root() {
        let packet = compute_packet(engine, spec.rank).await?;
        let link = net::connect(spec.root).await?;
        reducer.contribute(&packet, link).await?;
        return Ok(None);
    }

    let (local, peers) = if spec.world > 1 {
        let listener = net::listen(spec.root).await?;
        tokio::try_join!(
            compute_packet(engine.clone(), spec.rank),
            net::accept_peers(&listener, spec.world - 1),
        )?
    } else {
        (compute_packet(engine.clone(), spec.rank).await?, Vec::new())
    };

    let total = reducer.gather(local, peers).await?;
    let total = unpack(&total, precision)?;

    Ok(Some(engine.assemble(&total)))
}
