//! Swarm orchestration: N bots, one startup barrier, one tick driver.

use crate::bot::Bot;
use crate::registry::MethodRegistry;
use crate::tick::TickDriver;
use anyhow::Result;
use gatesim_config::SwarmConfig;
use std::sync::Arc;
use tokio::sync::Barrier;
use tracing::{error, info};

/// Run `config.bots` bots to completion.
///
/// Every bot connects and signals a shared barrier before any bot enters
/// its main loop, so load ramp-up is synchronized rather than staggered by
/// individual connect latency. After the barrier releases, bots run fully
/// independently.
pub async fn run_swarm(config: Arc<SwarmConfig>, registry: Arc<MethodRegistry>) -> Result<()> {
    config.validate()?;

    let ticker = Arc::new(TickDriver::new());
    let barrier = Arc::new(Barrier::new(config.bots));
    info!(bots = config.bots, gates = config.gates.len(), "starting swarm");

    let mut handles = Vec::with_capacity(config.bots);
    for id in 0..config.bots {
        let bot = Bot::new(id as u32, config.clone(), registry.clone(), ticker.clone());
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move { bot.run(barrier).await }));
    }

    for (id, handle) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(bot = id, error = %format!("{err:#}"), "bot terminated"),
            Err(err) => error!(bot = id, %err, "bot task panicked"),
        }
    }
    Ok(())
}
