//! Background sweep tasks.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::usecase::SweepUseCase;

/// Spawn the idle-eviction and retention sweeps. Abort the handles to stop them.
pub fn spawn_sweepers(
    sweep: Arc<SweepUseCase>,
    idle_interval: Duration,
    retention_interval: Duration,
) -> Vec<JoinHandle<()>> {
    let idle = {
        let sweep = sweep.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(idle_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = sweep.evict_idle().await;
                if evicted > 0 {
                    tracing::info!("Idle sweep closed {} connection(s)", evicted);
                }
            }
        })
    };

    let retention = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(retention_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweep.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!("Retention sweep deleted {} room(s)", purged),
                Err(e) => tracing::warn!("Retention sweep failed: {}", e),
            }
        }
    });

    vec![idle, retention]
}
