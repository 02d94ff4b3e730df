use std::sync::Arc;

use bank::utils::now_millis;
use tokio::{
    task::{JoinHandle, spawn_blocking},
    time::{MissedTickBehavior, interval},
};
use tracing::{error, info};

use super::state::State;

/// Moves contests through their schedule on every tick until aborted.
pub fn spawn_sweeper(state: Arc<State>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(state.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Sweeping contest statuses every {:?}", state.config.sweep_interval);

        loop {
            ticker.tick().await;
            run_sweep(state.clone(), now_millis()).await;
        }
    })
}

/// The sweep writes through the file store, so it runs on the blocking pool.
/// A failed or panicked sweep is logged and the next tick tries again.
pub async fn run_sweep(state: Arc<State>, now: i64) -> usize {
    let sweep = spawn_blocking(move || {
        let mut service = state.service.blocking_lock();
        service.sweep_statuses(now)
    });

    match sweep.await {
        Ok(Ok(changed)) => changed,
        Ok(Err(e)) => {
            error!("Status sweep failed: {e}");
            0
        }
        Err(e) => {
            error!("Status sweep aborted: {e}");
            0
        }
    }
}
