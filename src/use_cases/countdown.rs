// Pre-game countdown driven outside the hub so the hub never sleeps.

use crate::use_cases::types::HubEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct CountdownSettings {
    // Number of `countdown` announcements before `playing`.
    pub ticks: u32,
    // Delay between announcements.
    pub interval: Duration,
}

/// Running countdown for one game cycle.
#[derive(Debug)]
pub struct CountdownHandle {
    generation: u64,
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the timer; a permit is stored so a timer between awaits still sees it.
    pub fn cancel(self) {
        self.shutdown.notify_one();
        debug!(generation = self.generation, "countdown cancelled");
        drop(self.task);
    }
}

/// Spawns the countdown for `generation`. The timer holds a weak sender so it
/// never keeps the hub queue open on its own.
pub fn spawn_countdown(
    hub_tx: mpsc::WeakSender<HubEvent>,
    generation: u64,
    settings: CountdownSettings,
) -> CountdownHandle {
    let shutdown = Arc::new(Notify::new());
    let task = tokio::spawn(run_countdown(
        hub_tx,
        generation,
        settings,
        shutdown.clone(),
    ));
    CountdownHandle {
        generation,
        shutdown,
        task,
    }
}

async fn run_countdown(
    hub_tx: mpsc::WeakSender<HubEvent>,
    generation: u64,
    settings: CountdownSettings,
    shutdown: Arc<Notify>,
) {
    for remaining in (1..=settings.ticks).rev() {
        let tick = HubEvent::CountdownTick {
            generation,
            remaining,
        };
        if !post(&hub_tx, tick).await {
            return;
        }

        tokio::select! {
            _ = shutdown.notified() => return,
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }

    post(&hub_tx, HubEvent::CountdownFinished { generation }).await;
}

// Returns false once the hub is gone.
async fn post(hub_tx: &mpsc::WeakSender<HubEvent>, event: HubEvent) -> bool {
    let Some(tx) = hub_tx.upgrade() else {
        debug!("hub closed; countdown exiting");
        return false;
    };
    tx.send(event).await.is_ok()
}
