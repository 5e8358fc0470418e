use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clipreel_core::Dispatcher;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    lanes::SessionLanes,
    telegram::{TelegramApi, TelegramError, to_inbound, types::Update},
};

const MIN_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Long-polls the Bot API and hands every update to the dispatcher.
pub struct UpdatePoller {
    api: Arc<TelegramApi>,
    dispatcher: Arc<Dispatcher>,
    timeout_secs: u64,
    offset: i64,
    lanes: SessionLanes,
}

impl UpdatePoller {
    pub fn new(api: Arc<TelegramApi>, dispatcher: Arc<Dispatcher>, timeout_secs: u64) -> Self {
        Self {
            api,
            lanes: SessionLanes::new(Arc::clone(&dispatcher)),
            dispatcher,
            timeout_secs,
            offset: 0,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut backoff = MIN_BACKOFF;
        info!(timeout_secs = self.timeout_secs, "polling for updates");

        loop {
            let api = Arc::clone(&self.api);
            let (offset, timeout_secs) = (self.offset, self.timeout_secs);

            tokio::select! {
                _ = shutdown.recv() => break,
                updates = api.get_updates(offset, timeout_secs) => match updates {
                    Ok(updates) => {
                        backoff = MIN_BACKOFF;
                        self.handle_batch(updates);
                    }
                    Err(e) => {
                        let wait = retry_delay(&e, backoff);
                        warn!(error = %e, wait_secs = wait.as_secs(), "getUpdates failed");
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                        tokio::select! {
                            _ = shutdown.recv() => break,
                            _ = tokio::time::sleep(wait) => {}
                        }
                    }
                },
            }

            self.lanes.reap();
        }

        info!(pending = self.lanes.pending(), "shutting down, waiting for handlers");
        self.lanes.drain().await;
        self.dispatcher.shutdown().await;
        Ok(())
    }

    fn handle_batch(&mut self, updates: Vec<Update>) {
        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);
            let update_id = update.update_id;

            let Some(inbound) = to_inbound(update) else {
                debug!(update_id, "ignoring update");
                continue;
            };

            self.lanes.submit(inbound);
        }
    }
}

fn retry_delay(error: &TelegramError, backoff: Duration) -> Duration {
    error
        .retry_after()
        .map(Duration::from_secs)
        .unwrap_or(backoff)
}
