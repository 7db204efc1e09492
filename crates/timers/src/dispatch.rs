use super::*;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CLAIM_BATCH: usize = 32;

/// Receives claimed job payloads from a queue.
/// Handlers parse the blob themselves and must be idempotent: delivery is
/// at-least-once and a late job may describe a session that already moved
/// on.
#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: &str);
}

/// Polling worker for one queue.
/// Runs forever; claim errors are logged and retried on the next tick so
/// a redis hiccup never kills the loop.
pub struct Dispatcher;

impl Dispatcher {
    pub fn spawn(
        timers: Timers,
        queue: &'static str,
        handler: Arc<dyn JobHandler>,
    ) -> tokio::task::JoinHandle<()> {
        log::info!("[dispatch {}] worker started", queue);
        tokio::spawn(async move {
            loop {
                match timers.claim_due(queue, CLAIM_BATCH).await {
                    Ok(jobs) => {
                        for payload in jobs {
                            log::debug!("[dispatch {}] delivering {}", queue, payload);
                            handler.handle(&payload).await;
                        }
                    }
                    Err(e) => log::error!("[dispatch {}] claim failed: {}", queue, e),
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
    }
}
