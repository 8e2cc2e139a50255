//! Periodic re-read of the values that do not arrive as notifications

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::transport::CharacteristicTransport;
use crate::core::session::Session;

pub struct Poller {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Starts polling every `period`. The first tick happens one period from now.
    pub fn start<T: CharacteristicTransport>(session: Arc<Session<T>>, period: Duration) -> Self {
        let cancel_token = CancellationToken::new();
        let cancelled = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Polling started every {} ms", period.as_millis());

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => {
                        debug!("Polling cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !session.transport().is_connected().await {
                            warn!("Device disconnected, stopping polling");
                            session.notify_disconnected();
                            break;
                        }
                        session.poll_once().await;
                    }
                }
            }
            info!("Polling stopped");
        });

        Self { cancel_token, handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops polling and waits for the loop to exit
    pub async fn stop(self) {
        self.cancel_token.cancel();
        let _ = self.handle.await;
    }
}
