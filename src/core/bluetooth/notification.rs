//! Notification handling for the cabinet
//! Subscribes to every state characteristic that supports notify and feeds
//! the decoded values into the session.

use std::sync::Arc;

use bluest::Characteristic;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::transport::BluestTransport;
use crate::core::bluetooth::types::CabinetCharacteristic;
use crate::core::protocol::{self, CabinetUpdate};
use crate::core::session::Session;

/// Characteristics worth subscribing to
pub const NOTIFIED_CHARACTERISTICS: [CabinetCharacteristic; 5] = [
    CabinetCharacteristic::CurrentTemperature,
    CabinetCharacteristic::CurrentHumidity,
    CabinetCharacteristic::SystemInfo,
    CabinetCharacteristic::K10,
    CabinetCharacteristic::AllSettings,
];

/// Notification handler for cabinet data
pub struct NotificationHandler {
    cancel_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl NotificationHandler {
    /// Subscribes to the notifiable characteristics of the session's device.
    ///
    /// A characteristic whose subscription fails keeps being polled.
    pub async fn start(session: Arc<Session<BluestTransport>>) -> Self {
        let cancel_token = CancellationToken::new();
        let mut tasks = Vec::new();

        for (kind, characteristic) in session.transport().notifiable() {
            if !NOTIFIED_CHARACTERISTICS.contains(&kind) {
                continue;
            }
            info!("Subscribing to notifications for '{}'...", kind);
            let (ready_tx, ready_rx) = oneshot::channel();
            tasks.push(tokio::spawn(Self::process_notifications(
                kind,
                characteristic,
                session.clone(),
                cancel_token.clone(),
                ready_tx,
            )));

            match ready_rx.await {
                Ok(true) => info!("Notifications active for '{}'", kind),
                _ => warn!("Notifications unavailable for '{}', falling back to polling", kind),
            }
        }

        Self { cancel_token, tasks }
    }

    async fn process_notifications(
        kind: CabinetCharacteristic,
        characteristic: Characteristic,
        session: Arc<Session<BluestTransport>>,
        cancel_token: CancellationToken,
        ready: oneshot::Sender<bool>,
    ) {
        let mut notification_stream = match characteristic.notify().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to subscribe to '{}': {}", kind, e);
                let _ = ready.send(false);
                return;
            }
        };
        session.set_notifying(kind, true).await;
        let _ = ready.send(true);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                result = notification_stream.next() => match result {
                    Some(Ok(value)) => {
                        if let Some(update) = handle_notification(kind, &value) {
                            session.apply(update).await;
                        }
                    }
                    Some(Err(e)) => {
                        error!("Error in notification stream for '{}': {}", kind, e);
                        break;
                    }
                    None => break,
                }
            }
        }

        session.set_notifying(kind, false).await;
        info!("Notification stream for '{}' ended", kind);
    }

    pub fn active_subscriptions(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    /// Cancels every subscription and waits for the tasks to end
    pub async fn stop(self) {
        self.cancel_token.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        debug!("Notifications stopped");
    }
}

/// Decodes one notification payload; bad payloads are logged and dropped.
pub fn handle_notification(kind: CabinetCharacteristic, value: &[u8]) -> Option<CabinetUpdate> {
    debug!("Notification from '{}': {:?}", kind, protocol::decode_utf8(value));
    match protocol::decode(kind, value) {
        Ok(update) => Some(update),
        Err(e) => {
            warn!("Ignoring notification from '{}': {}", kind, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::K10Status;

    #[test]
    fn test_handle_notification() {
        assert_eq!(
            handle_notification(CabinetCharacteristic::CurrentHumidity, b"H:48.2"),
            Some(CabinetUpdate::Humidity(48.2))
        );
        assert_eq!(
            handle_notification(CabinetCharacteristic::K10, b"DOOR:open"),
            Some(CabinetUpdate::K10(K10Status {
                door_open: Some(true),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn test_bad_notifications_are_dropped() {
        assert_eq!(handle_notification(CabinetCharacteristic::CurrentTemperature, b"48.2"), None);
        assert_eq!(handle_notification(CabinetCharacteristic::CurrentHumidity, b"H:--"), None);
        assert_eq!(handle_notification(CabinetCharacteristic::Command, b"REBOOT"), None);
    }
}
