//! Cabinet commands implementation
//! K10 lock commands, device commands and settings writes, each followed by
//! the delayed follow-up the firmware needs.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::constants::{
    DEFAULT_LOCK_HOLD_TIME_MS, K10_REFRESH_DELAY_MS, RESTART_DISCONNECT_DELAY_MS, SETTINGS_RELOAD_DELAY_MS,
};
use crate::core::bluetooth::transport::CharacteristicTransport;
use crate::core::protocol::{DeviceCommand, K10Command};
use crate::core::session::{SaveOutcome, Session};

/// Delays between a command and its follow-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTiming {
    pub k10_refresh_delay: Duration,
    pub settings_reload_delay: Duration,
    pub restart_disconnect_delay: Duration,
    pub default_hold_time: Duration,
}

impl Default for CommandTiming {
    fn default() -> Self {
        Self {
            k10_refresh_delay: Duration::from_millis(K10_REFRESH_DELAY_MS),
            settings_reload_delay: Duration::from_millis(SETTINGS_RELOAD_DELAY_MS),
            restart_disconnect_delay: Duration::from_millis(RESTART_DISCONNECT_DELAY_MS),
            default_hold_time: Duration::from_millis(DEFAULT_LOCK_HOLD_TIME_MS),
        }
    }
}

/// A follow-up scheduled after a command
pub struct PendingRefresh(JoinHandle<()>);

impl PendingRefresh {
    /// Waits for the follow-up to finish
    pub async fn wait(self) {
        if let Err(e) = self.0.await {
            if !e.is_cancelled() {
                error!("Follow-up task failed: {}", e);
            }
        }
    }
}

/// Command executor for the cabinet
pub struct CommandExecutor<T: CharacteristicTransport> {
    session: Arc<Session<T>>,
    timing: CommandTiming,
}

impl<T: CharacteristicTransport> Clone for CommandExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            timing: self.timing,
        }
    }
}

impl<T: CharacteristicTransport> CommandExecutor<T> {
    pub fn new(session: Arc<Session<T>>, timing: CommandTiming) -> Self {
        Self { session, timing }
    }

    pub fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    pub fn timing(&self) -> &CommandTiming {
        &self.timing
    }

    /// Sends a K10 command and re-reads the lock status shortly after
    pub async fn send_k10(&self, command: K10Command) -> Result<PendingRefresh> {
        self.session.send_k10(command).await?;
        Ok(self.refresh_k10_later())
    }

    /// Writes the changed settings; a full reload follows a successful write
    pub async fn save_settings(&self, edits: &[(String, String)]) -> Result<(SaveOutcome, Option<PendingRefresh>)> {
        let outcome = self.session.save_settings(edits).await?;
        let reload = match outcome {
            SaveOutcome::NoChanges => None,
            SaveOutcome::Sent(_) => {
                let session = self.session.clone();
                let delay = self.timing.settings_reload_delay;
                Some(PendingRefresh(tokio::spawn(async move {
                    sleep(delay).await;
                    debug!("Reloading data after settings write");
                    session.load_all_data().await;
                })))
            }
        };
        Ok((outcome, reload))
    }

    /// Sends a device command. Returns how long to wait before disconnecting
    /// when the command restarts the device.
    pub async fn send_device_command(&self, command: DeviceCommand) -> Result<Option<Duration>> {
        self.session.send_device_command(command).await?;
        if command.restarts_device() {
            info!(
                "Device restarts after \"{}\", disconnecting in {} ms",
                command.as_str(),
                self.timing.restart_disconnect_delay.as_millis()
            );
            Ok(Some(self.timing.restart_disconnect_delay))
        } else {
            Ok(None)
        }
    }

    /// Starts the press-and-hold gesture helper
    pub fn press_hold(&self) -> PressHold<T> {
        PressHold::new(self.clone())
    }

    fn refresh_k10_later(&self) -> PendingRefresh {
        let session = self.session.clone();
        let delay = self.timing.k10_refresh_delay;
        PendingRefresh(tokio::spawn(async move {
            sleep(delay).await;
            session.refresh_k10().await;
        }))
    }
}

struct HoldState {
    token: CancellationToken,
    timer: JoinHandle<bool>,
}

/// The K10 press-and-hold gesture.
///
/// `press` sends `PRESS` and arms a timer for the hold time. If the button is
/// still held when it fires, `ACTIVATE` is sent. `release` disarms the timer,
/// sends `RELEASE` and reports whether the lock was activated.
pub struct PressHold<T: CharacteristicTransport> {
    executor: CommandExecutor<T>,
    held: Mutex<Option<HoldState>>,
}

impl<T: CharacteristicTransport> PressHold<T> {
    pub fn new(executor: CommandExecutor<T>) -> Self {
        Self {
            executor,
            held: Mutex::new(None),
        }
    }

    pub async fn is_pressed(&self) -> bool {
        self.held.lock().await.is_some()
    }

    /// Presses the button. Does nothing if it is already pressed.
    pub async fn press(&self) -> Result<()> {
        let mut held = self.held.lock().await;
        if held.is_some() {
            debug!("K10 already pressed");
            return Ok(());
        }

        // The status refresh after PRESS runs on its own
        drop(self.executor.send_k10(K10Command::Press).await?);

        let hold_time = self
            .executor
            .session()
            .snapshot()
            .await
            .hold_time(self.executor.timing().default_hold_time);
        info!("K10: holding for {} ms", hold_time.as_millis());

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let executor = self.executor.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => false,
                _ = sleep(hold_time) => {
                    match executor.send_k10(K10Command::Activate).await {
                        Ok(_) => true,
                        Err(e) => {
                            error!("Failed to activate K10: {}", e);
                            false
                        }
                    }
                }
            }
        });

        *held = Some(HoldState { token, timer });
        Ok(())
    }

    /// Releases the button. Returns whether the lock was activated during the hold.
    pub async fn release(&self) -> Result<bool> {
        let Some(state) = self.held.lock().await.take() else {
            debug!("K10 not pressed");
            return Ok(false);
        };

        state.token.cancel();
        let activated = state.timer.await.unwrap_or(false);

        self.executor.send_k10(K10Command::Release).await?;
        Ok(activated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bluetooth::fake::FakeTransport;
    use crate::core::bluetooth::types::CabinetCharacteristic;

    fn executor(transport: FakeTransport) -> CommandExecutor<FakeTransport> {
        CommandExecutor::new(Arc::new(Session::new(transport)), CommandTiming::default())
    }

    fn k10_writes(executor: &CommandExecutor<FakeTransport>) -> Vec<String> {
        executor
            .session()
            .transport()
            .writes()
            .into_iter()
            .filter(|(ch, _)| *ch == CabinetCharacteristic::K10)
            .map(|(_, value)| value)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_k10_command_refreshes_status() {
        let executor = executor(FakeTransport::cabinet());
        executor.session().transport().set(CabinetCharacteristic::K10, "LOCK:active,DOOR:open");

        let refresh = executor.send_k10(K10Command::Activate).await.unwrap();
        assert!(executor.session().transport().reads().is_empty());
        refresh.wait().await;

        assert_eq!(executor.session().transport().reads(), vec![CabinetCharacteristic::K10]);
        let state = executor.session().snapshot().await;
        assert!(state.k10.is_locked());
        assert!(state.k10.is_door_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_settings_reloads() {
        let executor = executor(FakeTransport::cabinet());
        executor.session().load_all_data().await;
        executor.session().transport().clear_reads();

        let edits = vec![("targetHumidity".to_string(), "60".to_string())];
        let (outcome, reload) = executor.save_settings(&edits).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Sent("targetHumidity=60".to_string()));
        executor
            .session()
            .transport()
            .set(CabinetCharacteristic::AllSettings, "targetHumidity=60,lockHoldTime=1000");
        reload.unwrap().wait().await;
        assert_eq!(executor.session().transport().reads().len(), 5);

        let (outcome, reload) = executor.save_settings(&edits).await.unwrap();
        assert_eq!(outcome, SaveOutcome::NoChanges);
        assert!(reload.is_none());
    }

    #[tokio::test]
    async fn test_device_command_schedules_disconnect() {
        let executor = executor(FakeTransport::cabinet());
        let delay = executor.send_device_command(DeviceCommand::Reboot).await.unwrap();
        assert_eq!(delay, Some(Duration::from_millis(RESTART_DISCONNECT_DELAY_MS)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_hold_activates_after_hold_time() {
        let executor = executor(FakeTransport::cabinet().with(CabinetCharacteristic::K10, "HOLD:2000"));
        executor.session().refresh_k10().await;
        let gesture = executor.press_hold();

        gesture.press().await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(k10_writes(&executor), vec!["PRESS"]);

        sleep(Duration::from_millis(600)).await;
        assert_eq!(k10_writes(&executor), vec!["PRESS", "ACTIVATE"]);

        assert!(gesture.release().await.unwrap());
        assert_eq!(k10_writes(&executor), vec!["PRESS", "ACTIVATE", "RELEASE"]);
        assert!(!gesture.is_pressed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_hold_refreshes_status_after_press_and_activate() {
        let executor = executor(FakeTransport::cabinet());
        executor.session().refresh_k10().await;
        executor.session().transport().clear_reads();
        let gesture = executor.press_hold();

        gesture.press().await.unwrap();
        sleep(Duration::from_millis(700)).await;
        assert_eq!(executor.session().transport().reads(), vec![CabinetCharacteristic::K10]);

        // ACTIVATE at 1000 ms, its refresh at 1500 ms
        executor.session().transport().set(CabinetCharacteristic::K10, "LOCK:active");
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(k10_writes(&executor), vec!["PRESS", "ACTIVATE"]);
        assert_eq!(
            executor.session().transport().reads(),
            vec![CabinetCharacteristic::K10, CabinetCharacteristic::K10]
        );
        assert!(executor.session().snapshot().await.k10.is_locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_release_does_not_activate() {
        let executor = executor(FakeTransport::cabinet());
        let gesture = executor.press_hold();

        gesture.press().await.unwrap();
        gesture.press().await.unwrap();
        sleep(Duration::from_millis(400)).await;
        assert!(!gesture.release().await.unwrap());
        assert!(!gesture.release().await.unwrap());

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(k10_writes(&executor), vec!["PRESS", "RELEASE"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_press_arms_nothing() {
        let executor = executor(FakeTransport::cabinet().failing(CabinetCharacteristic::K10));
        let gesture = executor.press_hold();

        assert!(gesture.press().await.is_err());
        assert!(!gesture.is_pressed().await);
    }
}
