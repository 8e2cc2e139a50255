//! Command line handlers
//! Each handler drives the [`CabinetManager`] for one subcommand and prints the
//! result, either human readable or as JSON.

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::PanelConfig;
use crate::core::bluetooth::{CabinetCharacteristic, CabinetManager};
use crate::core::protocol::{
    CabinetUpdate, DeviceCommand, K10Command, SettingGroup, SettingRow, grouped_settings, parse_edit,
};
use crate::core::session::{SaveOutcome, SessionEvent};

/// Where and how results are printed
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human());
        }
        Ok(())
    }
}

/// K10 lock operations available on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum K10Action {
    Press,
    Release,
    Activate,
    /// Press, keep holding for the given time (or the device hold time), release
    Hold(Option<Duration>),
}

/// Scans until the timeout; Ctrl-C ends the scan early and lists what was found
pub async fn scan(manager: &CabinetManager, output: Output) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, stopping scan");
                cancel.cancel();
            }
        }
    });

    let devices = manager.scan(&cancel).await;
    interrupt.abort();
    let devices = devices?;
    output.emit(&devices, || {
        if devices.is_empty() {
            "No cabinets found".to_string()
        } else {
            devices.iter().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
        }
    })
}

pub async fn status(manager: &mut CabinetManager, device: Option<&str>, output: Output) -> Result<()> {
    let state = manager.connect(device).await?;
    let result = output.emit(&state, || state.to_string());
    manager.disconnect().await?;
    result
}

/// Prints every update until the link drops or Ctrl-C is pressed
pub async fn monitor(manager: &mut CabinetManager, device: Option<&str>, output: Output) -> Result<()> {
    let state = manager.connect(device).await?;
    output.emit(&state, || state.to_string())?;

    let mut events = manager.session()?.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, disconnecting");
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::Disconnected) => {
                    warn!("Device disconnected");
                    output.emit(&SessionEvent::Disconnected, || "Disconnected".to_string())?;
                    break;
                }
                Ok(SessionEvent::Update(update)) => {
                    output.emit(&update, || describe_update(&update))?;
                }
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} updates", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }

    manager.disconnect().await
}

pub async fn read(
    manager: &mut CabinetManager,
    device: Option<&str>,
    characteristic: CabinetCharacteristic,
    output: Output,
) -> Result<()> {
    manager.connect(device).await?;
    let result = manager
        .session()?
        .read_raw(characteristic)
        .await
        .and_then(|raw| output.emit(&raw, || format!("{}: {}", characteristic, raw)));
    manager.disconnect().await?;
    result
}

pub async fn settings_show(manager: &mut CabinetManager, device: Option<&str>, output: Output) -> Result<()> {
    let state = manager.connect(device).await?;
    let groups = grouped_settings(&state.settings);
    let result = output.emit(&groups, || format_settings(&groups));
    manager.disconnect().await?;
    result
}

pub async fn settings_set(
    manager: &mut CabinetManager,
    device: Option<&str>,
    edits: &[String],
    output: Output,
) -> Result<()> {
    let edits = edits
        .iter()
        .map(|edit| parse_edit(edit))
        .collect::<Result<Vec<_>, _>>()?;

    manager.connect(device).await?;
    let result = save_settings(manager, &edits, output).await;
    manager.disconnect().await?;
    result
}

async fn save_settings(manager: &CabinetManager, edits: &[(String, String)], output: Output) -> Result<()> {
    let (outcome, reload) = manager.executor()?.save_settings(edits).await?;
    if let Some(reload) = reload {
        reload.wait().await;
    }
    output.emit(&outcome, || match &outcome {
        SaveOutcome::NoChanges => "No changes to send".to_string(),
        SaveOutcome::Sent(encoded) => format!("Sent: {}", encoded),
    })
}

pub async fn k10(manager: &mut CabinetManager, device: Option<&str>, action: K10Action, output: Output) -> Result<()> {
    manager.connect(device).await?;
    let result = run_k10(manager, action, output).await;
    manager.disconnect().await?;
    result
}

async fn run_k10(manager: &CabinetManager, action: K10Action, output: Output) -> Result<()> {
    let command = match action {
        K10Action::Press => K10Command::Press,
        K10Action::Release => K10Command::Release,
        K10Action::Activate => K10Command::Activate,
        K10Action::Hold(duration) => {
            let executor = manager.executor()?;
            let gesture = executor.press_hold();
            let duration = match duration {
                Some(duration) => duration,
                None => {
                    let state = executor.session().snapshot().await;
                    state.hold_time(executor.timing().default_hold_time) + Duration::from_millis(200)
                }
            };

            gesture.press().await?;
            sleep(duration).await;
            let activated = gesture.release().await?;
            let status = executor.session().refresh_k10().await;
            return output.emit(&status, || {
                let outcome = if activated { "Lock activated" } else { "Released before activation" };
                format!("{}\n{}", outcome, status)
            });
        }
    };

    manager.executor()?.send_k10(command).await?.wait().await;
    let status = manager.session()?.snapshot().await.k10;
    output.emit(&status, || status.to_string())
}

/// Sends a reboot or factory reset, asking first unless `assume_yes`
pub async fn device_command(
    manager: &mut CabinetManager,
    device: Option<&str>,
    command: DeviceCommand,
    assume_yes: bool,
) -> Result<()> {
    let question = match command {
        DeviceCommand::Reboot => "Reboot the cabinet controller?",
        DeviceCommand::ResetToDefaults => "Reset ALL settings to factory defaults?",
    };
    if !assume_yes && !confirm(question)? {
        println!("Aborted");
        return Ok(());
    }

    manager.connect(device).await?;
    if let Err(e) = manager.send_device_command(command).await {
        manager.disconnect().await?;
        return Err(e);
    }
    println!("\"{}\" sent, the device is restarting", command.as_str());
    Ok(())
}

pub async fn config_show(path: &Path, output: Output) -> Result<()> {
    let config = PanelConfig::load_config(path).await?;
    output.emit(&config, || {
        format!(
            "# {}\n{}",
            path.display(),
            serde_json::to_string_pretty(&config).unwrap_or_default()
        )
    })
}

/// Writes the default config, refusing to overwrite an existing file unless `force`
pub async fn config_init(path: &Path, force: bool) -> Result<()> {
    if !force && tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(anyhow!("{} already exists, use --force to overwrite", path.display()));
    }
    PanelConfig::default().save_config(path).await?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn describe_update(update: &CabinetUpdate) -> String {
    match update {
        CabinetUpdate::Temperature(t) => format!("Temperature: {:.1}°C", t),
        CabinetUpdate::Humidity(h) => format!("Humidity: {:.1}%", h),
        CabinetUpdate::SystemInfo(info) => info.to_string(),
        CabinetUpdate::K10(status) => status.to_string(),
        CabinetUpdate::Settings(settings) => format!("Settings reloaded ({} values)", settings.len()),
    }
}

fn format_settings(groups: &std::collections::BTreeMap<SettingGroup, Vec<SettingRow>>) -> String {
    let mut out = String::new();
    for (group, rows) in groups {
        out.push_str(&format!("== {} ==\n", group.label()));
        for row in rows {
            let marker = if row.writable { "" } else { " (read-only)" };
            out.push_str(&format!("  {:<28} {:<36} {}{}\n", row.key, row.label, row.display, marker));
        }
    }
    if out.is_empty() {
        out.push_str("No settings reported by the device");
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::{K10Status, Settings};

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }

    #[test]
    fn test_describe_update() {
        assert_eq!(describe_update(&CabinetUpdate::Humidity(55.06)), "Humidity: 55.1%");
        assert!(describe_update(&CabinetUpdate::K10(K10Status::default())).contains("Lock: released"));
    }

    #[test]
    fn test_format_settings() {
        let groups = grouped_settings(&Settings::parse("targetHumidity=50,resetCount=3"));
        let text = format_settings(&groups);
        assert!(text.contains("targetHumidity"));
        assert!(text.contains("(read-only)"));
        assert_eq!(format_settings(&Default::default()), "No settings reported by the device");
    }
}
