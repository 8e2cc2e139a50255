//! Terminal control panel for GuitarCabinet humidity cabinets

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::error;

use guitar_cabinet_panel_lib::commands::{self, K10Action, Output};
use guitar_cabinet_panel_lib::config::{PanelConfig, default_config_path};
use guitar_cabinet_panel_lib::core::bluetooth::{CabinetCharacteristic, CabinetManager};
use guitar_cabinet_panel_lib::core::protocol::DeviceCommand;
use guitar_cabinet_panel_lib::logging;

#[derive(Parser)]
#[command(name = "guitar-cabinet")]
#[command(about = "Control panel for GuitarCabinet humidity cabinets over BLE")]
#[command(version)]
struct Cli {
    /// Device id to connect to (defaults to the first cabinet found)
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Config file (defaults to <config dir>/guitar-cabinet/panel_config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for cabinets
    Scan {
        /// Scan duration in seconds (overrides the config)
        #[arg(short = 't', long)]
        timeout: Option<u64>,
    },
    /// Print temperature, humidity, system info and lock status
    Status,
    /// Stream live updates until interrupted
    Monitor,
    /// Read the raw value of a characteristic
    Read {
        /// target-humidity, temperature, humidity, settings, system-info, k10 or command
        characteristic: CabinetCharacteristic,
    },
    /// Show or change device settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Control the K10 magnetic lock
    K10 {
        #[command(subcommand)]
        action: K10Subcommand,
    },
    /// Reboot the controller
    Reboot {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Restore factory settings
    ResetDefaults {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// List every setting grouped by section
    Show,
    /// Write settings, e.g. `set targetHumidity=55 lockHoldTime=1500`
    Set {
        #[arg(required = true, value_name = "KEY=VALUE")]
        edits: Vec<String>,
    },
}

#[derive(Subcommand)]
enum K10Subcommand {
    Press,
    Release,
    Activate,
    /// Press, hold and release like the panel button
    Hold {
        /// Hold duration in milliseconds (defaults to the device hold time)
        #[arg(long)]
        ms: Option<u64>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    /// Write a config file with default values
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let output = Output { json: cli.json };
    let device = cli.device.as_deref();

    let action = match cli.command {
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => commands::config_show(&config_path, output).await,
                ConfigAction::Init { force } => commands::config_init(&config_path, force).await,
            };
        }
        other => other,
    };

    let mut config = PanelConfig::load_config(&config_path).await?;
    if let Commands::Scan { timeout: Some(secs) } = action {
        config.connection.scan_timeout_secs = secs;
    }
    let mut manager = CabinetManager::new(config).await?;

    match action {
        Commands::Scan { .. } => commands::scan(&manager, output).await,
        Commands::Status => commands::status(&mut manager, device, output).await,
        Commands::Monitor => commands::monitor(&mut manager, device, output).await,
        Commands::Read { characteristic } => commands::read(&mut manager, device, characteristic, output).await,
        Commands::Settings { action } => match action {
            SettingsAction::Show => commands::settings_show(&mut manager, device, output).await,
            SettingsAction::Set { edits } => commands::settings_set(&mut manager, device, &edits, output).await,
        },
        Commands::K10 { action } => {
            let action = match action {
                K10Subcommand::Press => K10Action::Press,
                K10Subcommand::Release => K10Action::Release,
                K10Subcommand::Activate => K10Action::Activate,
                K10Subcommand::Hold { ms } => K10Action::Hold(ms.map(Duration::from_millis)),
            };
            commands::k10(&mut manager, device, action, output).await
        }
        Commands::Reboot { yes } => commands::device_command(&mut manager, device, DeviceCommand::Reboot, yes).await,
        Commands::ResetDefaults { yes } => {
            commands::device_command(&mut manager, device, DeviceCommand::ResetToDefaults, yes).await
        }
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_settings_set() {
        let cli = Cli::try_parse_from(["guitar-cabinet", "--json", "settings", "set", "targetHumidity=55"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Settings { action: SettingsAction::Set { edits } } => assert_eq!(edits, vec!["targetHumidity=55"]),
            _ => panic!("expected settings set"),
        }
    }

    #[test]
    fn test_parse_characteristic() {
        let cli = Cli::try_parse_from(["guitar-cabinet", "read", "system-info", "-d", "hci0/dev_A4"]).unwrap();
        assert_eq!(cli.device.as_deref(), Some("hci0/dev_A4"));
        assert!(matches!(
            cli.command,
            Commands::Read { characteristic: CabinetCharacteristic::SystemInfo }
        ));
        assert!(Cli::try_parse_from(["guitar-cabinet", "read", "battery"]).is_err());
    }
}
