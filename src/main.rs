// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use airunlock::bluetooth::{adapter_address, GattServer, PeripheralIdentity};
use airunlock::commands::{provisioning_payload, CommandDispatcher, CommandKeywords, KeywordSource};
use airunlock::config::Config;
use airunlock::events::{WriteProcessor, WRITE_QUEUE_DEPTH};
use airunlock::input;
use airunlock::prompt::DesktopPrompt;
use airunlock::session::{self, LockStateTracker, LogindControl, SessionActions, SessionMonitor};
use airunlock::state::AppState;
use airunlock::storage::{self, Credential, KeyringSecretStore, SecretStore, SettingsStore};
use airunlock::ui::{run_tray, TrayAction};

#[derive(Parser)]
#[command(name = "airunlock", version)]
#[command(about = "Lock and unlock this machine from a BLE companion device")]
struct Cli {
    /// Directory holding config.toml and settings.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the BLE peripheral (default)
    Run {
        /// Do not show the tray icon
        #[arg(long)]
        no_tray: bool,
    },
    /// Store the unlock password, read from stdin
    SetPassword,
    /// Change the lock and unlock keywords
    SetKeywords {
        #[arg(long)]
        lock: String,
        #[arg(long)]
        unlock: String,
    },
    /// Print the provisioning payload (MAC,unlockWord,lockWord)
    PairingPayload,
}

#[tokio::main]
async fn main() -> Result<()> {
    airunlock::init_logging();

    let cli = Cli::parse();
    let dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };

    match cli.command.unwrap_or(Commands::Run { no_tray: false }) {
        Commands::Run { no_tray } => run(&dir, no_tray).await,
        Commands::SetPassword => set_password(),
        Commands::SetKeywords { lock, unlock } => {
            let settings = SettingsStore::new(&dir)?;
            settings.set_keywords(CommandKeywords::new(lock, unlock))?;
            println!("Keywords saved. Re-provision the companion device.");
            Ok(())
        }
        Commands::PairingPayload => pairing_payload(&dir).await,
    }
}

async fn run(dir: &Path, no_tray: bool) -> Result<()> {
    let config = Config::load(dir)?;
    let settings = Arc::new(SettingsStore::new(dir)?);
    let state = Arc::new(AppState::new());
    let prompt = DesktopPrompt::new(config.bluetooth.auto_power_on);

    let secrets: Arc<dyn SecretStore> = Arc::new(KeyringSecretStore::new());
    storage::probe(secrets.as_ref(), &prompt);

    let login_session = session::logind::connect_session().await?;
    let tracker = LockStateTracker::new();
    let lock_state = tracker.subscribe();
    let monitor = SessionMonitor::new(login_session.clone());
    tokio::spawn(async move {
        if let Err(e) = monitor.run(tracker).await {
            error!("Session monitor failed: {:#}", e);
        }
    });

    let control = Arc::new(LogindControl::new(login_session).await);
    let injector = input::create_injector(config.input.backend)?;
    let actions = SessionActions::new(control, injector, config.timing.timings());
    let dispatcher = CommandDispatcher::new(
        settings.clone(),
        lock_state.clone(),
        actions,
        secrets,
    );

    let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);
    let processor = WriteProcessor::new(PeripheralIdentity::default(), dispatcher, state.clone());
    tokio::spawn(processor.run(write_rx));

    let mut tray = None;
    if config.tray.enabled && !no_tray {
        match run_tray(state.clone(), lock_state) {
            Ok(started) => tray = Some(started),
            Err(e) => warn!("Tray unavailable: {:#}", e),
        }
    }

    let mut server = GattServer::new(
        config.bluetooth.adapter.as_deref(),
        write_tx,
        settings,
        state,
    )
    .await?;

    tokio::select! {
        result = server.run(&prompt) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
        _ = wait_for_quit(tray.as_mut().map(|(rx, _)| rx)) => info!("Quit requested from tray"),
    }

    Ok(())
}

async fn wait_for_quit(rx: Option<&mut mpsc::UnboundedReceiver<TrayAction>>) {
    if let Some(rx) = rx {
        if let Some(TrayAction::Quit) = rx.recv().await {
            return;
        }
    }
    std::future::pending::<()>().await
}

fn set_password() -> Result<()> {
    eprintln!("Enter the password used to unlock this session:");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let secret = line.trim_end_matches(['\r', '\n']);
    if secret.is_empty() {
        bail!("Password must not be empty");
    }

    KeyringSecretStore::new().store(&Credential::new(secret))?;
    println!("Password stored in the system keyring.");
    Ok(())
}

async fn pairing_payload(dir: &Path) -> Result<()> {
    let config = Config::load(dir)?;
    let settings = SettingsStore::new(dir)?;

    let address = match adapter_address(config.bluetooth.adapter.as_deref()).await {
        Ok(address) => address,
        Err(e) => {
            warn!("Adapter unavailable ({:#}), using last known address", e);
            settings
                .address()
                .context("No Bluetooth address known yet")?
        }
    };

    println!("{}", provisioning_payload(&address, &settings.keywords()));
    Ok(())
}
