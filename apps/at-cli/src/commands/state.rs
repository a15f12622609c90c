// state.rs — State subcommands: list, show, clear.

use std::path::Path;

use at_state::{trigger_state_path, DistribStateStore, StoreConfig, StoreError, TRIGGER_STATE_PATH};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum StateCommands {
    /// List triggers that have a checkpoint.
    List,
    /// Print a trigger's checkpoint as JSON.
    Show {
        /// Trigger name.
        trigger: String,
    },
    /// Delete a trigger's checkpoint so it starts fresh.
    Clear {
        /// Trigger name.
        trigger: String,
    },
}

pub fn execute(cmd: &StateCommands, store_config: &Path) -> anyhow::Result<()> {
    let store = StoreConfig::load(store_config)?.open()?;
    let result = run(cmd, store.as_ref());
    store.close();
    result
}

fn run(cmd: &StateCommands, store: &dyn DistribStateStore) -> anyhow::Result<()> {
    match cmd {
        StateCommands::List => {
            let names = match store.list_data(TRIGGER_STATE_PATH) {
                Ok(names) => names,
                Err(StoreError::NotFound(_)) => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            if names.is_empty() {
                println!("No trigger state found.");
                return Ok(());
            }

            println!("{:<32} {:>8} {:>8}", "TRIGGER", "VERSION", "BYTES");
            println!("{}", "-".repeat(50));
            for name in names {
                match store.get_data(&trigger_state_path(&name)) {
                    Ok(data) => {
                        println!("{:<32} {:>8} {:>8}", name, data.version, data.data.len())
                    }
                    Err(e) if e.is_closed() || e.is_interrupted() => return Err(e.into()),
                    Err(e) => println!("{:<32} {:>8} {:>8}  {}", name, "-", "-", e),
                }
            }
        }

        StateCommands::Show { trigger } => {
            let path = trigger_state_path(trigger);
            let data = match store.get_data(&path) {
                Ok(data) => data,
                Err(StoreError::NotFound(_)) => {
                    println!("No state for trigger '{}'.", trigger);
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            let value: serde_json::Value = serde_json::from_slice(&data.data)
                .map_err(|e| anyhow::anyhow!("checkpoint at {} is not valid JSON: {}", path, e))?;
            println!("# {} (version {})", path, data.version);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }

        StateCommands::Clear { trigger } => {
            let path = trigger_state_path(trigger);
            if store.remove_data(&path)? {
                tracing::info!(trigger = %trigger, "cleared trigger state");
                println!("Cleared state for trigger '{}'.", trigger);
            } else {
                println!("No state for trigger '{}'.", trigger);
            }
        }
    }

    Ok(())
}
