// validate.rs — Validate trigger definitions by configuring throwaway triggers.

use std::path::Path;
use std::sync::Arc;

use at_state::MemoryStateStore;
use at_trigger::config::{definition_event, definition_name};
use at_trigger::{
    ActionRegistry, StateMap, StateProvider, Trigger, TriggerContext, TriggerDefinitions,
    TriggerError,
};

/// Provider for triggers that are configured but never run.
struct Stateless;

impl StateProvider for Stateless {
    fn get_state(&self) -> StateMap {
        StateMap::new()
    }

    fn set_state(&self, _state: StateMap) {}
}

/// Outcome for one definition.
#[derive(Debug)]
pub struct Report {
    pub index: usize,
    pub name: Option<String>,
    /// Empty when the definition is valid.
    pub problems: Vec<String>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Configure each definition against the built-in action registry.
pub fn check(definitions: &TriggerDefinitions, allow: &[String]) -> Vec<Report> {
    let ctx = TriggerContext::new(
        ActionRegistry::with_builtins(),
        Arc::new(MemoryStateStore::new()),
    );

    definitions
        .iter()
        .enumerate()
        .map(|(index, properties)| {
            let name = match definition_name(index, properties) {
                Ok(name) => name,
                Err(e) => {
                    return Report {
                        index,
                        name: None,
                        problems: vec![e.to_string()],
                    }
                }
            };
            let mut report = Report {
                index,
                name: Some(name.to_string()),
                problems: Vec::new(),
            };
            let event = match definition_event(name, properties) {
                Ok(event) => event,
                Err(e) => {
                    report.problems.push(e.to_string());
                    return report;
                }
            };

            let trigger = Trigger::new(event, name, Stateless).with_valid_properties(allow);
            match trigger.configure(&ctx, properties) {
                Ok(()) => {}
                Err(TriggerError::Configuration { details, .. }) => {
                    report
                        .problems
                        .extend(details.iter().map(|(k, v)| format!("{}: {}", k, v)));
                }
                Err(e) => report.problems.push(e.to_string()),
            }
            trigger.close();
            report
        })
        .collect()
}

pub fn execute(file: &Path, allow: &[String]) -> anyhow::Result<()> {
    let definitions = TriggerDefinitions::load(file)?;
    if definitions.is_empty() {
        println!("No triggers defined in {}", file.display());
        return Ok(());
    }

    let reports = check(&definitions, allow);
    let mut invalid = 0;
    for report in &reports {
        let label = report
            .name
            .clone()
            .unwrap_or_else(|| format!("#{}", report.index));
        if report.is_valid() {
            println!("  ok       {}", label);
        } else {
            invalid += 1;
            println!("  INVALID  {}", label);
            for problem in &report.problems {
                println!("             {}", problem);
            }
        }
    }

    println!();
    println!(
        "{} trigger(s) checked, {} invalid.",
        reports.len(),
        invalid
    );
    if invalid > 0 {
        anyhow::bail!("{} invalid trigger definition(s)", invalid);
    }
    Ok(())
}
