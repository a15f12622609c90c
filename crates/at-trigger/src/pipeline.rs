// pipeline.rs — ActionPipeline: the ordered actions owned by one trigger.
//
// A pipeline is built wholesale from the trigger's `actions` property and
// never mutated afterwards; a later `configure` builds a new one. Lifecycle
// calls fan out to every action in order:
//
//   build   — resolve + configure each spec; first failure aborts the build
//   init    — fail-fast: actions after a failing one are not initialized
//   process — fail-fast
//   close   — best-effort: every action is closed, failures are collected

use serde_json::Value;

use crate::action::TriggerAction;
use crate::context::TriggerContext;
use crate::error::ActionError;
use crate::event::TriggerEvent;
use crate::validation::PropertyMap;

/// One entry of a trigger's `actions` list.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    /// Class name resolved through the [`ActionRegistry`](crate::ActionRegistry).
    pub class: String,
    /// The full entry, `class` included; passed to the action's `configure`.
    pub properties: PropertyMap,
}

impl ActionSpec {
    /// Parse one list entry. It must be a map with a string `class`.
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ActionError> {
        let properties = value.as_object().ok_or_else(|| ActionError::InvalidSpec {
            index,
            reason: format!("expected a map, got {}", value),
        })?;
        let class = properties
            .get("class")
            .and_then(|c| c.as_str())
            .ok_or_else(|| ActionError::InvalidSpec {
                index,
                reason: "missing string property 'class'".to_string(),
            })?;
        Ok(Self {
            class: class.to_string(),
            properties: properties.clone(),
        })
    }

    /// Parse the trigger's `actions` property. Absent or null means no actions.
    pub fn parse_list(actions: Option<&Value>) -> Result<Vec<Self>, ActionError> {
        match actions {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| Self::from_value(index, item))
                .collect(),
            Some(other) => Err(ActionError::NotAList(other.to_string())),
        }
    }
}

/// Ordered, immutable sequence of configured actions.
#[derive(Default)]
pub struct ActionPipeline {
    actions: Vec<Box<dyn TriggerAction>>,
}

impl ActionPipeline {
    /// A pipeline with no actions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve and configure every spec, in order.
    ///
    /// On failure nothing is returned; the actions created so far are
    /// dropped without being initialized.
    pub fn build(specs: &[ActionSpec], ctx: &TriggerContext) -> Result<Self, ActionError> {
        let mut actions = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let wrap = |source: ActionError| ActionError::Build {
                index,
                class: spec.class.clone(),
                source: Box::new(source),
            };
            let mut action = ctx.registry().create(&spec.class).map_err(wrap)?;
            action.configure(ctx, &spec.properties).map_err(wrap)?;
            tracing::debug!(class = %spec.class, action = %action.name(), "configured action");
            actions.push(action);
        }
        Ok(Self { actions })
    }

    /// Initialize every action in order, stopping at the first failure.
    pub fn init(&self) -> Result<(), ActionError> {
        for action in &self.actions {
            action.init()?;
        }
        Ok(())
    }

    /// Run `event` through every action in order, stopping at the first failure.
    pub fn process(&self, event: &TriggerEvent) -> Result<(), ActionError> {
        for action in &self.actions {
            action.process(event)?;
        }
        Ok(())
    }

    /// Close every action, even if some fail. Returns the failures.
    pub fn close(&self) -> Vec<ActionError> {
        let mut failures = Vec::new();
        for action in &self.actions {
            if let Err(e) = action.close() {
                tracing::warn!(action = %action.name(), "error closing action: {}", e);
                failures.push(e);
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action names, in pipeline order.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TriggerAction> {
        self.actions.iter().map(|a| a.as_ref())
    }
}

impl std::fmt::Debug for ActionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionPipeline")
            .field("actions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TriggerEventType;
    use crate::registry::ActionRegistry;
    use at_state::MemoryStateStore;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    /// Records every lifecycle call into a shared journal.
    struct RecordingAction {
        name: String,
        journal: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingAction {
        fn record(&self, call: &'static str) -> Result<(), String> {
            self.journal.lock().push(format!("{}:{}", call, self.name));
            if self.fail_on == Some(call) {
                return Err(format!("{} refused", call));
            }
            Ok(())
        }
    }

    impl TriggerAction for RecordingAction {
        fn name(&self) -> &str {
            &self.name
        }

        fn configure(
            &mut self,
            _ctx: &TriggerContext,
            properties: &PropertyMap,
        ) -> Result<(), ActionError> {
            if let Some(name) = properties.get("name").and_then(|v| v.as_str()) {
                self.name = name.to_string();
            }
            if let Some(fail_on) = properties.get("failOn").and_then(|v| v.as_str()) {
                self.fail_on = match fail_on {
                    "init" => Some("init"),
                    "process" => Some("process"),
                    "close" => Some("close"),
                    _ => None,
                };
            }
            self.record("configure").map_err(|reason| ActionError::Configure {
                action: self.name.clone(),
                reason,
            })
        }

        fn init(&self) -> Result<(), ActionError> {
            self.record("init").map_err(|reason| ActionError::Init {
                action: self.name.clone(),
                reason,
            })
        }

        fn process(&self, _event: &TriggerEvent) -> Result<(), ActionError> {
            self.record("process").map_err(|reason| ActionError::Process {
                action: self.name.clone(),
                reason,
            })
        }

        fn close(&self) -> Result<(), ActionError> {
            self.record("close").map_err(|reason| ActionError::Close {
                action: self.name.clone(),
                reason,
            })
        }
    }

    fn setup() -> (TriggerContext, Arc<Mutex<Vec<String>>>) {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let registry = ActionRegistry::with_builtins();
        let shared = Arc::clone(&journal);
        registry.register("Recording", move || {
            Box::new(RecordingAction {
                name: "recording".to_string(),
                journal: Arc::clone(&shared),
                fail_on: None,
            })
        });
        let ctx = TriggerContext::new(registry, Arc::new(MemoryStateStore::new()));
        (ctx, journal)
    }

    fn specs(value: Value) -> Vec<ActionSpec> {
        ActionSpec::parse_list(Some(&value)).unwrap()
    }

    #[test]
    fn parse_list_accepts_absent_and_null() {
        assert!(ActionSpec::parse_list(None).unwrap().is_empty());
        assert!(ActionSpec::parse_list(Some(&Value::Null)).unwrap().is_empty());
        assert!(ActionSpec::parse_list(Some(&json!([]))).unwrap().is_empty());
    }

    #[test]
    fn parse_list_rejects_malformed_entries() {
        assert!(matches!(
            ActionSpec::parse_list(Some(&json!("LogAction"))),
            Err(ActionError::NotAList(_))
        ));
        assert!(matches!(
            ActionSpec::parse_list(Some(&json!([{"class": "LogAction"}, {"name": "x"}]))),
            Err(ActionError::InvalidSpec { index: 1, .. })
        ));
        assert!(matches!(
            ActionSpec::parse_list(Some(&json!([42]))),
            Err(ActionError::InvalidSpec { index: 0, .. })
        ));
    }

    #[test]
    fn build_configures_actions_in_order() {
        let (ctx, journal) = setup();
        let pipeline = ActionPipeline::build(
            &specs(json!([
                {"class": "Recording", "name": "first"},
                {"class": "LogAction"},
                {"class": "Recording", "name": "second"}
            ])),
            &ctx,
        )
        .unwrap();

        assert_eq!(pipeline.names(), vec!["first", "LogAction", "second"]);
        assert_eq!(
            *journal.lock(),
            vec!["configure:first", "configure:second"]
        );
    }

    #[test]
    fn build_with_no_specs_is_empty() {
        let (ctx, _) = setup();
        let pipeline = ActionPipeline::build(&[], &ctx).unwrap();
        assert!(pipeline.is_empty());
        assert!(pipeline.close().is_empty());
    }

    #[test]
    fn unknown_class_aborts_build_naming_the_spec() {
        let (ctx, _) = setup();
        let err = ActionPipeline::build(
            &specs(json!([{"class": "LogAction"}, {"class": "Missing"}])),
            &ctx,
        )
        .unwrap_err();

        match err {
            ActionError::Build {
                index,
                class,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(class, "Missing");
                assert!(matches!(*source, ActionError::UnknownClass(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn configure_failure_aborts_build() {
        let (ctx, _) = setup();
        let err = ActionPipeline::build(
            &specs(json!([{"class": "LogAction", "bogus": true}])),
            &ctx,
        )
        .unwrap_err();
        assert!(err.to_string().contains("LogAction"));
    }

    #[test]
    fn init_is_fail_fast() {
        let (ctx, journal) = setup();
        let pipeline = ActionPipeline::build(
            &specs(json!([
                {"class": "Recording", "name": "a"},
                {"class": "Recording", "name": "b", "failOn": "init"},
                {"class": "Recording", "name": "c"}
            ])),
            &ctx,
        )
        .unwrap();
        journal.lock().clear();

        assert!(matches!(pipeline.init(), Err(ActionError::Init { action, .. }) if action == "b"));
        assert_eq!(*journal.lock(), vec!["init:a", "init:b"]);
    }

    #[test]
    fn process_runs_in_order() {
        let (ctx, journal) = setup();
        let pipeline = ActionPipeline::build(
            &specs(json!([
                {"class": "Recording", "name": "a"},
                {"class": "Recording", "name": "b", "failOn": "process"},
                {"class": "Recording", "name": "c"}
            ])),
            &ctx,
        )
        .unwrap();
        journal.lock().clear();

        let event = TriggerEvent::new(TriggerEventType::Manual, "t");
        assert!(pipeline.process(&event).is_err());
        assert_eq!(*journal.lock(), vec!["process:a", "process:b"]);
    }

    #[test]
    fn close_is_best_effort() {
        let (ctx, journal) = setup();
        let pipeline = ActionPipeline::build(
            &specs(json!([
                {"class": "Recording", "name": "a", "failOn": "close"},
                {"class": "Recording", "name": "b"}
            ])),
            &ctx,
        )
        .unwrap();
        journal.lock().clear();

        let failures = pipeline.close();
        assert_eq!(failures.len(), 1);
        assert_eq!(*journal.lock(), vec!["close:a", "close:b"]);
    }
}
