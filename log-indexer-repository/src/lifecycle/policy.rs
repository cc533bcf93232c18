//! Lifecycle policy documents.
//!
//! A policy is a small state machine the store's background lifecycle
//! manager walks for every backing index of a stream: each state carries
//! actions (rollover, delete) and transitions guarded by conditions such as
//! a minimum index age. The types here serialize to the store's policy
//! document and expose the transition table so the machine can be checked
//! without waiting for real time to pass.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::LifecycleError;
use log_indexer_shared::{ByteSize, TimeValue};

/// Default priority of the policy's index-pattern binding.
pub const DEFAULT_ISM_PRIORITY: u32 = 100;

/// Rollover parameters. Any satisfied threshold triggers a rollover.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<ByteSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_index_age: Option<TimeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
}

/// Delete the index. Serializes as an empty object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAction {}

/// An action performed when an index enters a state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "RawAction")]
pub enum Action {
    Rollover(RolloverAction),
    Delete(DeleteAction),
}

impl Action {
    pub fn rollover(min_index_age: Option<TimeValue>, min_size: Option<ByteSize>) -> Self {
        Self::Rollover(RolloverAction {
            min_size,
            min_index_age,
            min_doc_count: None,
        })
    }

    pub fn delete() -> Self {
        Self::Delete(DeleteAction {})
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete(_))
    }
}

// The store decorates stored actions with extra keys (`retry`, ...), so
// actions are read through a struct that ignores them.
#[derive(Deserialize)]
struct RawAction {
    #[serde(default)]
    rollover: Option<RolloverAction>,
    #[serde(default)]
    delete: Option<DeleteAction>,
}

impl TryFrom<RawAction> for Action {
    type Error = String;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        match (raw.rollover, raw.delete) {
            (Some(rollover), None) => Ok(Self::Rollover(rollover)),
            (None, Some(delete)) => Ok(Self::Delete(delete)),
            (None, None) => Err("action has no supported operation".to_string()),
            (Some(_), Some(_)) => Err("action names more than one operation".to_string()),
        }
    }
}

/// Conditions guarding a transition. All set conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_index_age: Option<TimeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<ByteSize>,
}

impl Conditions {
    pub fn min_index_age(age: TimeValue) -> Self {
        Self {
            min_index_age: Some(age),
            ..Default::default()
        }
    }

    fn satisfied_by(&self, facts: &IndexFacts) -> bool {
        let age_ok = self
            .min_index_age
            .map_or(true, |min| facts.age >= min.as_duration());
        let docs_ok = self.min_doc_count.map_or(true, |min| facts.doc_count >= min);
        let size_ok = self
            .min_size
            .map_or(true, |min| facts.size_bytes >= min.as_bytes());
        age_ok && docs_ok && size_ok
    }
}

/// Edge from one state to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub state_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
}

impl Transition {
    pub fn to(state_name: impl Into<String>, conditions: Option<Conditions>) -> Self {
        Self {
            state_name: state_name.into(),
            conditions,
        }
    }
}

/// A named state with its actions and outgoing transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub name: String,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// A state that deletes the index and never leaves.
    pub fn is_terminal(&self) -> bool {
        self.transitions.is_empty()
    }

    fn deletes(&self) -> bool {
        self.actions.iter().any(Action::is_delete)
    }
}

/// Binds a policy to newly created indices by name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsmTemplate {
    pub index_patterns: Vec<String>,
    #[serde(default)]
    pub priority: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(IsmTemplate),
    Many(Vec<IsmTemplate>),
}

fn ism_templates<'de, D>(deserializer: D) -> Result<Vec<IsmTemplate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(template)) => vec![template],
        Some(OneOrMany::Many(templates)) => templates,
    })
}

/// Observable facts about a backing index, used to evaluate transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexFacts {
    pub age: Duration,
    pub doc_count: u64,
    pub size_bytes: u64,
}

impl IndexFacts {
    pub fn aged(age: Duration) -> Self {
        Self {
            age,
            ..Default::default()
        }
    }
}

/// One row of a policy's transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEdge {
    pub from: String,
    pub to: String,
    pub conditions: Option<Conditions>,
}

/// A validated lifecycle policy.
///
/// Build one with [`Policy::define`] (or [`Policy::rollover_then_delete`]);
/// both reject structurally invalid state machines before anything reaches
/// the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "policy_id", default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub default_state: String,
    pub states: Vec<State>,
    #[serde(
        default,
        deserialize_with = "ism_templates",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ism_template: Vec<IsmTemplate>,
}

impl Policy {
    /// Define and validate a policy.
    ///
    /// The default state names the single initial state. The policy is
    /// bound to indices matching its own id.
    pub fn define(
        id: impl Into<String>,
        description: impl Into<String>,
        default_state: impl Into<String>,
        states: Vec<State>,
    ) -> Result<Self, LifecycleError> {
        let id = id.into();
        let policy = Self {
            ism_template: vec![IsmTemplate {
                index_patterns: vec![id.clone()],
                priority: DEFAULT_ISM_PRIORITY,
            }],
            id,
            description: description.into(),
            default_state: default_state.into(),
            states,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// The standard two-state retention policy: roll the write index over
    /// once it reaches `rollover_age` or `rollover_size`, delete it once it
    /// is `retention` old.
    pub fn rollover_then_delete(
        id: impl Into<String>,
        rollover_age: TimeValue,
        rollover_size: Option<ByteSize>,
        retention: TimeValue,
    ) -> Result<Self, LifecycleError> {
        let id = id.into();
        let description = format!("Lifecycle policy for data stream {}", id);
        let rollover = State::new("rollover")
            .with_action(Action::rollover(Some(rollover_age), rollover_size))
            .with_transition(Transition::to(
                "delete",
                Some(Conditions::min_index_age(retention)),
            ));
        let delete = State::new("delete").with_action(Action::delete());

        Self::define(id, description, "rollover", vec![rollover, delete])
    }

    /// Replace the index-pattern binding.
    pub fn with_ism_template(mut self, index_patterns: Vec<String>, priority: u32) -> Self {
        self.ism_template = vec![IsmTemplate {
            index_patterns,
            priority,
        }];
        self
    }

    /// Check the structural invariants of the state machine.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        let invalid = |reason: String| LifecycleError::invalid_policy(&self.id, reason);

        if self.id.trim().is_empty() {
            return Err(invalid("policy id must not be empty".to_string()));
        }
        if self.states.is_empty() {
            return Err(invalid("policy must define at least one state".to_string()));
        }

        let mut names = HashSet::new();
        for state in &self.states {
            if state.name.trim().is_empty() {
                return Err(invalid("state names must not be empty".to_string()));
            }
            if !names.insert(state.name.as_str()) {
                return Err(invalid(format!("duplicate state '{}'", state.name)));
            }
        }

        if !names.contains(self.default_state.as_str()) {
            return Err(invalid(format!(
                "default state '{}' is not defined",
                self.default_state
            )));
        }

        for state in &self.states {
            for transition in &state.transitions {
                if !names.contains(transition.state_name.as_str()) {
                    return Err(invalid(format!(
                        "state '{}' transitions to undefined state '{}'",
                        state.name, transition.state_name
                    )));
                }
            }
            if state.deletes() && !state.transitions.is_empty() {
                return Err(invalid(format!(
                    "delete state '{}' must not have outgoing transitions",
                    state.name
                )));
            }
        }

        if let Some(state) = self.find_cycle() {
            return Err(invalid(format!("transition cycle through state '{}'", state)));
        }

        Ok(())
    }

    fn find_cycle(&self) -> Option<&str> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            name: &'a str,
            edges: &HashMap<&'a str, Vec<&'a str>>,
            marks: &mut HashMap<&'a str, Mark>,
        ) -> Option<&'a str> {
            match marks.get(name) {
                Some(Mark::Visiting) => return Some(name),
                Some(Mark::Done) => return None,
                None => {}
            }
            marks.insert(name, Mark::Visiting);
            for &next in edges.get(name).into_iter().flatten() {
                if let Some(found) = visit(next, edges, marks) {
                    return Some(found);
                }
            }
            marks.insert(name, Mark::Done);
            None
        }

        let edges: HashMap<&str, Vec<&str>> = self
            .states
            .iter()
            .map(|state| {
                let targets = state
                    .transitions
                    .iter()
                    .map(|t| t.state_name.as_str())
                    .collect();
                (state.name.as_str(), targets)
            })
            .collect();

        let mut marks = HashMap::new();
        self.states
            .iter()
            .find_map(|state| visit(&state.name, &edges, &mut marks))
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|state| state.name == name)
    }

    pub fn initial_state(&self) -> Option<&State> {
        self.state(&self.default_state)
    }

    /// Every transition of the policy, in declaration order.
    pub fn transition_table(&self) -> Vec<TransitionEdge> {
        self.states
            .iter()
            .flat_map(|state| {
                state.transitions.iter().map(move |t| TransitionEdge {
                    from: state.name.clone(),
                    to: t.state_name.clone(),
                    conditions: t.conditions.clone(),
                })
            })
            .collect()
    }

    /// States with no outgoing transitions.
    pub fn terminal_states(&self) -> Vec<&State> {
        self.states.iter().filter(|s| s.is_terminal()).collect()
    }

    /// The state an index in `current` moves to given `facts`, if any.
    ///
    /// Transitions are tried in declaration order and the first one whose
    /// conditions hold wins, as the store's lifecycle manager does.
    pub fn next_state(&self, current: &str, facts: &IndexFacts) -> Option<&str> {
        self.state(current)?
            .transitions
            .iter()
            .find(|t| t.conditions.as_ref().map_or(true, |c| c.satisfied_by(facts)))
            .map(|t| t.state_name.as_str())
    }

    /// Whether the rollover action of `state` would fire for `facts`.
    pub fn rollover_due(&self, state: &str, facts: &IndexFacts) -> bool {
        let Some(state) = self.state(state) else {
            return false;
        };
        state.actions.iter().any(|action| match action {
            Action::Rollover(rollover) => {
                rollover
                    .min_index_age
                    .is_some_and(|min| facts.age >= min.as_duration())
                    || rollover
                        .min_size
                        .is_some_and(|min| facts.size_bytes >= min.as_bytes())
                    || rollover.min_doc_count.is_some_and(|min| facts.doc_count >= min)
            }
            Action::Delete(_) => false,
        })
    }
}
