//! Lifecycle policies: the rollover/retention state machine and the engine
//! that registers it with the store.

mod engine;
mod policy;

pub use engine::{PolicyEngine, Registration};
pub use policy::{
    Action, Conditions, DeleteAction, IndexFacts, IsmTemplate, Policy, RolloverAction, State,
    Transition, TransitionEdge, DEFAULT_ISM_PRIORITY,
};
