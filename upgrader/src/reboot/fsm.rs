//! Finite state machine for the maintenance pass

use serde::{Deserialize, Serialize};

/// Maintenance state of one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootState {
    /// Initial state, configuration not yet saved
    Idle,

    /// Configuration persisted, safe to reload
    ConfigSaved,

    /// Reload acknowledged, device going down
    RebootIssued,

    /// Device answered a liveness probe after the reload
    Reachable,

    /// Budget exhausted without a successful probe
    TimedOut,
}

/// Maintenance event
#[derive(Debug, Clone)]
pub enum RebootEvent {
    /// Configuration saved
    CommitConfig,

    /// Reload sent and acknowledged
    IssueReboot,

    /// A liveness probe succeeded
    Recovered,

    /// The recovery budget ran out
    BudgetExhausted,
}

/// Per-device reboot FSM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootFsm {
    state: RebootState,
}

impl RebootFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: RebootState::Idle,
        }
    }

    /// Get current state
    pub fn state(&self) -> &RebootState {
        &self.state
    }

    /// Whether the maintenance pass has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RebootState::Reachable | RebootState::TimedOut)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: RebootEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            // Saving config is idempotent
            (RebootState::Idle, RebootEvent::CommitConfig) => RebootState::ConfigSaved,
            (RebootState::ConfigSaved, RebootEvent::CommitConfig) => RebootState::ConfigSaved,

            (RebootState::ConfigSaved, RebootEvent::IssueReboot) => RebootState::RebootIssued,

            (RebootState::RebootIssued, RebootEvent::Recovered) => RebootState::Reachable,
            (RebootState::RebootIssued, RebootEvent::BudgetExhausted) => RebootState::TimedOut,

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for RebootFsm {
    fn default() -> Self {
        Self::new()
    }
}
