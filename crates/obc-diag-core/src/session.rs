//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Charging session phase tracking."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! The session phase follows the charger-reported `SeqState`. A fault
//! confirmation forces FAULT until the next sample is applied, and the
//! RESET -> INIT progression is what releases sticky faults.
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::fault::FaultCode;
use crate::model::SeqState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    #[default]
    Init,
    Wait,
    Charging,
    Fault,
    Reset,
}

impl From<SeqState> for SessionState {
    fn from(state: SeqState) -> Self {
        match state {
            SeqState::Init => SessionState::Init,
            SeqState::Wait => SessionState::Wait,
            SeqState::Charging => SessionState::Charging,
            SeqState::Fault => SessionState::Fault,
            SeqState::Reset => SessionState::Reset,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Init => "INIT",
            SessionState::Wait => "WAIT",
            SessionState::Charging => "CHARGING",
            SessionState::Fault => "FAULT",
            SessionState::Reset => "RESET",
        };
        f.write_str(label)
    }
}

/// Change between two consecutive charger-reported phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: SeqState,
    pub to: SeqState,
}

impl PhaseTransition {
    pub fn is(&self, from: SeqState, to: SeqState) -> bool {
        self.from == from && self.to == to
    }
}

/// Session view handed to every detector for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    pub state: SessionState,
    pub transition: Option<PhaseTransition>,
}

impl SessionContext {
    pub fn charging_started(&self) -> bool {
        self.transition
            .is_some_and(|t| t.is(SeqState::Wait, SeqState::Charging))
    }

    pub fn reset_completed(&self) -> bool {
        self.transition
            .is_some_and(|t| t.is(SeqState::Reset, SeqState::Init))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionStateMachine {
    state: SessionState,
    reported: Option<SeqState>,
    forced_by: Option<FaultCode>,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn forced_by(&self) -> Option<FaultCode> {
        self.forced_by
    }

    /// Apply the phase reported by the next sample.
    pub fn advance(&mut self, reported: SeqState) -> SessionContext {
        let transition = self
            .reported
            .filter(|previous| *previous != reported)
            .map(|from| PhaseTransition { from, to: reported });

        if let Some(code) = self.forced_by.take() {
            if reported == SeqState::Charging {
                warn!(fault = %code, "charger still reports CHARGING after a confirmed fault");
            }
        }

        let previous = self.state;
        self.state = reported.into();
        self.reported = Some(reported);
        if previous != self.state {
            debug!(from = %previous, to = %self.state, "session phase changed");
        }

        SessionContext {
            state: self.state,
            transition,
        }
    }

    pub fn force_fault(&mut self, code: FaultCode) {
        if self.state != SessionState::Fault {
            info!(fault = %code, name = code.name(), from = %self.state, "fault confirmed; session forced to FAULT");
        }
        self.state = SessionState::Fault;
        self.forced_by.get_or_insert(code);
    }
}
