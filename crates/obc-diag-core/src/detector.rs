//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Debounce state machine shared by the fault detectors."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use std::fmt;

use crate::fault::FaultCode;
use crate::model::{FaultStatus, PlugInfo, TelemetrySample};
use crate::rules::Trigger;
use crate::session::{SessionContext, SessionState};

/// A per-code fault detector owned by one engine instance.
pub trait Detector: Send + fmt::Debug {
    fn code(&self) -> FaultCode;

    fn status(&self) -> FaultStatus;

    /// Evaluate one cycle and return the resulting status.
    fn evaluate(&mut self, sample: &TelemetrySample, session: &SessionContext) -> FaultStatus;

    /// Session passed RESET -> INIT.
    fn reset(&mut self);

    /// Whether a confirmation must force FAULT on the same cycle.
    fn is_catastrophic(&self) -> bool {
        false
    }

    /// Latched across RESET because the fault recurred too often.
    fn is_latched(&self) -> bool {
        false
    }

    /// The last evaluated sample violated a catastrophic condition, whether
    /// or not the status was already Confirmed.
    fn violated(&self) -> bool {
        false
    }
}

/// Session phases in which a detector may qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseGate {
    Any,
    Charging,
    Wait,
}

impl PhaseGate {
    pub fn admits(self, state: SessionState) -> bool {
        match self {
            PhaseGate::Any => true,
            PhaseGate::Charging => state == SessionState::Charging,
            PhaseGate::Wait => state == SessionState::Wait,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Confirmed on the first qualifying cycle.
    Immediate,
    /// Confirmed after `threshold` consecutive qualifying cycles.
    Debounced { threshold: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCondition {
    PaymentCompleted,
    ChargingStarted,
}

impl RecoveryCondition {
    pub fn observed(self, sample: &TelemetrySample, session: &SessionContext) -> bool {
        match self {
            RecoveryCondition::PaymentCompleted => sample.plug_info == PlugInfo::PluggedPaid,
            RecoveryCondition::ChargingStarted => session.charging_started(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearingPolicy {
    /// Sticky until the session passes RESET -> INIT.
    UntilReset,
    /// Also cleared as soon as the condition is observed.
    OnCondition(RecoveryCondition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorPolicy {
    pub gate: PhaseGate,
    pub confirmation: Confirmation,
    pub clearing: ClearingPolicy,
}

/// Confirmation count and restart-inhibit latch shared by every detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestartLatch {
    confirmations: u32,
    inhibit_after: Option<u32>,
    latched: bool,
}

impl RestartLatch {
    /// Latch once the fault has been confirmed `after` times; `None` never latches.
    pub fn new(inhibit_after: Option<u32>) -> Self {
        Self {
            confirmations: 0,
            inhibit_after,
            latched: false,
        }
    }

    /// Move `status` to Confirmed, counting the confirmation only when it is new.
    pub fn confirm(&mut self, status: &mut FaultStatus) {
        if *status != FaultStatus::Confirmed {
            self.confirmations = self.confirmations.saturating_add(1);
            if self
                .inhibit_after
                .is_some_and(|after| self.confirmations >= after)
            {
                self.latched = true;
            }
        }
        *status = FaultStatus::Confirmed;
    }

    #[cfg(test)]
    pub(crate) fn confirmations(&self) -> u32 {
        self.confirmations
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }
}

/// Predicate-driven detector with a consecutive-cycle debounce counter.
#[derive(Debug, Clone)]
pub struct FaultDetector {
    code: FaultCode,
    trigger: Trigger,
    policy: DetectorPolicy,
    counter: u32,
    status: FaultStatus,
    latch: RestartLatch,
}

impl FaultDetector {
    pub fn new(code: FaultCode, trigger: Trigger, policy: DetectorPolicy) -> Self {
        Self {
            code,
            trigger,
            policy,
            counter: 0,
            status: FaultStatus::Clear,
            latch: RestartLatch::default(),
        }
    }

    pub fn with_latch(mut self, latch: RestartLatch) -> Self {
        self.latch = latch;
        self
    }

    #[cfg(test)]
    pub(crate) fn counter(&self) -> u32 {
        self.counter
    }

    #[cfg(test)]
    pub(crate) fn confirmations(&self) -> u32 {
        self.latch.confirmations()
    }

    fn confirm(&mut self) {
        self.latch.confirm(&mut self.status);
    }

    fn release(&mut self) {
        self.counter = 0;
        self.status = FaultStatus::Clear;
    }
}

impl Detector for FaultDetector {
    fn code(&self) -> FaultCode {
        self.code
    }

    fn status(&self) -> FaultStatus {
        self.status
    }

    fn evaluate(&mut self, sample: &TelemetrySample, session: &SessionContext) -> FaultStatus {
        if let ClearingPolicy::OnCondition(condition) = self.policy.clearing {
            if !self.latch.is_latched() && condition.observed(sample, session) {
                self.release();
                return self.status;
            }
        }

        let qualifies = self.policy.gate.admits(session.state) && self.trigger.holds(sample);
        if !qualifies {
            self.counter = 0;
            if self.status == FaultStatus::Diagnosed {
                self.status = FaultStatus::Clear;
            }
            return self.status;
        }

        match self.policy.confirmation {
            Confirmation::Immediate => self.confirm(),
            Confirmation::Debounced { threshold } => {
                self.counter = (self.counter + 1).min(threshold);
                if self.counter >= threshold {
                    self.confirm();
                } else if self.status == FaultStatus::Clear {
                    self.status = FaultStatus::Diagnosed;
                }
            }
        }
        self.status
    }

    fn reset(&mut self) {
        if self.latch.is_latched() {
            self.counter = 0;
        } else {
            self.release();
        }
    }

    fn is_latched(&self) -> bool {
        self.latch.is_latched()
    }
}
