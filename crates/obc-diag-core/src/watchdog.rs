//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Cycle continuity watchdog (fault 0x0A)."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use tracing::warn;

use crate::detector::{Detector, RestartLatch};
use crate::fault::FaultCode;
use crate::model::{FaultStatus, TelemetrySample};
use crate::session::SessionContext;
use crate::thresholds::WatchdogLatch;

/// Result of comparing a cycle id against the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleCadence {
    First,
    OnTime,
    Jump(u64),
    /// Repeated or backwards cycle id; treated as a violation.
    NonMonotonic { previous: u64 },
}

#[derive(Debug, Clone)]
pub struct WatchdogMonitor {
    max_gap: u64,
    latch_mode: WatchdogLatch,
    last_cycle: Option<u64>,
    status: FaultStatus,
    latch: RestartLatch,
    tripped: bool,
}

impl WatchdogMonitor {
    pub fn new(max_gap: u64, latch_mode: WatchdogLatch) -> Self {
        Self {
            max_gap,
            latch_mode,
            last_cycle: None,
            status: FaultStatus::Clear,
            latch: RestartLatch::default(),
            tripped: false,
        }
    }

    pub fn with_latch(mut self, latch: RestartLatch) -> Self {
        self.latch = latch;
        self
    }

    #[cfg(test)]
    pub(crate) fn last_cycle(&self) -> Option<u64> {
        self.last_cycle
    }

    pub fn cadence(&self, cycle: u64) -> CycleCadence {
        match self.last_cycle {
            None => CycleCadence::First,
            Some(previous) if cycle <= previous => CycleCadence::NonMonotonic { previous },
            Some(previous) => {
                let gap = cycle - previous;
                if gap > self.max_gap {
                    CycleCadence::Jump(gap)
                } else {
                    CycleCadence::OnTime
                }
            }
        }
    }
}

impl Detector for WatchdogMonitor {
    fn code(&self) -> FaultCode {
        FaultCode::Watchdog
    }

    fn status(&self) -> FaultStatus {
        self.status
    }

    fn evaluate(&mut self, sample: &TelemetrySample, _session: &SessionContext) -> FaultStatus {
        let cadence = self.cadence(sample.cycle);
        self.last_cycle = Some(sample.cycle);
        self.tripped = matches!(
            cadence,
            CycleCadence::Jump(_) | CycleCadence::NonMonotonic { .. }
        );

        match cadence {
            CycleCadence::Jump(gap) => {
                warn!(cycle = sample.cycle, gap, max_gap = self.max_gap, "cycle gap exceeds watchdog limit");
                self.latch.confirm(&mut self.status);
            }
            CycleCadence::NonMonotonic { previous } => {
                warn!(cycle = sample.cycle, previous, "non-monotonic cycle id; failing closed");
                self.latch.confirm(&mut self.status);
            }
            CycleCadence::First | CycleCadence::OnTime => {
                if self.latch_mode == WatchdogLatch::SelfClearing && !self.latch.is_latched() {
                    self.status = FaultStatus::Clear;
                }
            }
        }
        self.status
    }

    fn reset(&mut self) {
        if !self.latch.is_latched() {
            self.status = FaultStatus::Clear;
        }
    }

    fn is_catastrophic(&self) -> bool {
        true
    }

    fn is_latched(&self) -> bool {
        self.latch.is_latched()
    }

    fn violated(&self) -> bool {
        self.tripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlugInfo, SeqState};
    use crate::session::SessionState;

    fn at(cycle: u64) -> TelemetrySample {
        TelemetrySample {
            cycle,
            seq_state: SeqState::Charging,
            plug_info: PlugInfo::PluggedPaid,
            flag_stop: false,
            flag_relay: true,
            ia: 16,
            ib: 16,
            ic: 16,
            fault_state: 0,
            charge_count: 30,
            real_battery_voltage: 4000,
            expected_battery_voltage: 4000,
            temperature: 25,
            can_msg_received: true,
            iso_resistance: 800_000,
        }
    }

    fn ctx() -> SessionContext {
        SessionContext {
            state: SessionState::Charging,
            transition: None,
        }
    }

    #[test]
    fn gap_of_exactly_limit_is_tolerated() {
        let mut watchdog = WatchdogMonitor::new(10, WatchdogLatch::UntilReset);
        assert_eq!(watchdog.evaluate(&at(1), &ctx()), FaultStatus::Clear);
        assert_eq!(watchdog.evaluate(&at(11), &ctx()), FaultStatus::Clear);
        assert_eq!(watchdog.evaluate(&at(22), &ctx()), FaultStatus::Confirmed);
        assert_eq!(watchdog.last_cycle(), Some(22));
    }

    #[test]
    fn latch_holds_until_reset() {
        let mut watchdog = WatchdogMonitor::new(10, WatchdogLatch::UntilReset);
        watchdog.evaluate(&at(57), &ctx());
        assert_eq!(watchdog.evaluate(&at(70), &ctx()), FaultStatus::Confirmed);
        assert_eq!(watchdog.evaluate(&at(71), &ctx()), FaultStatus::Confirmed);
        watchdog.reset();
        assert_eq!(watchdog.evaluate(&at(72), &ctx()), FaultStatus::Clear);
    }

    #[test]
    fn self_clearing_latch_drops_on_next_normal_cycle() {
        let mut watchdog = WatchdogMonitor::new(10, WatchdogLatch::SelfClearing);
        watchdog.evaluate(&at(57), &ctx());
        assert_eq!(watchdog.evaluate(&at(70), &ctx()), FaultStatus::Confirmed);
        assert_eq!(watchdog.evaluate(&at(71), &ctx()), FaultStatus::Clear);
    }

    #[test]
    fn repeated_or_backwards_cycles_fail_closed() {
        let mut watchdog = WatchdogMonitor::new(10, WatchdogLatch::SelfClearing);
        watchdog.evaluate(&at(5), &ctx());
        assert_eq!(watchdog.cadence(5), CycleCadence::NonMonotonic { previous: 5 });
        assert_eq!(watchdog.evaluate(&at(5), &ctx()), FaultStatus::Confirmed);
        assert_eq!(watchdog.evaluate(&at(3), &ctx()), FaultStatus::Confirmed);
        assert_eq!(watchdog.evaluate(&at(4), &ctx()), FaultStatus::Clear);
    }

    #[test]
    fn every_violation_is_reported_even_while_confirmed() {
        let mut watchdog = WatchdogMonitor::new(10, WatchdogLatch::UntilReset);
        watchdog.evaluate(&at(1), &ctx());
        assert!(!watchdog.violated());
        watchdog.evaluate(&at(20), &ctx());
        assert!(watchdog.violated());
        watchdog.evaluate(&at(21), &ctx());
        assert!(!watchdog.violated());
        assert_eq!(watchdog.evaluate(&at(21), &ctx()), FaultStatus::Confirmed);
        assert!(watchdog.violated());
    }
}
