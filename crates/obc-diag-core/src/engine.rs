//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Per-cycle diagnosis orchestration."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
use serde::Serialize;
use tracing::{debug, info};

use crate::detector::Detector;
use crate::error::Result;
use crate::fault::{FaultCode, FAULT_COUNT};
use crate::model::{FaultStatus, OutputRecord, TelemetrySample};
use crate::rules::build_detectors;
use crate::session::{SessionState, SessionStateMachine};
use crate::thresholds::FaultThresholds;

/// Status change of one fault code on one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaultTransition {
    pub cycle: u64,
    pub code: FaultCode,
    pub from: FaultStatus,
    pub to: FaultStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransitionKind {
    Detected,
    Confirmed,
    Cleared,
}

impl FaultTransition {
    pub fn kind(&self) -> TransitionKind {
        match self.to {
            FaultStatus::Clear => TransitionKind::Cleared,
            FaultStatus::Diagnosed => TransitionKind::Detected,
            FaultStatus::Confirmed => TransitionKind::Confirmed,
        }
    }
}

/// Everything produced for one input sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub record: OutputRecord,
    /// Session phase after the cycle, including a forced FAULT.
    pub session: SessionState,
    pub transitions: Vec<FaultTransition>,
    pub reset_applied: bool,
    /// Charger-reported `FaultState`, passed through untouched.
    pub advisory_fault_state: u8,
}

/// Diagnosis engine for one telemetry stream. Holds all mutable state of a
/// run; independent streams use independent engines.
#[derive(Debug)]
pub struct DiagnosticEngine {
    session: SessionStateMachine,
    detectors: Vec<Box<dyn Detector>>,
    last_statuses: [FaultStatus; FAULT_COUNT],
    cycles: u64,
}

impl DiagnosticEngine {
    pub fn new(thresholds: FaultThresholds) -> Result<Self> {
        thresholds.validate()?;
        let detectors = build_detectors(&thresholds);
        Ok(Self {
            session: SessionStateMachine::new(),
            detectors,
            last_statuses: [FaultStatus::Clear; FAULT_COUNT],
            cycles: 0,
        })
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn status(&self, code: FaultCode) -> FaultStatus {
        self.last_statuses[code.index()]
    }

    pub fn cycles_processed(&self) -> u64 {
        self.cycles
    }

    /// Diagnose one sample and return its output record.
    pub fn process(&mut self, sample: &TelemetrySample) -> OutputRecord {
        self.step(sample).record
    }

    /// Diagnose one sample, also reporting status transitions.
    ///
    /// Detectors run in code order 0x01 .. 0x0C. A watchdog violation forces
    /// FAULT as soon as 0x0A is evaluated, so on that cycle only 0x0B and
    /// 0x0C see the forced phase while 0x01 .. 0x09 see the reported one.
    /// Every violation forces FAULT again, including one raised while 0x0A
    /// is already Confirmed; such a repeat changes no status and therefore
    /// adds no transition. Other confirmations force FAULT once all
    /// detectors have run.
    pub fn step(&mut self, sample: &TelemetrySample) -> CycleOutcome {
        let mut context = self.session.advance(sample.seq_state);

        let reset_applied = context.reset_completed();
        if reset_applied {
            for detector in self.detectors.iter_mut() {
                detector.reset();
            }
            let latched: Vec<FaultCode> = self
                .detectors
                .iter()
                .filter(|detector| detector.is_latched())
                .map(|detector| detector.code())
                .collect();
            info!(cycle = sample.cycle, ?latched, "session reset; sticky faults released");
        }

        let mut statuses = [FaultStatus::Clear; FAULT_COUNT];
        let mut transitions = Vec::new();
        let mut newly_confirmed = None;

        for detector in self.detectors.iter_mut() {
            let code = detector.code();
            let before = self.last_statuses[code.index()];
            let status = detector.evaluate(sample, &context);
            statuses[code.index()] = status;

            if detector.is_catastrophic() && detector.violated() {
                self.session.force_fault(code);
                context.state = SessionState::Fault;
            }

            if status == before {
                continue;
            }
            let transition = FaultTransition {
                cycle: sample.cycle,
                code,
                from: before,
                to: status,
            };
            info!(
                cycle = sample.cycle,
                code = %code,
                name = code.name(),
                from = %before,
                to = %status,
                kind = ?transition.kind(),
                "fault status changed"
            );
            transitions.push(transition);

            if status == FaultStatus::Confirmed {
                newly_confirmed.get_or_insert(code);
            }
        }

        if let Some(code) = newly_confirmed {
            self.session.force_fault(code);
        }

        self.last_statuses = statuses;
        self.cycles += 1;

        let record = OutputRecord::new(sample.cycle, statuses);
        debug!(
            cycle = sample.cycle,
            session = %self.session.state(),
            advisory_fault_state = sample.fault_state,
            active = record.active().count(),
            "cycle diagnosed"
        );
        if sample.fault_state != 0 && record.active().next().is_none() {
            debug!(
                cycle = sample.cycle,
                advisory_fault_state = sample.fault_state,
                "charger reports a fault state with no active diagnosis"
            );
        }

        CycleOutcome {
            record,
            session: self.session.state(),
            transitions,
            reset_applied,
            advisory_fault_state: sample.fault_state,
        }
    }
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        let thresholds = FaultThresholds::default();
        let detectors = build_detectors(&thresholds);
        Self {
            session: SessionStateMachine::new(),
            detectors,
            last_statuses: [FaultStatus::Clear; FAULT_COUNT],
            cycles: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlugInfo, SeqState};
    use crate::thresholds::WatchdogLatch;

    fn charging(cycle: u64) -> TelemetrySample {
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
            charge_count: cycle as u32,
            real_battery_voltage: 4000,
            expected_battery_voltage: 4000,
            temperature: 25,
            can_msg_received: true,
            iso_resistance: 800_000,
        }
    }

    fn with_state(cycle: u64, seq_state: SeqState) -> TelemetrySample {
        TelemetrySample {
            seq_state,
            ia: 0,
            ib: 0,
            ic: 0,
            charge_count: 0,
            flag_stop: true,
            flag_relay: false,
            ..charging(cycle)
        }
    }

    fn column(records: &[OutputRecord], code: FaultCode) -> Vec<u8> {
        records.iter().map(|r| r.status(code).as_u8()).collect()
    }

    #[test]
    fn overcurrent_confirms_on_tenth_qualifying_cycle() {
        let mut engine = DiagnosticEngine::default();
        let mut records = Vec::new();
        for cycle in 1..=35 {
            let mut sample = charging(cycle);
            sample.ia = 32;
            records.push(engine.process(&sample));
        }
        for cycle in 36..=47 {
            let mut sample = charging(cycle);
            sample.ia = 33;
            records.push(engine.process(&sample));
        }
        let statuses = column(&records, FaultCode::Overcurrent);
        assert!(statuses[..35].iter().all(|s| *s == 0));
        assert!(statuses[35..44].iter().all(|s| *s == 1));
        assert!(statuses[44..].iter().all(|s| *s == 2));
    }

    #[test]
    fn relay_fault_confirms_on_the_same_cycle() {
        let mut engine = DiagnosticEngine::default();
        engine.process(&charging(1));
        let mut sample = charging(2);
        sample.flag_relay = false;
        sample.flag_stop = false;
        let outcome = engine.step(&sample);
        assert_eq!(outcome.record.status(FaultCode::RelayFault), FaultStatus::Confirmed);
        assert_eq!(outcome.session, SessionState::Fault);
        assert_eq!(outcome.transitions.len(), 1);
        assert_eq!(outcome.transitions[0].kind(), TransitionKind::Confirmed);
        assert_eq!(outcome.transitions[0].from, FaultStatus::Clear);
    }

    #[test]
    fn can_loss_confirms_on_fifth_cycle_and_holds() {
        let mut engine = DiagnosticEngine::default();
        let mut records = Vec::new();
        for cycle in 1..=3 {
            records.push(engine.process(&charging(cycle)));
        }
        for cycle in 4..=10 {
            let mut sample = charging(cycle);
            sample.can_msg_received = false;
            records.push(engine.process(&sample));
        }
        for cycle in 11..=12 {
            records.push(engine.process(&charging(cycle)));
        }
        assert_eq!(
            column(&records, FaultCode::CanLoss),
            vec![0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 2]
        );
    }

    #[test]
    fn watchdog_jump_forces_fault_on_same_cycle() {
        let mut engine = DiagnosticEngine::default();
        engine.process(&charging(57));
        let outcome = engine.step(&charging(70));
        assert_eq!(outcome.record.status(FaultCode::Watchdog), FaultStatus::Confirmed);
        assert_eq!(outcome.session, SessionState::Fault);
        let next = engine.process(&charging(71));
        assert_eq!(next.status(FaultCode::Watchdog), FaultStatus::Confirmed);
    }

    #[test]
    fn self_clearing_watchdog_reports_only_the_violating_cycle() {
        let thresholds = FaultThresholds {
            watchdog_latch: WatchdogLatch::SelfClearing,
            ..FaultThresholds::default()
        };
        let mut engine = DiagnosticEngine::new(thresholds).unwrap();
        let statuses: Vec<u8> = [55, 56, 57, 70, 71, 72]
            .into_iter()
            .map(|cycle| engine.process(&charging(cycle)).status(FaultCode::Watchdog).as_u8())
            .collect();
        assert_eq!(statuses, vec![0, 0, 0, 2, 0, 0]);
    }

    #[test]
    fn sticky_faults_release_on_reset_to_init() {
        let mut engine = DiagnosticEngine::default();
        let mut relay = charging(1);
        relay.flag_relay = false;
        relay.flag_stop = false;
        assert_eq!(engine.process(&relay).status(FaultCode::RelayFault), FaultStatus::Confirmed);
        assert_eq!(engine.process(&charging(2)).status(FaultCode::RelayFault), FaultStatus::Confirmed);
        assert_eq!(
            engine.process(&with_state(3, SeqState::Fault)).status(FaultCode::RelayFault),
            FaultStatus::Confirmed
        );
        assert_eq!(
            engine.process(&with_state(4, SeqState::Reset)).status(FaultCode::RelayFault),
            FaultStatus::Confirmed
        );
        let outcome = engine.step(&with_state(5, SeqState::Init));
        assert!(outcome.reset_applied);
        assert_eq!(outcome.record.status(FaultCode::RelayFault), FaultStatus::Clear);
        assert_eq!(outcome.transitions[0].kind(), TransitionKind::Cleared);
    }

    #[test]
    fn charging_only_detectors_stay_clear_outside_charging() {
        let mut engine = DiagnosticEngine::default();
        for cycle in 1..=30 {
            let mut sample = with_state(cycle, SeqState::Init);
            sample.ia = 50;
            sample.temperature = 130;
            sample.charge_count = 40;
            sample.real_battery_voltage = 4200;
            let record = engine.process(&sample);
            for code in [
                FaultCode::Overcurrent,
                FaultCode::Undercurrent,
                FaultCode::BmsDeviation,
                FaultCode::OverTemperature,
                FaultCode::TemperatureSensor,
            ] {
                assert_eq!(record.status(code), FaultStatus::Clear, "{code}");
            }
        }
    }

    #[test]
    fn payment_timeout_clears_when_paid() {
        let mut engine = DiagnosticEngine::default();
        let mut records = Vec::new();
        for cycle in 1..=6 {
            let mut sample = with_state(cycle, SeqState::Wait);
            sample.plug_info = PlugInfo::PluggedUnpaid;
            records.push(engine.process(&sample));
        }
        let mut paid = with_state(7, SeqState::Wait);
        paid.plug_info = PlugInfo::PluggedPaid;
        records.push(engine.process(&paid));
        assert_eq!(
            column(&records, FaultCode::PaymentTimeout),
            vec![1, 1, 1, 1, 2, 2, 0]
        );
    }

    #[test]
    fn sequence_timeout_clears_on_charging_start() {
        let mut engine = DiagnosticEngine::default();
        let mut records = Vec::new();
        for cycle in 1..=12 {
            let mut sample = with_state(cycle, SeqState::Wait);
            sample.plug_info = PlugInfo::PluggedPaid;
            records.push(engine.process(&sample));
        }
        records.push(engine.process(&charging(13)));
        let statuses = column(&records, FaultCode::SequenceTimeout);
        assert_eq!(statuses[8], 1);
        assert_eq!(statuses[9], 2);
        assert_eq!(statuses[11], 2);
        assert_eq!(statuses[12], 0);
    }

    #[test]
    fn invalid_calibration_is_rejected() {
        let thresholds = FaultThresholds {
            watchdog_max_gap: 0,
            ..FaultThresholds::default()
        };
        assert!(DiagnosticEngine::new(thresholds).is_err());
    }

    #[test]
    fn independent_engines_do_not_share_state() {
        let mut first = DiagnosticEngine::default();
        let mut second = DiagnosticEngine::default();
        let mut lost = charging(1);
        lost.can_msg_received = false;
        first.process(&lost);
        assert_eq!(first.status(FaultCode::CanLoss), FaultStatus::Diagnosed);
        assert_eq!(second.process(&charging(1)).status(FaultCode::CanLoss), FaultStatus::Clear);
        assert_eq!(first.cycles_processed(), 1);
    }

    #[test]
    fn repeated_or_backwards_cycle_confirms_watchdog_and_forces_fault() {
        let mut engine = DiagnosticEngine::default();
        for cycle in 1..=3 {
            engine.process(&charging(cycle));
        }

        let repeated = engine.step(&charging(3));
        assert_eq!(repeated.record.status(FaultCode::Watchdog), FaultStatus::Confirmed);
        assert_eq!(repeated.record.to_fields()[FaultCode::Watchdog.index() + 1], "2");
        assert_eq!(repeated.session, SessionState::Fault);
        assert_eq!(
            repeated.transitions,
            vec![FaultTransition {
                cycle: 3,
                code: FaultCode::Watchdog,
                from: FaultStatus::Clear,
                to: FaultStatus::Confirmed,
            }]
        );

        let next = engine.step(&charging(4));
        assert_eq!(next.session, SessionState::Charging);
        assert!(next.transitions.is_empty());

        let backwards = engine.step(&charging(2));
        assert_eq!(backwards.record.status(FaultCode::Watchdog), FaultStatus::Confirmed);
        assert_eq!(backwards.session, SessionState::Fault);
        assert!(backwards.transitions.is_empty());
    }

    #[test]
    fn second_jump_while_latched_forces_fault_again() {
        let mut engine = DiagnosticEngine::default();
        engine.process(&charging(57));
        assert_eq!(engine.step(&charging(70)).session, SessionState::Fault);
        assert_eq!(engine.step(&charging(71)).session, SessionState::Charging);

        let again = engine.step(&charging(90));
        assert_eq!(again.record.status(FaultCode::Watchdog), FaultStatus::Confirmed);
        assert_eq!(again.session, SessionState::Fault);
        assert_eq!(engine.session_state(), SessionState::Fault);
    }

    #[test]
    fn watchdog_forcing_reaches_only_later_detectors_on_its_cycle() {
        let mut engine = DiagnosticEngine::default();
        engine.process(&charging(1));
        let mut jump = charging(20);
        jump.ia = 40;
        jump.temperature = 130;
        let outcome = engine.step(&jump);
        assert_eq!(outcome.record.status(FaultCode::Watchdog), FaultStatus::Confirmed);
        assert_eq!(outcome.record.status(FaultCode::Overcurrent), FaultStatus::Diagnosed);
        assert_eq!(outcome.record.status(FaultCode::TemperatureSensor), FaultStatus::Clear);
    }
}
