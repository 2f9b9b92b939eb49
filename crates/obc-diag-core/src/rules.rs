//! ---
//! obc_section: "02-diagnosis-core"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Fault trigger predicates and the detector table."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! Trigger predicates for the eleven predicate-driven fault codes plus the
//! table that wires each code to its phase gate, debounce and clearing
//! policy. The watchdog (0x0A) is built from [`crate::watchdog`].
use crate::detector::{
    ClearingPolicy, Confirmation, Detector, DetectorPolicy, FaultDetector, PhaseGate,
    RecoveryCondition, RestartLatch,
};
use crate::fault::FaultCode;
use crate::model::{PlugInfo, SeqState, TelemetrySample};
use crate::thresholds::FaultThresholds;
use crate::watchdog::WatchdogMonitor;

/// Sample-level condition tested by a [`FaultDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Overcurrent {
        limit: i32,
    },
    Undercurrent {
        floor: i32,
        min_charge_count: u32,
    },
    PlugLoss,
    RelayOpen,
    BmsDeviation {
        min_charge_count: u32,
        max_deviation: u32,
    },
    OverTemperature {
        limit: i32,
    },
    CanLoss,
    Insulation {
        min_ohms: u32,
    },
    PaymentPending,
    SequenceStall,
    /// Reading outside the plausible sensor range `low ..= high`.
    TemperatureSpike {
        high: i32,
        low: i32,
    },
}

impl Trigger {
    pub fn holds(&self, sample: &TelemetrySample) -> bool {
        match *self {
            Trigger::Overcurrent { limit } => sample.max_current() > limit,
            Trigger::Undercurrent {
                floor,
                min_charge_count,
            } => sample.charge_count > min_charge_count && sample.max_current() < floor,
            Trigger::PlugLoss => sample.plug_info == PlugInfo::Unplugged,
            Trigger::RelayOpen => !sample.flag_relay && !sample.flag_stop,
            Trigger::BmsDeviation {
                min_charge_count,
                max_deviation,
            } => {
                sample.charge_count > min_charge_count
                    && sample.voltage_deviation() > max_deviation
            }
            Trigger::OverTemperature { limit } => sample.temperature > limit,
            Trigger::CanLoss => !sample.can_msg_received,
            Trigger::Insulation { min_ohms } => sample.iso_resistance < min_ohms,
            Trigger::PaymentPending => {
                sample.seq_state != SeqState::Charging
                    && sample.plug_info == PlugInfo::PluggedUnpaid
            }
            Trigger::SequenceStall => sample.seq_state == SeqState::Wait,
            Trigger::TemperatureSpike { high, low } => {
                sample.temperature > high || sample.temperature < low
            }
        }
    }
}

/// One row of the predicate-driven fault table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRule {
    pub code: FaultCode,
    pub trigger: Trigger,
    pub policy: DetectorPolicy,
}

impl FaultRule {
    pub fn detector(&self) -> FaultDetector {
        FaultDetector::new(self.code, self.trigger, self.policy)
    }
}

fn debounced(thresholds: &FaultThresholds, code: FaultCode) -> Confirmation {
    match thresholds.debounce.for_code(code) {
        Some(threshold) => Confirmation::Debounced { threshold },
        None => Confirmation::Immediate,
    }
}

fn rule(
    code: FaultCode,
    trigger: Trigger,
    gate: PhaseGate,
    confirmation: Confirmation,
    clearing: ClearingPolicy,
) -> FaultRule {
    FaultRule {
        code,
        trigger,
        policy: DetectorPolicy {
            gate,
            confirmation,
            clearing,
        },
    }
}

/// Predicate-driven rules in code order, 0x0A excluded.
pub fn fault_table(thresholds: &FaultThresholds) -> Vec<FaultRule> {
    use ClearingPolicy::{OnCondition, UntilReset};
    use FaultCode::*;

    vec![
        rule(
            Overcurrent,
            Trigger::Overcurrent {
                limit: thresholds.rated_current_limit,
            },
            PhaseGate::Charging,
            debounced(thresholds, Overcurrent),
            UntilReset,
        ),
        rule(
            Undercurrent,
            Trigger::Undercurrent {
                floor: thresholds.min_current_floor,
                min_charge_count: thresholds.undercurrent_min_charge_count,
            },
            PhaseGate::Charging,
            debounced(thresholds, Undercurrent),
            UntilReset,
        ),
        rule(
            PlugLoss,
            Trigger::PlugLoss,
            PhaseGate::Charging,
            Confirmation::Immediate,
            UntilReset,
        ),
        rule(
            RelayFault,
            Trigger::RelayOpen,
            PhaseGate::Any,
            Confirmation::Immediate,
            UntilReset,
        ),
        rule(
            BmsDeviation,
            Trigger::BmsDeviation {
                min_charge_count: thresholds.bms_min_charge_count,
                max_deviation: thresholds.bms_max_deviation,
            },
            PhaseGate::Charging,
            debounced(thresholds, BmsDeviation),
            UntilReset,
        ),
        rule(
            OverTemperature,
            Trigger::OverTemperature {
                limit: thresholds.overheat_limit,
            },
            PhaseGate::Charging,
            debounced(thresholds, OverTemperature),
            UntilReset,
        ),
        rule(
            CanLoss,
            Trigger::CanLoss,
            PhaseGate::Any,
            debounced(thresholds, CanLoss),
            UntilReset,
        ),
        rule(
            InsulationFault,
            Trigger::Insulation {
                min_ohms: thresholds.min_insulation_ohms,
            },
            PhaseGate::Any,
            debounced(thresholds, InsulationFault),
            UntilReset,
        ),
        rule(
            PaymentTimeout,
            Trigger::PaymentPending,
            PhaseGate::Wait,
            debounced(thresholds, PaymentTimeout),
            OnCondition(RecoveryCondition::PaymentCompleted),
        ),
        rule(
            SequenceTimeout,
            Trigger::SequenceStall,
            PhaseGate::Wait,
            debounced(thresholds, SequenceTimeout),
            OnCondition(RecoveryCondition::ChargingStarted),
        ),
        rule(
            TemperatureSensor,
            Trigger::TemperatureSpike {
                high: thresholds.temp_spike_limit,
                low: thresholds.temp_low_limit,
            },
            PhaseGate::Charging,
            debounced(thresholds, TemperatureSensor),
            UntilReset,
        ),
    ]
}

/// All twelve detectors in evaluation order 0x01 .. 0x0C.
pub fn build_detectors(thresholds: &FaultThresholds) -> Vec<Box<dyn Detector>> {
    let latch = |code: FaultCode| RestartLatch::new(thresholds.restart_inhibit_after(code));

    let mut detectors: Vec<Box<dyn Detector>> = fault_table(thresholds)
        .into_iter()
        .map(|rule| {
            Box::new(rule.detector().with_latch(latch(rule.code))) as Box<dyn Detector>
        })
        .collect();

    let watchdog = WatchdogMonitor::new(thresholds.watchdog_max_gap, thresholds.watchdog_latch)
        .with_latch(latch(FaultCode::Watchdog));
    detectors.push(Box::new(watchdog));
    detectors.sort_by_key(|detector| detector.code());
    detectors
}
