//! ---
//! obc_section: "04-simulation"
//! obc_subsection: "module"
//! obc_type: "source"
//! obc_scope: "code"
//! obc_description: "Canonical raw-data scenarios covering all twelve fault codes."
//! obc_version: "v0.1.0"
//! obc_owner: "tbd"
//! ---
//! Each canonical scenario walks a full session (INIT, WAIT, CHARGING,
//! FAULT, RESET, INIT) and drives four fault codes to confirmation.
use obc_diag_core::{FaultCode, PlugInfo, SeqState, TelemetrySample};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ScenarioKind {
    /// Overcurrent, relay, over-temperature and temperature sensor.
    Data1,
    /// Undercurrent, plug loss, payment and sequence timeouts.
    Data2,
    /// BMS deviation, CAN loss, insulation and watchdog.
    Data3,
}

impl ScenarioKind {
    pub fn all() -> impl Iterator<Item = ScenarioKind> {
        ScenarioKind::iter()
    }

    /// Codes the scenario is built to confirm.
    pub fn targets(self) -> [FaultCode; 4] {
        use FaultCode::*;
        match self {
            ScenarioKind::Data1 => [Overcurrent, RelayFault, OverTemperature, TemperatureSensor],
            ScenarioKind::Data2 => [Undercurrent, PlugLoss, PaymentTimeout, SequenceTimeout],
            ScenarioKind::Data3 => [BmsDeviation, CanLoss, InsulationFault, Watchdog],
        }
    }

    pub fn build(self) -> Scenario {
        let samples = match self {
            ScenarioKind::Data1 => data1(),
            ScenarioKind::Data2 => data2(),
            ScenarioKind::Data3 => data3(),
        };
        Scenario {
            kind: self,
            samples,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub samples: Vec<TelemetrySample>,
}

impl Scenario {
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.kind)
    }
}

/// Accumulates samples in emission order.
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    samples: Vec<TelemetrySample>,
    charge_count: u32,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: TelemetrySample) -> &mut Self {
        self.samples.push(sample);
        self
    }

    /// Advance and return the running charge counter.
    pub fn tick(&mut self) -> u32 {
        self.charge_count += 1;
        self.charge_count
    }

    pub fn charge_count(&self) -> u32 {
        self.charge_count
    }

    pub fn finish(self) -> Vec<TelemetrySample> {
        self.samples
    }
}

/// Unplugged, idle charger in INIT.
pub fn idle(cycle: u64) -> TelemetrySample {
    TelemetrySample {
        cycle,
        seq_state: SeqState::Init,
        plug_info: PlugInfo::Unplugged,
        flag_stop: true,
        flag_relay: false,
        ia: 0,
        ib: 0,
        ic: 0,
        fault_state: 0,
        charge_count: 0,
        real_battery_voltage: 400,
        expected_battery_voltage: 400,
        temperature: 15,
        can_msg_received: true,
        iso_resistance: 800_000,
    }
}

/// Paid session with the relay closed and current flowing.
pub fn charging(
    cycle: u64,
    charge_count: u32,
    [ia, ib, ic]: [i32; 3],
    voltage: u32,
    temperature: i32,
) -> TelemetrySample {
    TelemetrySample {
        seq_state: SeqState::Charging,
        plug_info: PlugInfo::PluggedPaid,
        flag_stop: false,
        flag_relay: true,
        ia,
        ib,
        ic,
        charge_count,
        real_battery_voltage: voltage,
        temperature,
        ..idle(cycle)
    }
}

/// Relay opened by the stop flag, charger reporting `seq_state`.
fn stopped(cycle: u64, seq_state: SeqState, plug_info: PlugInfo, charge_count: u32) -> TelemetrySample {
    TelemetrySample {
        seq_state,
        plug_info,
        fault_state: 2,
        charge_count,
        ..idle(cycle)
    }
}

/// Relay closed again with no load, on the way out of FAULT.
fn recovering(cycle: u64, seq_state: SeqState, plug_info: PlugInfo, charge_count: u32) -> TelemetrySample {
    TelemetrySample {
        seq_state,
        plug_info,
        flag_stop: false,
        flag_relay: true,
        charge_count,
        ..idle(cycle)
    }
}

/// Cycles 1..=7: idle, then a connector is plugged in before payment.
fn plug_in(builder: &mut ScenarioBuilder) {
    for cycle in 1..=5u64 {
        builder.push(TelemetrySample {
            real_battery_voltage: 398 + (cycle % 3) as u32,
            ..idle(cycle)
        });
    }
    for (cycle, voltage) in [(6, 398), (7, 399)] {
        builder.push(TelemetrySample {
            plug_info: PlugInfo::PluggedUnpaid,
            real_battery_voltage: voltage,
            ..idle(cycle)
        });
    }
}

fn waiting(cycle: u64, plug_info: PlugInfo, voltage: u32) -> TelemetrySample {
    TelemetrySample {
        seq_state: SeqState::Wait,
        plug_info,
        real_battery_voltage: voltage,
        ..idle(cycle)
    }
}

/// Payment lands on the last WAIT cycle and the relay closes with inrush current.
fn relay_closing(cycle: u64) -> TelemetrySample {
    TelemetrySample {
        flag_stop: false,
        flag_relay: true,
        ia: 4,
        ib: 5,
        ic: 4,
        ..waiting(cycle, PlugInfo::PluggedPaid, 399)
    }
}

fn cooldown(builder: &mut ScenarioBuilder, cycles: std::ops::RangeInclusive<u64>, start: i32, step: i32) {
    let first = *cycles.start();
    for cycle in cycles {
        let temperature = (start - (cycle - first) as i32 * step).max(15);
        builder.push(TelemetrySample {
            temperature,
            ..idle(cycle)
        });
    }
}

fn data1() -> Vec<TelemetrySample> {
    let mut b = ScenarioBuilder::new();
    plug_in(&mut b);
    for cycle in 8..=11u64 {
        b.push(waiting(cycle, PlugInfo::PluggedUnpaid, 399 + (cycle % 2) as u32));
    }
    b.push(TelemetrySample {
        real_battery_voltage: 398,
        ..relay_closing(12)
    });

    for cycle in 13..=25u64 {
        let cc = b.tick();
        let ia = (10 + cc as i32).min(22);
        b.push(charging(cycle, cc, [ia, ia - 1, ia - 2], 400 + cc / 3, 15 + cc as i32 / 2));
    }
    // Current ramps to the rated limit while the charger heats up.
    for cycle in 26..=35u64 {
        let cc = b.tick();
        let step = (cycle - 26) as i32;
        let ia = 22 + step;
        b.push(charging(cycle, cc, [ia, ia - 1, ia - 2], 405 + cc / 5, 20 + step * 3));
    }
    // Overcurrent for 12 cycles; BMS voltage drifts out of band as well.
    for cycle in 36..=47u64 {
        let cc = b.tick();
        let step = (cycle - 36) as i32;
        let ia = 33 + step % 4;
        b.push(TelemetrySample {
            fault_state: 1,
            ..charging(cycle, cc, [ia, ia - 1, ia + 1], 410 + cc / 5, 50 + step)
        });
    }
    // Sustained overheat with the current backing off.
    for cycle in 48..=59u64 {
        let cc = b.tick();
        let step = (cycle - 48) as i32;
        let ia = 20 - step / 3;
        b.push(TelemetrySample {
            fault_state: 1,
            ..charging(cycle, cc, [ia, ia + 1, ia - 1], 415 + cc / 8, 62 + step * 2)
        });
    }
    // Relay drops out without a stop request.
    for cycle in 60..=61u64 {
        let cc = b.tick();
        b.push(TelemetrySample {
            flag_relay: false,
            fault_state: 1,
            ..charging(cycle, cc, [18, 17, 19], 420, 90 + (cycle - 60) as i32)
        });
    }
    // Implausible temperature spikes.
    for cycle in 62..=65u64 {
        let cc = b.tick();
        b.push(TelemetrySample {
            fault_state: 1,
            ..charging(cycle, cc, [17, 18, 17], 422, 122 + (cycle - 62) as i32 * 3)
        });
    }

    let cc = b.charge_count();
    b.push(TelemetrySample {
        real_battery_voltage: 422,
        temperature: 90,
        ..stopped(66, SeqState::Charging, PlugInfo::PluggedPaid, cc)
    });
    for cycle in 67..=74u64 {
        let step = (cycle - 67) as i32;
        b.push(TelemetrySample {
            real_battery_voltage: 420 - step as u32,
            temperature: 85 - step * 3,
            ..stopped(cycle, SeqState::Fault, PlugInfo::PluggedPaid, cc)
        });
    }
    b.push(TelemetrySample {
        real_battery_voltage: 410,
        temperature: 50,
        ..recovering(75, SeqState::Fault, PlugInfo::PluggedPaid, cc)
    });
    b.push(TelemetrySample {
        real_battery_voltage: 408,
        temperature: 45,
        ..recovering(76, SeqState::Reset, PlugInfo::PluggedPaid, 0)
    });
    cooldown(&mut b, 77..=85, 40, 3);
    b.finish()
}

fn data2() -> Vec<TelemetrySample> {
    let mut b = ScenarioBuilder::new();
    plug_in(&mut b);
    // Waiting for a payment that never arrives.
    for cycle in 8..=21u64 {
        b.push(waiting(cycle, PlugInfo::PluggedUnpaid, 399 + (cycle % 2) as u32));
    }
    for (cycle, voltage) in [(22, 399), (23, 400)] {
        b.push(TelemetrySample {
            plug_info: PlugInfo::PluggedPaid,
            real_battery_voltage: voltage,
            ..idle(cycle)
        });
    }
    b.push(waiting(24, PlugInfo::PluggedPaid, 399));
    b.push(waiting(25, PlugInfo::PluggedPaid, 400));
    b.push(relay_closing(26));

    for cycle in 27..=50u64 {
        let cc = b.tick();
        let ia = (10 + cc as i32).min(19);
        b.push(charging(cycle, cc, [ia, ia - 1, ia + 1], 400 + cc / 3, 15 + cc as i32 / 3));
    }
    // Current collapses below the floor late in the session.
    for cycle in 51..=62u64 {
        let cc = b.tick();
        let ia = (4 - (cycle - 51) as i32 / 4).max(1);
        b.push(charging(cycle, cc, [ia, ia + 1, ia], 415 + cc / 8, 22 + cc as i32 / 5));
    }
    // Connector pulled mid-charge.
    let cc = b.charge_count();
    for (cycle, offset, currents) in [(63, 1, [3, 4, 3]), (64, 2, [2, 3, 2])] {
        b.push(TelemetrySample {
            plug_info: PlugInfo::Unplugged,
            ..charging(cycle, cc + offset, currents, 420, 25)
        });
    }

    let cc = cc + 2;
    b.push(TelemetrySample {
        real_battery_voltage: 420,
        temperature: 24,
        ..stopped(65, SeqState::Charging, PlugInfo::Unplugged, cc)
    });
    for cycle in 66..=74u64 {
        let step = (cycle - 66) as i32;
        b.push(TelemetrySample {
            real_battery_voltage: 418 - step as u32,
            temperature: 24 - step / 2,
            ..stopped(cycle, SeqState::Fault, PlugInfo::Unplugged, cc)
        });
    }
    b.push(TelemetrySample {
        real_battery_voltage: 408,
        temperature: 20,
        ..recovering(75, SeqState::Fault, PlugInfo::Unplugged, cc)
    });
    b.push(TelemetrySample {
        real_battery_voltage: 406,
        temperature: 19,
        ..recovering(76, SeqState::Reset, PlugInfo::Unplugged, 0)
    });
    cooldown(&mut b, 77..=90, 19, 1);
    b.finish()
}

fn data3() -> Vec<TelemetrySample> {
    let mut b = ScenarioBuilder::new();
    plug_in(&mut b);
    b.push(waiting(8, PlugInfo::PluggedUnpaid, 399));
    b.push(waiting(9, PlugInfo::PluggedUnpaid, 400));
    b.push(relay_closing(10));

    for cycle in 11..=25u64 {
        let cc = b.tick();
        let ia = (10 + cc as i32).min(19);
        b.push(charging(cycle, cc, [ia, ia - 1, ia + 1], 400 + cc / 3, 15 + cc as i32 / 3));
    }
    // Measured pack voltage climbs away from the BMS target.
    for cycle in 26..=37u64 {
        let cc = b.tick();
        let voltage = 415 + (cycle - 26) as u32;
        b.push(charging(cycle, cc, [18, 17, 19], voltage, 20 + cc as i32 / 4));
    }
    for cycle in 38..=44u64 {
        let cc = b.tick();
        b.push(TelemetrySample {
            fault_state: 1,
            can_msg_received: false,
            ..charging(cycle, cc, [17, 18, 17], 420, 25)
        });
    }
    // Insulation resistance decays.
    for cycle in 45..=56u64 {
        let cc = b.tick();
        let iso = 450u32.saturating_sub((cycle - 45) as u32 * 40).max(50);
        b.push(TelemetrySample {
            fault_state: 1,
            iso_resistance: iso,
            ..charging(cycle, cc, [17, 18, 17], 420, 26)
        });
    }
    // Cycles 57..=69 never arrive.
    let cc = b.tick();
    b.push(TelemetrySample {
        fault_state: 1,
        iso_resistance: 400,
        ..charging(70, cc, [17, 18, 17], 421, 27)
    });
    for cycle in 71..=75u64 {
        let cc = b.tick();
        b.push(TelemetrySample {
            fault_state: 1,
            ..charging(cycle, cc, [16, 17, 16], 421, 27)
        });
    }

    let cc = b.charge_count();
    b.push(TelemetrySample {
        real_battery_voltage: 421,
        temperature: 26,
        ..stopped(76, SeqState::Charging, PlugInfo::PluggedPaid, cc)
    });
    for cycle in 77..=84u64 {
        let step = (cycle - 77) as i32;
        b.push(TelemetrySample {
            real_battery_voltage: 418 - step as u32,
            temperature: 25 - step / 2,
            ..stopped(cycle, SeqState::Fault, PlugInfo::PluggedPaid, cc)
        });
    }
    b.push(TelemetrySample {
        real_battery_voltage: 410,
        temperature: 20,
        ..recovering(85, SeqState::Fault, PlugInfo::PluggedPaid, cc)
    });
    b.push(TelemetrySample {
        real_battery_voltage: 408,
        temperature: 19,
        ..recovering(86, SeqState::Reset, PlugInfo::PluggedPaid, 0)
    });
    cooldown(&mut b, 87..=95, 19, 1);
    b.finish()
}
