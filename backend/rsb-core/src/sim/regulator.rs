use crate::config::RailsConfig;
use crate::ports::{Fault, Regulator, RegulatorProvider};
use crate::sim::{EIO, ENODEV};
use crate::sync::lock;

use models::VoltageRange;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulatorCall {
    SetVoltage(VoltageRange),
    Enable,
    Disable,
    SetOptimumMode(u32),
}

impl RegulatorCall {
    pub fn op(&self) -> RegulatorOp {
        match self {
            Self::SetVoltage(_) => RegulatorOp::SetVoltage,
            Self::Enable => RegulatorOp::Enable,
            Self::Disable => RegulatorOp::Disable,
            Self::SetOptimumMode(_) => RegulatorOp::SetOptimumMode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegulatorOp {
    SetVoltage,
    Enable,
    Disable,
    SetOptimumMode,
}

/// Regulator that records every call, failed ones included.
pub struct SimRegulator {
    supply: String,
    calls: Mutex<Vec<RegulatorCall>>,
    failing: Mutex<HashSet<RegulatorOp>>,
    enabled: AtomicBool,
}

impl SimRegulator {
    pub fn new(supply: impl Into<String>) -> Self {
        Self {
            supply: supply.into(),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            enabled: AtomicBool::new(false),
        }
    }

    pub fn supply(&self) -> &str {
        &self.supply
    }

    /// Make every future `op` call fail until [`heal`](Self::heal)ed.
    pub fn fail(&self, op: RegulatorOp) {
        lock(&self.failing).insert(op);
    }

    pub fn heal(&self, op: RegulatorOp) {
        lock(&self.failing).remove(&op);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RegulatorCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, op: RegulatorOp) -> usize {
        lock(&self.calls).iter().filter(|call| call.op() == op).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: RegulatorCall) -> Result<(), Fault> {
        lock(&self.calls).push(call);
        if lock(&self.failing).contains(&call.op()) {
            return Err(Fault::new(EIO, format!("{} {:?} failed", self.supply, call.op())));
        }
        Ok(())
    }
}

impl Regulator for SimRegulator {
    fn set_voltage(&self, range: VoltageRange) -> Result<(), Fault> {
        self.record(RegulatorCall::SetVoltage(range))
    }

    fn enable(&self) -> Result<(), Fault> {
        self.record(RegulatorCall::Enable)?;
        self.enabled.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&self) -> Result<(), Fault> {
        self.record(RegulatorCall::Disable)?;
        self.enabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn set_optimum_mode(&self, load_ua: u32) -> Result<(), Fault> {
        self.record(RegulatorCall::SetOptimumMode(load_ua))
    }
}

/// Regulator provider serving a fixed set of [`SimRegulator`]s.
pub struct SimRegulators {
    rails: HashMap<String, Arc<SimRegulator>>,
}

impl SimRegulators {
    pub fn new<'a>(supplies: impl IntoIterator<Item = &'a str>) -> Self {
        let rails = supplies
            .into_iter()
            .map(|supply| (supply.to_string(), Arc::new(SimRegulator::new(supply))))
            .collect();
        Self { rails }
    }

    /// Provider with both supplies named in `rails`.
    pub fn for_rails(rails: &RailsConfig) -> Self {
        Self::new([rails.control.supply.as_str(), rails.bus.supply.as_str()])
    }

    pub fn regulator(&self, supply: &str) -> Option<Arc<SimRegulator>> {
        self.rails.get(supply).cloned()
    }
}

impl RegulatorProvider for SimRegulators {
    fn get(&self, supply: &str) -> Result<Arc<dyn Regulator>, Fault> {
        match self.rails.get(supply) {
            Some(regulator) => Ok(Arc::clone(regulator) as Arc<dyn Regulator>),
            None => Err(Fault::new(ENODEV, format!("No supply named {supply}"))),
        }
    }
}
