use crate::ports::Fault;

use models::VoltageRange;

use std::sync::Arc;

/// One power rail as exposed by the regulator framework.
pub trait Regulator: Send + Sync {
    fn set_voltage(&self, range: VoltageRange) -> Result<(), Fault>;

    fn enable(&self) -> Result<(), Fault>;

    fn disable(&self) -> Result<(), Fault>;

    /// Hint the expected load so the regulator can pick its most efficient mode.
    fn set_optimum_mode(&self, load_ua: u32) -> Result<(), Fault>;
}

/// Looks up rails by supply name (e.g. `vdd-ldo1`).
pub trait RegulatorProvider: Send + Sync {
    fn get(&self, supply: &str) -> Result<Arc<dyn Regulator>, Fault>;
}
