use crate::ports::Fault;
use crate::recovery::SubsystemNotifier;

/// Subsystem restart service announcing companion crashes and power-ups.
pub trait SubsystemRestart: Send + Sync {
    fn register_notifier(&self, subsystem: &str, notifier: SubsystemNotifier) -> Result<(), Fault>;

    fn unregister_notifier(&self, subsystem: &str);
}
