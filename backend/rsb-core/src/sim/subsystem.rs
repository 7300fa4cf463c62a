use crate::ports::{Fault, SubsystemRestart};
use crate::recovery::SubsystemNotifier;
use crate::sim::ENODEV;
use crate::sync::lock;

use models::SubsystemEvent;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Subsystem restart service driven by hand.
#[derive(Default)]
pub struct SimSubsystem {
    notifiers: Mutex<HashMap<String, SubsystemNotifier>>,
    refuse: AtomicBool,
}

impl SimSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registrations fail.
    pub fn refuse_registration(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn is_registered(&self, subsystem: &str) -> bool {
        lock(&self.notifiers).contains_key(subsystem)
    }

    pub fn before_shutdown(&self) {
        self.announce(SubsystemEvent::BeforeShutdown);
    }

    pub fn after_powerup(&self) {
        self.announce(SubsystemEvent::AfterPowerup);
    }

    fn announce(&self, event: SubsystemEvent) {
        let notifiers: Vec<SubsystemNotifier> = lock(&self.notifiers).values().cloned().collect();
        for notifier in notifiers {
            notifier.notify(event);
        }
    }
}

impl SubsystemRestart for SimSubsystem {
    fn register_notifier(&self, subsystem: &str, notifier: SubsystemNotifier) -> Result<(), Fault> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Fault::new(ENODEV, format!("Subsystem {subsystem} not found")));
        }
        lock(&self.notifiers).insert(subsystem.to_string(), notifier);
        Ok(())
    }

    fn unregister_notifier(&self, subsystem: &str) {
        lock(&self.notifiers).remove(subsystem);
    }
}
