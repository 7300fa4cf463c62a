use crate::ports::{Fault, MotionSink};
use crate::sim::ENODEV;
use crate::sync::lock;

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    Wheel(i32),
    Sync,
}

/// Motion sink keeping everything reported to it.
#[derive(Default)]
pub struct RecordingSink {
    name: Mutex<Option<String>>,
    events: Mutex<Vec<SinkEvent>>,
    refuse: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_registration(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn registered_name(&self) -> Option<String> {
        lock(&self.name).clone()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        lock(&self.events).clone()
    }
}

impl MotionSink for RecordingSink {
    fn register(&self, name: &str) -> Result<(), Fault> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(Fault::new(ENODEV, format!("Cannot register input device {name}")));
        }
        *lock(&self.name) = Some(name.to_string());
        Ok(())
    }

    fn report_wheel(&self, value: i32) {
        lock(&self.events).push(SinkEvent::Wheel(value));
    }

    fn sync(&self) {
        lock(&self.events).push(SinkEvent::Sync);
    }
}
