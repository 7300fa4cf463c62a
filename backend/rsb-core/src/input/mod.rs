//! Motion events from the companion, forwarded to the host input device.

use crate::error::input::InputError;
use crate::ports::MotionSink;

use common::ErrorLocation;
use models::MotionEvent;

use std::panic::Location;
use std::sync::Arc;

use log::debug;

pub struct MotionReporter {
    sink: Arc<dyn MotionSink>,
}

impl MotionReporter {
    pub fn new(sink: Arc<dyn MotionSink>) -> Self {
        Self { sink }
    }

    /// Forward one event. Wheel events become a relative sample followed by a
    /// sync; anything else is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::InvalidArgument`] when no event is given.
    pub fn send_input(&self, event: Option<&MotionEvent>) -> Result<(), InputError> {
        let Some(event) = event else {
            return Err(InputError::InvalidArgument {
                message: "No motion event supplied".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        if event.is_wheel() {
            self.sink.report_wheel(event.value);
            self.sink.sync();
        } else {
            debug!("Sub id {} value {}", event.sub_id, event.value);
        }

        Ok(())
    }
}
