use crate::ports::Fault;

/// Host input device receiving relative wheel motion.
pub trait MotionSink: Send + Sync {
    /// Announce the device under `name` with a relative-wheel capability.
    fn register(&self, name: &str) -> Result<(), Fault>;

    fn report_wheel(&self, value: i32);

    /// Flush the reported values as one input frame.
    fn sync(&self);
}
