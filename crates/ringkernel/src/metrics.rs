/// Optional counters for observing a [`crate::Ring`]'s traffic.
///
/// Not part of the spec's contract; a thin, always-available instrument the
/// way the teacher crate's `Metrics` type is, so callers wiring this into a
/// larger system have somewhere to look without reaching for a tracing
/// dependency the core has no other use for.
#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics {
    pub enqueued: u64,
    pub dequeued: u64,
    pub enqueue_failures: u64,
    pub dequeue_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}
