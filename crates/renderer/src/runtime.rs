use std::time::Instant;

/// High-level behaviour requested by the caller.
///
/// The render policy decides whether the effect animates with the monotonic
/// clock or is evaluated at a frozen timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPolicy {
    /// Advance `elapsed_time` with the system monotonic clock.
    Animate,
    /// Hold `elapsed_time` at a fixed value (seconds).
    Still { time: f32 },
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self::Animate
    }
}

/// Abstraction over where frame time originates from.
pub trait TimeSource: Send {
    /// Monotonic seconds; the first call captures the epoch.
    fn now(&mut self) -> f64;
    /// Seconds since the epoch, never decreasing across calls.
    fn elapsed(&mut self) -> f32;
}

/// Time source backed by the system monotonic clock.
///
/// `Instant` is immune to wall-clock adjustments, so a host clock moved
/// backwards never rewinds the animation.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    anchor: Instant,
    epoch: Option<f64>,
    last: f32,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            anchor: Instant::now(),
            epoch: None,
            last: 0.0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&mut self) -> f64 {
        let now = self.anchor.elapsed().as_secs_f64();
        self.epoch.get_or_insert(now);
        now
    }

    fn elapsed(&mut self) -> f32 {
        let now = self.now();
        let epoch = self.epoch.unwrap_or(now);
        // f64 -> f32 rounding must not step backwards between frames.
        let seconds = ((now - epoch).max(0.0) as f32).max(self.last);
        self.last = seconds;
        seconds
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self {
            time: time.max(0.0),
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&mut self) -> f64 {
        f64::from(self.time)
    }

    fn elapsed(&mut self) -> f32 {
        self.time
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

impl TimeSource for BoxedTimeSource {
    fn now(&mut self) -> f64 {
        (**self).now()
    }

    fn elapsed(&mut self) -> f32 {
        (**self).elapsed()
    }
}

/// Builds a time source suited to the requested render policy.
pub fn time_source_for_policy(policy: RenderPolicy) -> BoxedTimeSource {
    match policy {
        RenderPolicy::Animate => Box::new(SystemTimeSource::new()),
        RenderPolicy::Still { time } => Box::new(FixedTimeSource::new(time)),
    }
}
