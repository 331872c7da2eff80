//! Pull-based frame loop.
//!
//! The host calls [`FrameLoop::render_frame`] once per display refresh. Each
//! call either completes the whole acquire, stamp, marshal and submit
//! sequence, or drops the frame and leaves the model's clock and the
//! marshalled regions exactly as the last presented frame left them.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{FrameDrop, RenderError};
use crate::marshal::{MarshalledParameters, ParameterMarshaller};
use crate::params::EffectModel;
use crate::runtime::TimeSource;

/// Something that can hand out a presentable target and consume marshalled
/// parameters for it.
///
/// A transient failure in either step must be reported as
/// `RenderError::TransientFrame`; anything else ends the loop. A transient
/// `submit` failure rolls the marshalled regions back to the last presented
/// frame.
pub trait FrameBackend {
    type Target;

    fn acquire(&mut self) -> Result<Self::Target, RenderError>;

    fn submit(
        &mut self,
        target: Self::Target,
        parameters: &MarshalledParameters<'_>,
    ) -> Result<(), RenderError>;
}

/// Outcome of a single `render_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    Dropped(FrameDrop),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounters {
    pub presented: u64,
    pub dropped: u64,
}

#[derive(Debug)]
struct FrameStats {
    counters: FrameCounters,
    frames_since_last_update: u32,
    last_fps_update: Instant,
    frames_per_second: f32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            counters: FrameCounters::default(),
            frames_since_last_update: 0,
            last_fps_update: Instant::now(),
            frames_per_second: 0.0,
        }
    }

    fn record_drop(&mut self, reason: FrameDrop) {
        self.counters.dropped += 1;
        debug!(%reason, dropped = self.counters.dropped, "dropped frame");
    }

    fn record_present(&mut self, elapsed_time: f32) {
        self.counters.presented += 1;
        self.frames_since_last_update += 1;

        let now = Instant::now();
        let since_update = now.saturating_duration_since(self.last_fps_update);
        if since_update >= Duration::from_secs(1) {
            self.frames_per_second =
                self.frames_since_last_update as f32 / since_update.as_secs_f32();
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
            debug!(
                fps = self.frames_per_second.round(),
                presented = self.counters.presented,
                dropped = self.counters.dropped,
                time = elapsed_time,
                "render stats"
            );
        }
    }
}

/// Owns the parameter model and drives one backend with one clock.
pub struct FrameLoop<B, T> {
    model: EffectModel,
    /// Model as of the last presented frame; source of the rollback.
    committed: EffectModel,
    marshaller: ParameterMarshaller,
    backend: B,
    clock: T,
    stats: FrameStats,
}

impl<B, T> FrameLoop<B, T>
where
    B: FrameBackend,
    T: TimeSource,
{
    pub fn new(backend: B, clock: T, model: EffectModel) -> Self {
        let mut marshaller = ParameterMarshaller::new();
        marshaller.marshal(&model);
        Self {
            model,
            committed: model,
            marshaller,
            backend,
            clock,
            stats: FrameStats::new(),
        }
    }

    pub fn render_frame(&mut self) -> Result<FrameStatus, RenderError> {
        let target = match self.backend.acquire() {
            Ok(target) => target,
            Err(RenderError::TransientFrame(reason)) => {
                self.stats.record_drop(reason);
                return Ok(FrameStatus::Dropped(reason));
            }
            Err(error) => return Err(error),
        };

        self.model.global.elapsed_time = self.clock.elapsed();
        let parameters = self.marshaller.marshal(&self.model);

        match self.backend.submit(target, &parameters) {
            Ok(()) => {
                self.committed = self.model;
                self.stats.record_present(self.model.global.elapsed_time);
                Ok(FrameStatus::Presented)
            }
            Err(RenderError::TransientFrame(reason)) => {
                // Marshalling is deterministic, so re-marshalling the committed
                // model restores the previous bytes exactly.
                self.model.global.elapsed_time = self.committed.global.elapsed_time;
                self.marshaller.marshal(&self.committed);
                self.stats.record_drop(reason);
                Ok(FrameStatus::Dropped(reason))
            }
            Err(error) => Err(error),
        }
    }

    /// Records a new logical surface size. Nothing else in the model changes.
    pub fn on_surface_resize(&mut self, logical: (f32, f32)) {
        self.model.global.set_resolution(logical.0, logical.1);
        debug!(width = logical.0, height = logical.1, "surface resolution updated");
    }

    pub fn model(&self) -> &EffectModel {
        &self.model
    }

    /// Bytes marshalled for the most recent submitted frame.
    pub fn regions(&self) -> MarshalledParameters<'_> {
        self.marshaller.regions()
    }

    pub fn stats(&self) -> FrameCounters {
        self.stats.counters
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::FixedTimeSource;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedBackend {
        acquisitions: VecDeque<Result<(), RenderError>>,
        submitted: Vec<f32>,
    }

    impl FrameBackend for ScriptedBackend {
        type Target = ();

        fn acquire(&mut self) -> Result<(), RenderError> {
            self.acquisitions.pop_front().unwrap_or(Ok(()))
        }

        fn submit(&mut self, _: (), parameters: &MarshalledParameters<'_>) -> Result<(), RenderError> {
            self.submitted.push(parameters.read_global().elapsed_time);
            Ok(())
        }
    }

    #[test]
    fn presented_frame_stamps_elapsed_time() {
        let mut frames = FrameLoop::new(
            ScriptedBackend::default(),
            FixedTimeSource::new(2.5),
            EffectModel::default(),
        );
        assert_eq!(frames.render_frame().unwrap(), FrameStatus::Presented);
        assert_eq!(frames.model().global.elapsed_time, 2.5);
        assert_eq!(frames.backend().submitted, vec![2.5]);
        assert_eq!(frames.stats().presented, 1);
    }

    #[test]
    fn transient_acquire_failure_drops_without_marshalling() {
        let backend = ScriptedBackend {
            acquisitions: VecDeque::from([
                Err(RenderError::TransientFrame(FrameDrop::SurfaceTimeout)),
            ]),
            ..ScriptedBackend::default()
        };
        let mut frames = FrameLoop::new(backend, FixedTimeSource::new(1.0), EffectModel::default());
        let before = frames.regions().global.to_vec();

        assert_eq!(
            frames.render_frame().unwrap(),
            FrameStatus::Dropped(FrameDrop::SurfaceTimeout)
        );
        assert_eq!(frames.regions().global, before.as_slice());
        assert_eq!(frames.model().global.elapsed_time, 0.0);
        assert!(frames.backend().submitted.is_empty());
        assert_eq!(frames.stats(), FrameCounters { presented: 0, dropped: 1 });
    }

    #[test]
    fn fatal_acquire_failure_is_returned() {
        let backend = ScriptedBackend {
            acquisitions: VecDeque::from([Err(RenderError::OutOfMemory)]),
            ..ScriptedBackend::default()
        };
        let mut frames = FrameLoop::new(backend, FixedTimeSource::new(0.0), EffectModel::default());
        assert!(matches!(frames.render_frame(), Err(RenderError::OutOfMemory)));
    }

    #[test]
    fn resize_touches_resolution_only() {
        let mut frames = FrameLoop::new(
            ScriptedBackend::default(),
            FixedTimeSource::new(0.0),
            EffectModel::default(),
        );
        let mut expected = *frames.model();
        frames.on_surface_resize((450.0, 600.0));
        expected.global.resolution = [450.0, 600.0];
        assert_eq!(*frames.model(), expected);
    }
}
