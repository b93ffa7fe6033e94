use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::engine::error::EngineError;
use crate::engine::sink::EventSink;

/// Artificial delays that slow a run down to a watchable speed.
///
/// They only pace the visualization; nothing depends on them for
/// correctness, and tests run with [`Pacing::none`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub batch_delay:  Duration,
    pub layer_delay:  Duration,
    /// Extra random delay in `[0, layer_jitter)` added per layer.
    pub layer_jitter: Duration,
    pub filter_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            batch_delay:  Duration::from_millis(300),
            layer_delay:  Duration::from_millis(400),
            layer_jitter: Duration::from_millis(300),
            filter_delay: Duration::from_millis(80),
        }
    }
}

impl Pacing {
    /// No delays at all.
    pub fn none() -> Self {
        Pacing {
            batch_delay:  Duration::ZERO,
            layer_delay:  Duration::ZERO,
            layer_jitter: Duration::ZERO,
            filter_delay: Duration::ZERO,
        }
    }

    /// Same rhythm as the default, four times quicker.
    pub fn fast() -> Self {
        let d = Pacing::default();
        Pacing {
            batch_delay:  d.batch_delay / 4,
            layer_delay:  d.layer_delay / 4,
            layer_jitter: d.layer_jitter / 4,
            filter_delay: d.filter_delay / 4,
        }
    }

    /// Parses `normal`, `fast` or `none`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "normal" | "default" => Some(Pacing::default()),
            "fast"               => Some(Pacing::fast()),
            "none" | "off"       => Some(Pacing::none()),
            _ => None,
        }
    }

    pub fn layer_pause<R: Rng>(&self, rng: &mut R) -> Duration {
        let jitter_ms = self.layer_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.layer_delay;
        }
        let jitter_ms = rng.gen_range(0..jitter_ms);
        self.layer_delay + Duration::from_millis(jitter_ms)
    }
}

/// Longest single sleep inside [`pause`]; cancellation is noticed within
/// one slice.
pub const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Sleeps for `delay` in slices, checking between them whether the run
/// should stop.
pub fn pause(delay: Duration, sink: &dyn EventSink) -> Result<(), EngineError> {
    let mut remaining = delay;
    while !remaining.is_zero() {
        sink.checkpoint()?;
        let step = remaining.min(PAUSE_SLICE);
        thread::sleep(step);
        remaining -= step;
    }
    sink.checkpoint()
}
