//! Time management for the frame loop.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Nominal frame time the per-frame tuning constants are expressed against (60 Hz).
pub const NOMINAL_FRAME: Duration = Duration::from_micros(16_667);

/// Source of high-resolution timestamps, measured from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Monotonic wall clock.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: Duration) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Manages frame timing and delta time calculation.
#[derive(Debug, Clone)]
pub struct Time {
    /// Timestamp the owner was created at.
    start_time: Duration,
    /// Timestamp of the last frame, `None` before the first frame.
    last_frame: Option<Duration>,
    /// Raw duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
    /// Frame time that one "delta frame" stands for.
    nominal_frame: Duration,
    /// Upper bound for `delta_frames`, so a backgrounded tab does not teleport ships.
    max_delta_frames: f32,
}

impl Time {
    /// Create a time manager whose elapsed time counts from `start`.
    pub fn new(start: Duration) -> Self {
        Self {
            start_time: start,
            last_frame: None,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            nominal_frame: NOMINAL_FRAME,
            max_delta_frames: 3.0,
        }
    }

    /// Override the nominal frame time and delta clamp.
    pub fn with_frame_limits(mut self, nominal_frame: Duration, max_delta_frames: f32) -> Self {
        if !nominal_frame.is_zero() {
            self.nominal_frame = nominal_frame;
        }
        self.max_delta_frames = max_delta_frames.max(1.0);
        self
    }

    /// Update timing at the start of a new frame.
    ///
    /// The first frame counts as exactly one nominal frame. Timestamps that go
    /// backwards yield a zero delta.
    pub fn update_at(&mut self, now: Duration) {
        self.delta = match self.last_frame {
            Some(last) if now < last => {
                log::debug!("Frame timestamp went backwards by {:?}", last - now);
                Duration::ZERO
            }
            Some(last) => now - last,
            None => self.nominal_frame,
        };
        self.last_frame = Some(now);
        self.elapsed = now.saturating_sub(self.start_time);
        self.frame_count += 1;
    }

    /// Delta expressed in nominal frames, clamped to the configured maximum.
    pub fn delta_frames(&self) -> f32 {
        let frames = self.delta.as_secs_f32() / self.nominal_frame.as_secs_f32();
        frames.min(self.max_delta_frames)
    }

    /// Clamped delta in milliseconds (what the per-frame timers consume).
    pub fn delta_ms(&self) -> f32 {
        self.delta_frames() * self.nominal_frame.as_secs_f32() * 1000.0
    }

    /// Get the raw delta time as a Duration.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get total elapsed time as Duration.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn start_time(&self) -> Duration {
        self.start_time
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn nominal_frame(&self) -> Duration {
        self.nominal_frame
    }

    /// Get the current FPS (averaged over last frame).
    pub fn fps(&self) -> f32 {
        if self.delta.as_secs_f32() > 0.0 {
            1.0 / self.delta.as_secs_f32()
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_is_one_nominal_frame() {
        let mut t = Time::new(Duration::from_millis(500));
        t.update_at(Duration::from_millis(900));
        assert!((t.delta_frames() - 1.0).abs() < 1e-4);
        assert_eq!(t.elapsed(), Duration::from_millis(400));
        assert_eq!(t.frame_count(), 1);
    }

    #[test]
    fn delta_is_clamped_after_long_pause() {
        let mut t = Time::new(Duration::ZERO);
        t.update_at(Duration::from_millis(16));
        t.update_at(Duration::from_secs(10));
        assert!((t.delta_frames() - 3.0).abs() < 1e-4);
        assert!((t.delta_ms() - 50.0).abs() < 0.1);
    }

    #[test]
    fn backwards_timestamp_gives_zero_delta() {
        let mut t = Time::new(Duration::ZERO);
        t.update_at(Duration::from_millis(100));
        t.update_at(Duration::from_millis(50));
        assert_eq!(t.delta(), Duration::ZERO);
        assert_eq!(t.delta_frames(), 0.0);
    }

    #[test]
    fn manual_clock_clones_share_reading() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(other.now(), Duration::from_millis(250));
        other.set(Duration::from_secs(2));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }
}
