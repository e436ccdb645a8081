#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded, fixed-rate frame recorder for the end-of-session digest.
//!
//! The buffer is generic over the frame payload; hosts decide what a frame is
//! (a thumbnail, a serialized scene, a handle into their own texture pool).
//! Captures are driven by tick time: at most one frame is taken per tick even
//! when several intervals elapsed, and no backlog is carried.
//!
//! Frames are stored as clips. Continuous capture stores every frame as a clip
//! of its own, so the buffer behaves like a plain FIFO. With a
//! [`HighlightCadence`] the buffer records short bursts separated by idle gaps
//! and evicts whole clips, so the digest samples the entire round rather than
//! only its last seconds.

use std::{collections::VecDeque, time::Duration};

use sushi_rush_core::{ConfigError, InvariantViolation};
use tracing::{debug, trace};

/// Host hook that produces a frame on demand.
pub trait FrameSource {
    /// Frame payload stored by the buffer.
    type Frame;

    /// Captures the current frame, or `None` when the host has nothing to show.
    fn capture(&mut self) -> Option<Self::Frame>;
}

impl<F, T> FrameSource for F
where
    F: FnMut() -> Option<T>,
{
    type Frame = T;

    fn capture(&mut self) -> Option<T> {
        self()
    }
}

/// Burst recording cadence for highlight clips.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HighlightCadence {
    clip_length: Duration,
    gap: Duration,
    max_clips: usize,
}

impl HighlightCadence {
    /// Records clips of `clip_length`, idles for `gap` after each one and keeps the
    /// newest `max_clips` clips.
    #[must_use]
    pub const fn new(clip_length: Duration, gap: Duration, max_clips: usize) -> Self {
        Self {
            clip_length,
            gap,
            max_clips,
        }
    }

    /// Length of one clip.
    #[must_use]
    pub const fn clip_length(&self) -> Duration {
        self.clip_length
    }

    /// Idle time between the end of a clip and the start of the next.
    #[must_use]
    pub const fn gap(&self) -> Duration {
        self.gap
    }

    /// Number of clips kept before the oldest is evicted.
    #[must_use]
    pub const fn max_clips(&self) -> usize {
        self.max_clips
    }

    /// Frames captured by one full clip at `interval`.
    #[must_use]
    pub fn frames_per_clip(&self, interval: Duration) -> usize {
        let interval = interval.as_nanos().max(1);
        let frames = (self.clip_length.as_nanos() + interval - 1) / interval;
        usize::try_from(frames).unwrap_or(usize::MAX).max(1)
    }
}

impl Default for HighlightCadence {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(20), 5)
    }
}

/// Configuration parameters for the replay buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    capacity: usize,
    interval: Duration,
    highlights: Option<HighlightCadence>,
}

impl Config {
    /// Creates a continuous configuration holding at most `capacity` frames taken
    /// every `interval`.
    #[must_use]
    pub const fn new(capacity: usize, interval: Duration) -> Self {
        Self {
            capacity,
            interval,
            highlights: None,
        }
    }

    /// Switches from continuous capture to highlight bursts.
    #[must_use]
    pub const fn with_highlights(mut self, cadence: HighlightCadence) -> Self {
        self.highlights = Some(cadence);
        self
    }

    /// Rejects a zero capacity, a zero capture interval and empty highlight clips.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroReplayCapacity);
        }
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroDuration("replay capture interval"));
        }
        if let Some(highlights) = self.highlights {
            if highlights.clip_length.is_zero() {
                return Err(ConfigError::ZeroDuration("replay clip length"));
            }
            if highlights.max_clips == 0 {
                return Err(ConfigError::ZeroReplayCapacity);
            }
        }
        Ok(())
    }

    /// Frame bound for continuous capture.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Time between captures.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Highlight cadence, when bursts are enabled.
    #[must_use]
    pub const fn highlights(&self) -> Option<HighlightCadence> {
        self.highlights
    }

    /// Most frames the buffer can hold under this configuration.
    #[must_use]
    pub fn frame_limit(&self) -> usize {
        match self.highlights {
            Some(highlights) => highlights
                .max_clips
                .saturating_mul(highlights.frames_per_clip(self.interval)),
            None => self.capacity,
        }
    }

    fn max_clips(&self) -> usize {
        self.highlights
            .map_or(self.capacity, |highlights| highlights.max_clips)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(300, Duration::from_millis(100)).with_highlights(HighlightCadence::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Burst {
    Recording { elapsed: Duration, taken: usize },
    Idle { elapsed: Duration },
}

impl Burst {
    const fn fresh() -> Self {
        Self::Recording {
            elapsed: Duration::ZERO,
            taken: 0,
        }
    }
}

/// Ring of the most recent clips, flattened oldest first.
#[derive(Clone, Debug)]
pub struct ReplayBuffer<T> {
    config: Config,
    frames: VecDeque<T>,
    clips: VecDeque<usize>,
    pending: Vec<T>,
    accumulator: Duration,
    burst: Burst,
    capturing: bool,
}

impl<T> ReplayBuffer<T> {
    /// Creates an idle, empty buffer.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            frames: VecDeque::with_capacity(config.frame_limit().min(4_096)),
            clips: VecDeque::new(),
            pending: Vec::new(),
            accumulator: Duration::ZERO,
            burst: Burst::fresh(),
            capturing: false,
        })
    }

    /// Begins capturing. Calling it while already capturing has no effect.
    ///
    /// Under a highlight cadence the first clip starts right away.
    pub fn start(&mut self) {
        if !self.capturing {
            debug!("replay capture started");
            self.capturing = true;
            self.accumulator = Duration::ZERO;
            self.burst = Burst::fresh();
            self.pending.clear();
        }
    }

    /// Stops capturing and keeps the stored clips. A clip still being recorded is
    /// discarded. Idempotent.
    pub fn stop(&mut self) {
        if self.capturing {
            debug!(
                frames = self.frames.len(),
                discarded = self.pending.len(),
                "replay capture stopped"
            );
            self.capturing = false;
            self.pending.clear();
        }
    }

    /// Reports whether ticks currently capture frames.
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Advances the capture timer and asks `source` for a frame when one is due.
    ///
    /// Returns `true` when a frame was captured. Highlight frames only become
    /// visible in [`frames`](Self::frames) once their clip completes.
    pub fn tick<S>(&mut self, dt: Duration, source: &mut S) -> bool
    where
        S: FrameSource<Frame = T> + ?Sized,
    {
        if !self.capturing {
            return false;
        }

        match self.config.highlights {
            Some(cadence) => self.tick_highlights(dt, cadence, source),
            None => self.tick_continuous(dt, source),
        }
    }

    fn tick_continuous<S>(&mut self, dt: Duration, source: &mut S) -> bool
    where
        S: FrameSource<Frame = T> + ?Sized,
    {
        self.accumulator = self.accumulator.saturating_add(dt);
        if self.accumulator < self.config.interval {
            return false;
        }

        let interval = self.config.interval.as_nanos();
        let leftover = self.accumulator.as_nanos() % interval;
        self.accumulator = Duration::from_nanos(u64::try_from(leftover).unwrap_or(0));

        match source.capture() {
            Some(frame) => {
                let _ = self.push(frame);
                true
            }
            None => {
                trace!("frame source produced nothing");
                false
            }
        }
    }

    fn tick_highlights<S>(
        &mut self,
        dt: Duration,
        cadence: HighlightCadence,
        source: &mut S,
    ) -> bool
    where
        S: FrameSource<Frame = T> + ?Sized,
    {
        let (elapsed, mut taken) = match self.burst {
            Burst::Idle { elapsed } => {
                let elapsed = elapsed.saturating_add(dt);
                if elapsed < cadence.gap {
                    self.burst = Burst::Idle { elapsed };
                    return false;
                }
                trace!("highlight clip started");
                (Duration::ZERO, 0)
            }
            Burst::Recording { elapsed, taken } => (elapsed.saturating_add(dt), taken),
        };

        let mut captured = false;
        let due = self.config.interval.as_nanos().saturating_mul(taken as u128);
        if taken < cadence.frames_per_clip(self.config.interval) && elapsed.as_nanos() >= due {
            taken += 1;
            match source.capture() {
                Some(frame) => {
                    self.pending.push(frame);
                    captured = true;
                }
                None => trace!("frame source produced nothing"),
            }
        }

        if elapsed >= cadence.clip_length {
            self.commit_clip();
            self.burst = Burst::Idle {
                elapsed: Duration::ZERO,
            };
        } else {
            self.burst = Burst::Recording { elapsed, taken };
        }
        captured
    }

    fn commit_clip(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let len = self.pending.len();
        self.frames.extend(self.pending.drain(..));
        self.clips.push_back(len);
        let evicted = self.evict();
        debug!(frames = len, evicted = evicted.len(), "highlight clip stored");
    }

    fn evict(&mut self) -> Vec<T> {
        let mut evicted = Vec::new();
        while self.clips.len() > self.config.max_clips() {
            let Some(len) = self.clips.pop_front() else {
                break;
            };
            let len = len.min(self.frames.len());
            evicted.extend(self.frames.drain(..len));
        }
        evicted
    }

    /// Stores `frame` as a clip of its own and returns the frames of any clip
    /// evicted to make room.
    pub fn push(&mut self, frame: T) -> Vec<T> {
        self.frames.push_back(frame);
        self.clips.push_back(1);
        self.evict()
    }

    /// Frames of every stored clip in insertion order, oldest first.
    pub fn frames(&self) -> impl ExactSizeIterator<Item = &T> + DoubleEndedIterator {
        self.frames.iter()
    }

    /// Frame at `index`, counting from the oldest.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.frames.get(index)
    }

    /// Number of stored frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Reports whether no frames are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of stored clips.
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Frame count of each stored clip, oldest first.
    pub fn clip_lengths(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.clips.iter().copied()
    }

    /// Maximum number of retained frames.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.config.frame_limit()
    }

    /// Time between two captured frames.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Drops every frame and stops capturing.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.clips.clear();
        self.pending.clear();
        self.accumulator = Duration::ZERO;
        self.burst = Burst::fresh();
        self.capturing = false;
    }

    /// Verifies that the buffer never exceeds its frame limit and that clip
    /// boundaries cover exactly the stored frames.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        let limit = self.config.frame_limit();
        let clipped: usize = self.clips.iter().sum();
        if self.frames.len() > limit || clipped != self.frames.len() {
            return Err(InvariantViolation::ReplayOverflow {
                len: self.frames.len(),
                capacity: limit,
            });
        }
        Ok(())
    }

    /// Cursor that loops over the stored frames at the capture rate.
    #[must_use]
    pub fn playback(&self) -> ReplayPlayback<'_, T> {
        ReplayPlayback {
            buffer: self,
            cursor: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Looping digest player over a [`ReplayBuffer`].
#[derive(Debug)]
pub struct ReplayPlayback<'a, T> {
    buffer: &'a ReplayBuffer<T>,
    cursor: usize,
    elapsed: Duration,
}

impl<'a, T> ReplayPlayback<'a, T> {
    /// Frame currently on screen, or `None` for an empty buffer.
    #[must_use]
    pub fn current(&self) -> Option<&'a T> {
        self.buffer.get(self.cursor)
    }

    /// Index of the current frame.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Advances playback by `dt`, wrapping to the oldest frame after the newest.
    pub fn advance(&mut self, dt: Duration) -> Option<&'a T> {
        let len = self.buffer.len();
        if len == 0 {
            return None;
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let interval = self.buffer.config.interval;
        while self.elapsed >= interval {
            self.elapsed -= interval;
            self.cursor = (self.cursor + 1) % len;
        }
        self.current()
    }
}
