//! # Animation playback seam.
//!
//! The instrument only decides *which* clip plays, in which direction and from
//! which normalized time; playback belongs to the host. The reported duration is
//! what the deploy/retract sequences wait on.

use std::time::Duration;

/// Playback direction of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the deployed pose (+1).
    Extend,
    /// Towards the stowed pose (-1).
    Retract,
}

impl Direction {
    /// `+1.0` or `-1.0`.
    #[inline]
    pub fn sign(self) -> f32 {
        match self {
            Direction::Extend => 1.0,
            Direction::Retract => -1.0,
        }
    }

    /// Normalized time a clip starts from when played in this direction.
    #[inline]
    pub fn start_time(self) -> f32 {
        match self {
            Direction::Extend => 0.0,
            Direction::Retract => 1.0,
        }
    }

    /// Normalized time of the pose a clip rests in after playing this way.
    #[inline]
    pub fn end_time(self) -> f32 {
        1.0 - self.start_time()
    }
}

/// Plays named, timed transitions.
///
/// ### Implementation requirements
/// - Unknown clips must be ignored and report `Duration::ZERO`.
/// - If the clip is already playing, only speed/direction should change.
pub trait Animator: Send {
    /// Plays `clip` at `speed` (always positive) in `direction`, starting at the
    /// normalized time `start` (0 = stowed, 1 = deployed). Returns the clip length.
    fn play(&mut self, clip: &str, direction: Direction, speed: f32, start: f32) -> Duration;
}

/// Animator for hosts without visuals: every clip is instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnimator;

impl Animator for NoAnimator {
    fn play(&mut self, _clip: &str, _direction: Direction, _speed: f32, _start: f32) -> Duration {
        Duration::ZERO
    }
}
