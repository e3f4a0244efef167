use std::fmt::{self, Display, Formatter};

/// Frame rate basis declared by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeMode {
    Frames24,
    Frames25,
    #[default]
    Frames30,
    Frames48,
    Frames50,
    Frames60,
    Frames120,
    Custom(f64),
}

impl TimeMode {
    pub fn frames_per_second(self) -> f64 {
        match self {
            TimeMode::Frames24 => 24.0,
            TimeMode::Frames25 => 25.0,
            TimeMode::Frames30 => 30.0,
            TimeMode::Frames48 => 48.0,
            TimeMode::Frames50 => 50.0,
            TimeMode::Frames60 => 60.0,
            TimeMode::Frames120 => 120.0,
            TimeMode::Custom(fps) => fps,
        }
    }

    /// Pick the named mode matching a frame rate, falling back to a custom one.
    pub fn from_frames_per_second(fps: f64) -> Self {
        [
            TimeMode::Frames24,
            TimeMode::Frames25,
            TimeMode::Frames30,
            TimeMode::Frames48,
            TimeMode::Frames50,
            TimeMode::Frames60,
            TimeMode::Frames120,
        ]
        .into_iter()
        .find(|mode| (mode.frames_per_second() - fps).abs() < 1e-9)
        .unwrap_or(TimeMode::Custom(fps))
    }
}

impl Display for TimeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} fps", self.frames_per_second())
    }
}

/// A point on the scene timeline, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SceneTime(pub f64);

impl SceneTime {
    pub const ZERO: SceneTime = SceneTime(0.0);

    pub fn from_seconds(seconds: f64) -> Self {
        Self(seconds)
    }

    pub fn from_frame(frame: i64, mode: TimeMode) -> Self {
        Self(frame as f64 / mode.frames_per_second())
    }

    pub fn seconds(self) -> f64 {
        self.0
    }

    /// Whole frames elapsed at this time, truncated toward negative infinity.
    pub fn frame_count(self, mode: TimeMode) -> i64 {
        // Absorb rounding noise so that a time built from frame N maps back to N.
        (self.0 * mode.frames_per_second() + 1e-6).floor() as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeSpan {
    pub start: SceneTime,
    pub stop: SceneTime,
}

impl TimeSpan {
    pub fn new(start: SceneTime, stop: SceneTime) -> Self {
        Self { start, stop }
    }
}

#[cfg(test)]
mod test {
    use super::{SceneTime, TimeMode};

    #[test]
    fn test_frame_round_trip() {
        for mode in [TimeMode::Frames24, TimeMode::Frames30, TimeMode::Custom(29.97)] {
            for frame in [-3, 0, 1, 7, 100, 12345] {
                let time = SceneTime::from_frame(frame, mode);
                assert_eq!(time.frame_count(mode), frame);
            }
        }
    }

    #[test]
    fn test_named_mode_lookup() {
        assert_eq!(TimeMode::from_frames_per_second(60.0), TimeMode::Frames60);
        assert_eq!(TimeMode::from_frames_per_second(15.0), TimeMode::Custom(15.0));
    }
}
