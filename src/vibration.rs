//! Force-feedback intensities and keyframed vibration sequences.
//!
//! [`Vibration`] is a pair of normalized motor levels (`[0, 1]` each). Controllers convert it
//! to the native 16-bit motor speeds when it is sent.
//!
//! [`VibrationSequence`] is a time-keyed table of keyframes (milliseconds). Querying a time
//! between two keyframes linearly interpolates them; querying outside the table yields zero,
//! or wraps around when the sequence loops. Missing neighbours count as zero, so a sequence
//! ramps in from silence at `t = 0` without an explicit zero keyframe.
//!
//! ```
//! use padstate::vibration::{Vibration, VibrationSequence};
//!
//! let mut seq = VibrationSequence::new();
//! seq.add(0, Vibration::ZERO).unwrap();
//! seq.add(100, Vibration::FULL).unwrap();
//! assert_eq!(seq.at(50), Vibration::new(0.5, 0.5).unwrap());
//! assert_eq!(seq.at(200), Vibration::ZERO);
//! ```

use crate::error::{InputError, Result};
use serde::{Deserialize, Serialize};

/// Normalized left/right motor levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vibration {
    left_motor: f32,
    right_motor: f32,
}

impl Vibration {
    pub const ZERO: Vibration = Vibration {
        left_motor: 0.0,
        right_motor: 0.0,
    };

    pub const FULL: Vibration = Vibration {
        left_motor: 1.0,
        right_motor: 1.0,
    };

    /// Both levels must lie in `[0, 1]`; out-of-range values are rejected, not clamped.
    pub fn new(left_motor: f32, right_motor: f32) -> Result<Self> {
        for v in [left_motor, right_motor] {
            if !(0.0..=1.0).contains(&v) {
                return Err(InputError::IntensityOutOfRange(v));
            }
        }
        Ok(Self {
            left_motor,
            right_motor,
        })
    }

    /// Low-frequency (heavy) motor.
    #[inline]
    pub fn left_motor(&self) -> f32 {
        self.left_motor
    }

    /// High-frequency (light) motor.
    #[inline]
    pub fn right_motor(&self) -> f32 {
        self.right_motor
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.left_motor == 0.0 && self.right_motor == 0.0
    }

    /// Per-motor linear interpolation; `amount` of 0 yields `from`, 1 yields `to`.
    pub fn lerp(from: Vibration, to: Vibration, amount: f32) -> Vibration {
        Vibration {
            left_motor: from.left_motor + (to.left_motor - from.left_motor) * amount,
            right_motor: from.right_motor + (to.right_motor - from.right_motor) * amount,
        }
    }

    /// Native `XINPUT_VIBRATION` speeds (`0..=65535`).
    pub fn to_motor_speeds(self) -> (u16, u16) {
        let scale = |v: f32| (v * u16::MAX as f32).round() as u16;
        (scale(self.left_motor), scale(self.right_motor))
    }

    pub fn from_motor_speeds(left: u16, right: u16) -> Vibration {
        Vibration {
            left_motor: left as f32 / u16::MAX as f32,
            right_motor: right as f32 / u16::MAX as f32,
        }
    }
}

/// Anything that yields a vibration for a time offset (milliseconds since it started).
pub trait VibrationEffect: Send + Sync {
    fn at(&self, time: i64) -> Vibration;

    /// `true` once `time` lies past the end of an effect that does not repeat.
    fn is_finished(&self, _time: i64) -> bool {
        false
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Keyframe {
    time: u32,
    vibration: Vibration,
}

/// Ordered keyframe timeline.
///
/// Keyframes are kept strictly increasing by time; adding at an existing time replaces that
/// keyframe in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SequenceDef", into = "SequenceDef")]
pub struct VibrationSequence {
    keyframes: Vec<Keyframe>,
    last_frame_time: Option<u32>,
    loops: bool,
}

impl VibrationSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn looping() -> Self {
        Self {
            loops: true,
            ..Self::default()
        }
    }

    /// Time of the last keyframe, `None` while the sequence is empty.
    #[inline]
    pub fn last_frame_time(&self) -> Option<u32> {
        self.last_frame_time
    }

    #[inline]
    pub fn loops(&self) -> bool {
        self.loops
    }

    pub fn set_loops(&mut self, loops: bool) {
        self.loops = loops;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Insert a keyframe at `time` ms, or replace the one already there.
    pub fn add(&mut self, time: i64, vibration: Vibration) -> Result<()> {
        let time = keyframe_time(time)?;
        match self.keyframes.binary_search_by_key(&time, |k| k.time) {
            Ok(i) => self.keyframes[i].vibration = vibration,
            Err(i) => self.keyframes.insert(i, Keyframe { time, vibration }),
        }
        if self.last_frame_time.map_or(true, |last| time > last) {
            self.last_frame_time = Some(time);
        }
        Ok(())
    }

    /// Remove the keyframe at `time`. Returns whether one was there.
    pub fn remove(&mut self, time: i64) -> Result<bool> {
        let time = keyframe_time(time)?;
        let Ok(i) = self.keyframes.binary_search_by_key(&time, |k| k.time) else {
            return Ok(false);
        };
        self.keyframes.remove(i);
        if i == self.keyframes.len() {
            self.last_frame_time = self.keyframes.last().map(|k| k.time);
        }
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.keyframes.clear();
        self.last_frame_time = None;
    }

    pub fn keyframe_times(&self) -> Vec<u32> {
        self.keyframes.iter().map(|k| k.time).collect()
    }

    pub fn is_keyframe(&self, time: i64) -> Result<bool> {
        let time = keyframe_time(time)?;
        Ok(self
            .keyframes
            .binary_search_by_key(&time, |k| k.time)
            .is_ok())
    }

    /// Interpolated vibration at `time` ms.
    ///
    /// Negative times and times past the end of a non-looping sequence are silent. A looping
    /// sequence wraps with a period of `last_frame_time + 1`.
    pub fn at(&self, time: i64) -> Vibration {
        if time < 0 {
            return Vibration::ZERO;
        }
        let Some(last) = self.last_frame_time else {
            return Vibration::ZERO;
        };

        let mut time = time;
        if time > last as i64 {
            if !self.loops {
                return Vibration::ZERO;
            }
            time %= last as i64 + 1;
        }
        // In range now: 0 <= time <= last.
        let time = time as u32;

        let i = match self.keyframes.binary_search_by_key(&time, |k| k.time) {
            Ok(i) => return self.keyframes[i].vibration,
            Err(i) => i,
        };

        let (prev_time, prev) = match i.checked_sub(1).map(|p| self.keyframes[p]) {
            Some(k) => (k.time, k.vibration),
            None => (0, Vibration::ZERO),
        };
        let (next_time, next) = match self.keyframes.get(i) {
            Some(k) => (k.time, k.vibration),
            None => (last, Vibration::ZERO),
        };

        if next_time <= prev_time {
            return prev;
        }
        let amount = (time - prev_time) as f32 / (next_time - prev_time) as f32;
        Vibration::lerp(prev, next, amount)
    }
}

impl VibrationEffect for VibrationSequence {
    fn at(&self, time: i64) -> Vibration {
        VibrationSequence::at(self, time)
    }

    fn is_finished(&self, time: i64) -> bool {
        !self.loops && self.last_frame_time.map_or(true, |last| time > last as i64)
    }
}

fn keyframe_time(time: i64) -> Result<u32> {
    if time < 0 {
        return Err(InputError::NegativeTime(time));
    }
    u32::try_from(time).map_err(|_| InputError::TimeOutOfRange(time))
}

/// Serialized form: `{ loops, keyframes = [{ time, left, right }, ...] }`.
#[derive(Serialize, Deserialize)]
struct SequenceDef {
    #[serde(default)]
    loops: bool,
    #[serde(default)]
    keyframes: Vec<KeyframeDef>,
}

#[derive(Serialize, Deserialize)]
struct KeyframeDef {
    time: i64,
    left: f32,
    right: f32,
}

impl TryFrom<SequenceDef> for VibrationSequence {
    type Error = InputError;

    fn try_from(def: SequenceDef) -> Result<Self> {
        let mut seq = VibrationSequence::new();
        seq.loops = def.loops;
        for k in def.keyframes {
            seq.add(k.time, Vibration::new(k.left, k.right)?)?;
        }
        Ok(seq)
    }
}

impl From<VibrationSequence> for SequenceDef {
    fn from(seq: VibrationSequence) -> Self {
        SequenceDef {
            loops: seq.loops,
            keyframes: seq
                .keyframes
                .iter()
                .map(|k| KeyframeDef {
                    time: k.time as i64,
                    left: k.vibration.left_motor,
                    right: k.vibration.right_motor,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(l: f32, r: f32) -> Vibration {
        Vibration::new(l, r).unwrap()
    }

    fn ramp(loops: bool) -> VibrationSequence {
        let mut seq = VibrationSequence::new();
        seq.set_loops(loops);
        seq.add(0, Vibration::ZERO).unwrap();
        seq.add(100, Vibration::FULL).unwrap();
        seq
    }

    #[test]
    fn midpoint_of_ramp_is_half() {
        let seq = ramp(false);
        assert_eq!(seq.at(50), v(0.5, 0.5));
        assert_eq!(seq.at(200), Vibration::ZERO);
    }

    #[test]
    fn duplicate_time_replaces_in_place() {
        let mut seq = ramp(false);
        seq.add(100, v(0.25, 0.75)).unwrap();

        assert_eq!(seq.keyframe_times(), vec![0, 100]);
        assert_eq!(seq.at(100), v(0.25, 0.75));
    }

    #[test]
    fn samples_are_returned_exactly() {
        let mut seq = VibrationSequence::new();
        let frames = [(7, v(0.1, 0.3)), (33, v(0.7, 0.2)), (1000, v(0.9, 0.9))];
        for (t, x) in frames {
            seq.add(t, x).unwrap();
        }
        for (t, x) in frames {
            assert_eq!(seq.at(t), x);
        }
    }

    #[test]
    fn insertion_keeps_times_sorted() {
        let mut seq = VibrationSequence::new();
        for t in [50, 10, 30, 20, 40] {
            seq.add(t, Vibration::FULL).unwrap();
        }
        assert_eq!(seq.keyframe_times(), vec![10, 20, 30, 40, 50]);
        assert_eq!(seq.last_frame_time(), Some(50));
    }

    #[test]
    fn looping_wraps_with_period_last_plus_one() {
        let seq = ramp(true);
        assert_eq!(seq.at(150), seq.at(49));
        assert_eq!(seq.at(101), seq.at(0));
        assert_eq!(seq.at(201), seq.at(100));
    }

    #[test]
    fn non_looping_tail_is_silent() {
        let seq = ramp(false);
        assert_eq!(seq.at(101), Vibration::ZERO);
        assert_eq!(seq.at(150), Vibration::ZERO);
    }

    #[test]
    fn empty_sequence_is_silent() {
        let mut seq = VibrationSequence::looping();
        for t in [-5, 0, 1, 10_000] {
            assert_eq!(seq.at(t), Vibration::ZERO);
        }
        seq.add(10, Vibration::FULL).unwrap();
        seq.clear();
        assert_eq!(seq.at(10), Vibration::ZERO);
        assert_eq!(seq.last_frame_time(), None);
    }

    #[test]
    fn negative_times_are_rejected_but_query_is_zero() {
        let mut seq = ramp(false);
        assert!(matches!(
            seq.add(-1, Vibration::FULL),
            Err(InputError::NegativeTime(-1))
        ));
        assert!(matches!(seq.remove(-1), Err(InputError::NegativeTime(-1))));
        assert!(matches!(seq.is_keyframe(-1), Err(InputError::NegativeTime(-1))));
        assert_eq!(seq.at(-1), Vibration::ZERO);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn missing_previous_neighbour_ramps_from_zero() {
        let mut seq = VibrationSequence::new();
        seq.add(100, Vibration::FULL).unwrap();

        assert_eq!(seq.at(0), Vibration::ZERO);
        assert_eq!(seq.at(25), v(0.25, 0.25));
    }

    #[test]
    fn removing_last_keyframe_recomputes_end() {
        let mut seq = ramp(false);
        seq.add(40, v(0.4, 0.4)).unwrap();

        assert!(seq.remove(100).unwrap());
        assert_eq!(seq.last_frame_time(), Some(40));
        assert_eq!(seq.at(60), Vibration::ZERO);

        assert!(!seq.remove(100).unwrap());
        assert!(seq.remove(0).unwrap());
        assert_eq!(seq.last_frame_time(), Some(40));
        assert!(seq.remove(40).unwrap());
        assert_eq!(seq.last_frame_time(), None);
        assert!(seq.is_empty());
    }

    #[test]
    fn is_keyframe_reports_membership() {
        let seq = ramp(false);
        assert!(seq.is_keyframe(0).unwrap());
        assert!(seq.is_keyframe(100).unwrap());
        assert!(!seq.is_keyframe(50).unwrap());
    }

    #[test]
    fn out_of_range_intensity_is_rejected() {
        assert!(matches!(
            Vibration::new(1.5, 0.0),
            Err(InputError::IntensityOutOfRange(x)) if x == 1.5
        ));
        assert!(Vibration::new(0.0, -0.1).is_err());
        assert!(Vibration::new(f32::NAN, 0.0).is_err());
    }

    #[test]
    fn motor_speeds_cover_full_range() {
        assert_eq!(Vibration::FULL.to_motor_speeds(), (65535, 65535));
        assert_eq!(Vibration::ZERO.to_motor_speeds(), (0, 0));
        assert_eq!(Vibration::from_motor_speeds(65535, 0), v(1.0, 0.0));
    }

    #[test]
    fn sequence_is_finished_only_when_not_looping() {
        let once = ramp(false);
        assert!(!once.is_finished(100));
        assert!(once.is_finished(101));
        assert!(!ramp(true).is_finished(10_000));
    }

    #[test]
    fn deserialized_sequence_is_sorted_and_validated() {
        let seq: VibrationSequence = serde_json::from_str(
            r#"{"loops":true,"keyframes":[{"time":100,"left":1.0,"right":0.5},{"time":0,"left":0.0,"right":0.0}]}"#,
        )
        .unwrap();
        assert!(seq.loops());
        assert_eq!(seq.keyframe_times(), vec![0, 100]);

        let bad = serde_json::from_str::<VibrationSequence>(
            r#"{"keyframes":[{"time":-3,"left":0.0,"right":0.0}]}"#,
        );
        assert!(bad.is_err());
    }
}
