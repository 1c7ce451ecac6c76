//! Animation channels as read from a source, and their merging into keyframes that carry
//! translation, rotation, and scale together.

use std::{cmp::Ordering, collections::BTreeMap};

use glam::{Quat, Vec3};
use log::warn;

use super::scene::AnimationKey;

/// Channels with more keys than this are reported as suspicious.
pub const MAX_EXPECTED_KEYS: usize = 10_000;

/// The sample rate assumed when a source does not specify one.
pub const DEFAULT_SAMPLE_RATE: f64 = 30.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorKey {
    pub time: f64,
    pub value: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuatKey {
    pub time: f64,
    pub value: Quat,
}

/// The separate transform channels that animate a single node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeChannels {
    /// The name of the animated node. It may be empty when the source is malformed.
    pub name: String,
    pub translations: Vec<VectorKey>,
    pub rotations: Vec<QuatKey>,
    pub scales: Vec<VectorKey>,
}

impl NodeChannels {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn key_count(&self) -> usize {
        self.translations.len() + self.rotations.len() + self.scales.len()
    }
}

/// An animation as read from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSet {
    pub name: String,
    /// The duration of the animation, in seconds.
    pub duration: f64,
    pub sample_rate: f64,
    pub channels: Vec<NodeChannels>,
}

impl AnimationSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            duration: 0.,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: Vec::new(),
        }
    }
}

/// A key time with a total order. Negative zero is folded into zero.
#[derive(Debug, Clone, Copy, PartialEq)]
struct KeyTime(f64);

impl KeyTime {
    fn new(time: f64) -> Self {
        Self(time + 0.)
    }
}

impl Eq for KeyTime {}

impl PartialOrd for KeyTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Merges the channels of a node into keyframes sorted by strictly increasing time.
///
/// Each key time of any channel yields one keyframe. Components without a key at that
/// exact time keep their identity value, so no interpolation happens. When a channel
/// repeats a time, its last key wins.
pub fn merge(channels: &NodeChannels) -> Vec<AnimationKey> {
    if channels.key_count() > MAX_EXPECTED_KEYS {
        warn!(
            "Animation channel \"{}\" has {} keys, which is unusually large",
            channels.name,
            channels.key_count()
        );
    }

    let mut keys = BTreeMap::new();
    for key in &channels.rotations {
        key_at(&mut keys, key.time).rotation = key.value;
    }
    for key in &channels.translations {
        key_at(&mut keys, key.time).translation = key.value;
    }
    for key in &channels.scales {
        key_at(&mut keys, key.time).scale = key.value;
    }

    keys.into_values().collect()
}

fn key_at(keys: &mut BTreeMap<KeyTime, AnimationKey>, time: f64) -> &mut AnimationKey {
    let time = KeyTime::new(time);
    keys.entry(time).or_insert_with(|| AnimationKey::at(time.0))
}

/// Samples merged keyframes at a fixed rate over `[0, duration]`.
///
/// Translations and scales are interpolated linearly and rotations spherically. Times
/// before the first key or after the last one clamp to those keys. Fewer than two keys,
/// or a non-positive rate, leave the keys as they are.
pub fn resample_track(keys: &[AnimationKey], duration: f64, fps: f64) -> Vec<AnimationKey> {
    if keys.len() < 2 || fps <= 0. {
        return keys.to_vec();
    }

    let duration = if duration > 0. {
        duration
    } else {
        keys[keys.len() - 1].time
    };
    let frames = (duration * fps).round().max(0.) as usize;
    (0..=frames)
        .map(|frame| sample(keys, (frame as f64 / fps).min(duration)))
        .collect()
}

/// Evaluates sorted keyframes at the given time.
pub fn sample(keys: &[AnimationKey], time: f64) -> AnimationKey {
    let next = keys.partition_point(|key| key.time <= time);
    if next == 0 {
        return AnimationKey { time, ..keys[0] };
    }
    if next == keys.len() {
        return AnimationKey {
            time,
            ..keys[keys.len() - 1]
        };
    }

    let (a, b) = (&keys[next - 1], &keys[next]);
    let factor = ((time - a.time) / (b.time - a.time)) as f32;
    AnimationKey {
        time,
        translation: a.translation.lerp(b.translation, factor),
        rotation: a.rotation.slerp(b.rotation, factor),
        scale: a.scale.lerp(b.scale, factor),
    }
}
