//! Node animation clips and a single-clip player with fade in / fade out.

use glam::{Quat, Vec3};
use glint_common::Transform;

use crate::model::ModelAsset;

/// Fade duration used when a clip starts or stops.
pub const FADE_SECONDS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Sampled linearly on the value keys; tangents are discarded.
    CubicSpline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl ChannelValues {
    fn len(&self) -> usize {
        match self {
            ChannelValues::Translation(v) | ChannelValues::Scale(v) => v.len(),
            ChannelValues::Rotation(v) => v.len(),
        }
    }

    /// Keep every third element starting at 1 (in-tangent, value, out-tangent).
    fn strip_tangents(self) -> Self {
        fn values<T: Copy>(v: Vec<T>) -> Vec<T> {
            v.into_iter().skip(1).step_by(3).collect()
        }
        match self {
            ChannelValues::Translation(v) => ChannelValues::Translation(values(v)),
            ChannelValues::Rotation(v) => ChannelValues::Rotation(values(v)),
            ChannelValues::Scale(v) => ChannelValues::Scale(values(v)),
        }
    }
}

/// Keyframes targeting one property of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub node: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

impl Channel {
    pub fn new(
        node: usize,
        interpolation: Interpolation,
        times: Vec<f32>,
        values: ChannelValues,
    ) -> Self {
        let values = if interpolation == Interpolation::CubicSpline {
            values.strip_tangents()
        } else {
            values
        };
        Self {
            node,
            interpolation,
            times,
            values,
        }
    }

    /// Bracketing key indices and blend factor for time `t`.
    fn locate(&self, t: f32) -> Option<(usize, usize, f32)> {
        let n = self.times.len().min(self.values.len());
        if n == 0 {
            return None;
        }
        if n == 1 || t <= self.times[0] {
            return Some((0, 0, 0.0));
        }
        if t >= self.times[n - 1] {
            return Some((n - 1, n - 1, 0.0));
        }
        let hi = self.times[..n].partition_point(|&k| k <= t);
        let lo = hi - 1;
        let span = self.times[hi] - self.times[lo];
        let f = if span > 0.0 {
            (t - self.times[lo]) / span
        } else {
            0.0
        };
        let f = if self.interpolation == Interpolation::Step {
            0.0
        } else {
            f
        };
        Some((lo, hi, f))
    }

    /// Write this channel's value at time `t` into `target`.
    pub fn apply(&self, t: f32, target: &mut Transform) {
        let Some((lo, hi, f)) = self.locate(t) else {
            return;
        };
        match &self.values {
            ChannelValues::Translation(v) => target.position = v[lo].lerp(v[hi], f),
            ChannelValues::Scale(v) => target.scale = v[lo].lerp(v[hi], f),
            ChannelValues::Rotation(v) => target.rotation = v[lo].slerp(v[hi], f).normalize(),
        }
    }
}

/// A named set of channels.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: String, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0f32, f32::max);
        Self {
            name,
            duration,
            channels,
        }
    }

    /// Pose of every node at time `t`, starting from `rest`.
    pub fn sample(&self, t: f32, rest: &[Transform]) -> Vec<Transform> {
        let mut pose = rest.to_vec();
        for ch in &self.channels {
            if let Some(target) = pose.get_mut(ch.node) {
                ch.apply(t, target);
            }
        }
        pose
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fade {
    None,
    In,
    Out,
}

/// Plays one looping clip of a model with a cross-fade from the rest pose.
#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    clip: usize,
    time: f32,
    weight: f32,
    fade: Fade,
}

impl AnimationPlayer {
    /// Start the requested clip, clamped to the last available one.
    /// Returns `None` when the model has no animations.
    pub fn autoplay(model: &ModelAsset, index: usize) -> Option<Self> {
        if model.animations.is_empty() {
            return None;
        }
        let clip = index.min(model.animations.len() - 1);
        tracing::debug!("autoplay clip {} ({})", clip, model.animations[clip].name);
        Some(Self {
            clip,
            time: 0.0,
            weight: 0.0,
            fade: Fade::In,
        })
    }

    pub fn clip_index(&self) -> usize {
        self.clip
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Begin fading out; the player reports finished once the weight hits zero.
    pub fn stop(&mut self) {
        self.fade = Fade::Out;
    }

    pub fn is_finished(&self) -> bool {
        self.fade == Fade::Out && self.weight <= 0.0
    }

    pub fn update(&mut self, dt: f32, model: &ModelAsset) {
        let duration = model
            .animations
            .get(self.clip)
            .map(|c| c.duration)
            .unwrap_or(0.0);
        self.time += dt;
        if duration > 0.0 {
            self.time %= duration;
        }
        let step = dt / FADE_SECONDS;
        match self.fade {
            Fade::In => {
                self.weight = (self.weight + step).min(1.0);
                if self.weight >= 1.0 {
                    self.fade = Fade::None;
                }
            }
            Fade::Out => self.weight = (self.weight - step).max(0.0),
            Fade::None => {}
        }
    }

    /// Local transforms of all nodes: rest pose blended towards the clip.
    pub fn sample(&self, model: &ModelAsset) -> Vec<Transform> {
        let rest = model.rest_pose();
        let Some(clip) = model.animations.get(self.clip) else {
            return rest;
        };
        let animated = clip.sample(self.time, &rest);
        rest.iter()
            .zip(animated.iter())
            .map(|(r, a)| r.lerp(a, self.weight))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fixtures, import_glb};

    fn slide() -> Channel {
        Channel::new(
            0,
            Interpolation::Linear,
            vec![0.0, 2.0],
            ChannelValues::Translation(vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]),
        )
    }

    #[test]
    fn linear_channel_interpolates() {
        let mut t = Transform::default();
        slide().apply(1.0, &mut t);
        assert_eq!(t.position, Vec3::new(2.0, 0.0, 0.0));
        slide().apply(5.0, &mut t);
        assert_eq!(t.position, Vec3::new(4.0, 0.0, 0.0));
        slide().apply(-1.0, &mut t);
        assert_eq!(t.position, Vec3::ZERO);
    }

    #[test]
    fn step_channel_holds() {
        let ch = Channel {
            interpolation: Interpolation::Step,
            ..slide()
        };
        let mut t = Transform::default();
        ch.apply(1.9, &mut t);
        assert_eq!(t.position, Vec3::ZERO);
    }

    #[test]
    fn cubic_spline_keeps_values_only() {
        let ch = Channel::new(
            0,
            Interpolation::CubicSpline,
            vec![0.0, 1.0],
            ChannelValues::Scale(vec![
                Vec3::ZERO,
                Vec3::ONE,
                Vec3::ZERO,
                Vec3::ZERO,
                Vec3::splat(3.0),
                Vec3::ZERO,
            ]),
        );
        assert_eq!(
            ch.values,
            ChannelValues::Scale(vec![Vec3::ONE, Vec3::splat(3.0)])
        );
    }

    #[test]
    fn autoplay_clamps_index() {
        let model = import_glb("tri.glb", &fixtures::triangle_glb()).unwrap();
        let player = AnimationPlayer::autoplay(&model, 7).unwrap();
        assert_eq!(player.clip_index(), 0);
        assert_eq!(model.animations[0].duration, 2.0);

        let empty = ModelAsset::default();
        assert!(AnimationPlayer::autoplay(&empty, 0).is_none());
    }

    #[test]
    fn fade_in_blends_from_rest() {
        let model = import_glb("tri.glb", &fixtures::triangle_glb()).unwrap();
        let mut player = AnimationPlayer::autoplay(&model, 0).unwrap();
        // time 1.0 of the slide clip is x = 2; halfway through the fade.
        player.update(0.25, &model);
        player.update(0.75, &model);
        assert_eq!(player.weight(), 1.0);
        let pose = player.sample(&model);
        assert!((pose[0].position.x - 2.0).abs() < 1e-5);

        let mut fresh = AnimationPlayer::autoplay(&model, 0).unwrap();
        fresh.update(0.25, &model);
        assert!((fresh.weight() - 0.5).abs() < 1e-5);
        let pose = fresh.sample(&model);
        // rest x = 0, animated x = 0.5 at t = 0.25, half weight
        assert!((pose[0].position.x - 0.25).abs() < 1e-5);
    }

    #[test]
    fn clip_loops_and_fades_out() {
        let model = import_glb("tri.glb", &fixtures::triangle_glb()).unwrap();
        let mut player = AnimationPlayer::autoplay(&model, 0).unwrap();
        player.update(2.5, &model);
        assert!((player.time() - 0.5).abs() < 1e-5);
        player.stop();
        assert!(!player.is_finished());
        player.update(0.5, &model);
        assert!(player.is_finished());
    }
}
