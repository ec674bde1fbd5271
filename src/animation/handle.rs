use crate::animation::ease::Ease;
use crate::foundation::error::{LiikeError, LiikeResult};
use crate::scene::model::{NodeId, SceneTree, TransformValues};

/// Interpolation contract for animation value types.
pub trait Lerp: Sized {
    /// Interpolate from `a` to `b` with normalized factor `t` (may overshoot `[0, 1]`).
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for TransformValues {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let l = |x: f64, y: f64| f64::lerp(&x, &y, t);
        Self {
            translate_x: l(a.translate_x, b.translate_x),
            translate_y: l(a.translate_y, b.translate_y),
            scale: l(a.scale, b.scale),
            rotate_x: l(a.rotate_x, b.rotate_x),
            rotate_y: l(a.rotate_y, b.rotate_y),
            rotate_z: l(a.rotate_z, b.rotate_z),
            skew_x: l(a.skew_x, b.skew_x),
            skew_y: l(a.skew_y, b.skew_y),
            opacity: l(a.opacity, b.opacity).clamp(0.0, 1.0),
            blur: l(a.blur, b.blur).max(0.0),
        }
    }
}

/// One keyframe; `offset` is the fraction of an iteration in `[0, 1]`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keyframe<T> {
    pub offset: f64,
    pub value: T,
    /// Curve toward the next keyframe.
    #[serde(default)]
    pub ease: Ease,
}

/// Which side of the active interval keeps its boundary value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    None,
    Forwards,
    Backwards,
    #[default]
    Both,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Iterations {
    Count(f64),
    Infinite,
}

impl Default for Iterations {
    fn default() -> Self {
        Self::Count(1.0)
    }
}

/// Runtime state of a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleState {
    Running,
    Paused,
    /// The handle can no longer be controlled, but it can still be evaluated and committed.
    Invalid,
}

/// Declarative property animation attached to a node.
///
/// Evaluation is a pure function of the instant; `pause`, `seek` and `commit` only decide when
/// the evaluated value is written into the scene.
#[derive(Clone, Debug)]
pub struct AnimationHandle {
    pub node: NodeId,
    pub keyframes: Vec<Keyframe<TransformValues>>,
    /// Curve applied to the whole iteration before keyframe interpolation.
    pub easing: Ease,
    pub duration_ms: u64,
    /// Delay from timeline zero to the first iteration.
    pub start_offset_ms: u64,
    pub iterations: Iterations,
    pub fill: FillMode,
    state: HandleState,
    current_ms: u64,
}

impl AnimationHandle {
    pub fn new(
        node: NodeId,
        keyframes: Vec<Keyframe<TransformValues>>,
        easing: Ease,
        duration_ms: u64,
        start_offset_ms: u64,
    ) -> LiikeResult<Self> {
        let h = Self {
            node,
            keyframes,
            easing,
            duration_ms,
            start_offset_ms,
            iterations: Iterations::default(),
            fill: FillMode::default(),
            state: HandleState::Running,
            current_ms: 0,
        };
        h.validate()?;
        Ok(h)
    }

    /// Rejects a zero, negative or non-finite count.
    pub fn with_iterations(mut self, iterations: Iterations) -> LiikeResult<Self> {
        self.iterations = iterations;
        self.validate()?;
        Ok(self)
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn validate(&self) -> LiikeResult<()> {
        if self.keyframes.is_empty() {
            return Err(LiikeError::validation(
                "animation handle needs at least one keyframe",
            ));
        }
        if !self
            .keyframes
            .windows(2)
            .all(|w| w[0].offset <= w[1].offset)
        {
            return Err(LiikeError::validation(
                "keyframe offsets must be sorted ascending",
            ));
        }
        if self
            .keyframes
            .iter()
            .any(|k| !(0.0..=1.0).contains(&k.offset))
        {
            return Err(LiikeError::validation("keyframe offsets must lie in [0, 1]"));
        }
        if let Iterations::Count(n) = self.iterations
            && !(n.is_finite() && n > 0.0)
        {
            return Err(LiikeError::validation("iteration count must be finite and > 0"));
        }
        Ok(())
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn current_ms(&self) -> u64 {
        self.current_ms
    }

    /// Mark the handle uncontrollable (e.g. its runtime was torn down).
    pub fn invalidate(&mut self) {
        self.state = HandleState::Invalid;
    }

    pub fn pause(&mut self) -> LiikeResult<()> {
        match self.state {
            HandleState::Invalid => Err(LiikeError::validation(format!(
                "animation on node {} is in an invalid state and cannot pause",
                self.node.0
            ))),
            _ => {
                self.state = HandleState::Paused;
                Ok(())
            }
        }
    }

    pub fn seek(&mut self, instant_ms: u64) {
        self.current_ms = instant_ms;
    }

    /// Bake the value at the current time into the node's static style.
    pub fn commit(&self, tree: &mut SceneTree) -> LiikeResult<()> {
        let value = self.evaluate(self.current_ms);
        let node = tree.get_mut(self.node).ok_or_else(|| {
            LiikeError::validation(format!("animation target node {} is gone", self.node.0))
        })?;
        node.committed = value;
        Ok(())
    }

    /// Value at `instant_ms`, or `None` when the handle has no effect then (outside the active
    /// interval and not filling that side).
    pub fn evaluate(&self, instant_ms: u64) -> Option<TransformValues> {
        let progress = self.iteration_progress(instant_ms)?;
        Some(self.sample(self.easing.apply(progress)))
    }

    fn iteration_progress(&self, instant_ms: u64) -> Option<f64> {
        if instant_ms < self.start_offset_ms {
            return matches!(self.fill, FillMode::Backwards | FillMode::Both).then_some(0.0);
        }
        let local = (instant_ms - self.start_offset_ms) as f64;
        if self.duration_ms == 0 {
            return matches!(self.fill, FillMode::Forwards | FillMode::Both).then_some(1.0);
        }
        let overall = local / self.duration_ms as f64;
        match self.iterations {
            Iterations::Infinite => Some(overall.fract()),
            Iterations::Count(n) => {
                if overall >= n {
                    if !matches!(self.fill, FillMode::Forwards | FillMode::Both) {
                        return None;
                    }
                    let end = n.fract();
                    Some(if end == 0.0 { 1.0 } else { end })
                } else {
                    Some(overall.fract())
                }
            }
        }
    }

    fn sample(&self, p: f64) -> TransformValues {
        let keys = &self.keyframes;
        let idx = keys.partition_point(|k| k.offset <= p);
        if idx == 0 {
            return keys[0].value;
        }
        if idx >= keys.len() {
            return keys[keys.len() - 1].value;
        }
        let a = &keys[idx - 1];
        let b = &keys[idx];
        let span = b.offset - a.offset;
        if span <= 0.0 {
            return a.value;
        }
        let t = a.ease.apply((p - a.offset) / span);
        TransformValues::lerp(&a.value, &b.value, t)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/handle.rs"]
mod tests;
