use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Position of an object in scene declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which way a rotation primitive follows the shared angle accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spin {
    Forward,
    Reverse,
}

impl Spin {
    pub fn apply(self, angle: f32) -> f32 {
        match self {
            Self::Forward => angle,
            Self::Reverse => -angle,
        }
    }
}

/// One primitive transform step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Translate(Vec3),
    /// Rotation about `axis` by the scene's current angle.
    Rotate { axis: Vec3, spin: Spin },
    Scale(Vec3),
}

impl Primitive {
    pub fn rotate_y(spin: Spin) -> Self {
        Self::Rotate { axis: Vec3::Y, spin }
    }

    pub fn uniform_scale(factor: f32) -> Self {
        Self::Scale(Vec3::splat(factor))
    }

    /// Matrix for this step given the scene angle in radians.
    pub fn matrix(&self, angle: f32) -> Mat4 {
        match *self {
            Self::Translate(offset) => Mat4::from_translation(offset),
            Self::Rotate { axis, spin } => {
                let axis = axis.try_normalize().unwrap_or(Vec3::Y);
                Mat4::from_axis_angle(axis, spin.apply(angle))
            }
            Self::Scale(factors) => Mat4::from_scale(factors),
        }
    }
}

/// Ordered primitive steps making up an object-to-world transform.
///
/// Steps apply to a point first-to-last, which is the row-vector product
/// `steps[0] × steps[1] × ...`. With glam's column vectors that is the
/// reversed product, so `compose` left-multiplies each step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformRecipe {
    steps: Vec<Primitive>,
}

impl TransformRecipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step applied after all existing ones.
    pub fn then(mut self, step: Primitive) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[Primitive] {
        &self.steps
    }

    /// Full object-to-world matrix for the given angle.
    pub fn compose(&self, angle: f32) -> Mat4 {
        self.steps
            .iter()
            .fold(Mat4::IDENTITY, |acc, step| step.matrix(angle) * acc)
    }
}
