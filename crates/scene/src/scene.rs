use cubescene_common::{ObjectId, Primitive, ScenePreset, Spin, TransformRecipe};
use glam::{Mat4, Vec3};
use std::f32::consts::TAU;

/// Wrap an angle into `[0, 2π)`. Non-finite input maps to 0.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// One drawable object: a fixed recipe and the world matrix derived from it.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    recipe: TransformRecipe,
    world: Mat4,
}

impl SceneObject {
    pub fn recipe(&self) -> &TransformRecipe {
        &self.recipe
    }

    /// Object-to-world matrix as of the last update.
    pub fn world(&self) -> Mat4 {
        self.world
    }
}

/// Transform state for the scene's objects.
///
/// Owns the angle accumulator. Objects are stored in declaration order,
/// which is also the order they are drawn in.
#[derive(Debug, Clone)]
pub struct SceneState {
    angle: f32,
    angular_rate: f32,
    objects: Vec<SceneObject>,
    updates: u64,
}

impl SceneState {
    /// An empty scene whose angle advances `angular_rate` radians per second.
    pub fn new(angular_rate: f32) -> Self {
        Self {
            angle: 0.0,
            angular_rate,
            objects: Vec::new(),
            updates: 0,
        }
    }

    pub fn from_preset(preset: ScenePreset, angular_rate: f32) -> Self {
        match preset {
            ScenePreset::SpinningCube => Self::spinning_cube(angular_rate),
            ScenePreset::TwoCubes => Self::two_cubes(angular_rate),
        }
    }

    /// A single cube turning about Y at the origin.
    pub fn spinning_cube(angular_rate: f32) -> Self {
        let mut scene = Self::new(angular_rate);
        scene.add_object(
            "cube",
            TransformRecipe::new().then(Primitive::rotate_y(Spin::Forward)),
        );
        scene
    }

    /// An orbiting cube and a counter-rotating, scaled cube at the centre.
    pub fn two_cubes(angular_rate: f32) -> Self {
        let mut scene = Self::new(angular_rate);
        scene.add_object(
            "orbiter",
            TransformRecipe::new()
                .then(Primitive::Translate(Vec3::new(0.0, 0.0, 4.0)))
                .then(Primitive::rotate_y(Spin::Forward)),
        );
        scene.add_object(
            "centre",
            TransformRecipe::new()
                .then(Primitive::rotate_y(Spin::Reverse))
                .then(Primitive::uniform_scale(1.3)),
        );
        scene
    }

    /// Append an object after all existing ones.
    pub fn add_object(&mut self, name: impl Into<String>, recipe: TransformRecipe) -> ObjectId {
        let id = ObjectId(self.objects.len());
        let world = recipe.compose(self.angle);
        self.objects.push(SceneObject {
            name: name.into(),
            recipe,
            world,
        });
        id
    }

    /// Advance the accumulator by `dt` seconds and rebuild every world matrix.
    ///
    /// A step that is not finite (NaN or infinite `dt`, or an overflowing
    /// product) leaves the angle where it was.
    pub fn update(&mut self, dt: f64) {
        let step = dt as f32 * self.angular_rate;
        if step.is_finite() {
            self.angle = wrap_angle(self.angle + step);
        } else {
            tracing::warn!(dt, "ignoring non-finite scene step");
        }
        for object in &mut self.objects {
            object.world = object.recipe.compose(self.angle);
        }
        self.updates += 1;
        tracing::trace!(angle = self.angle, update = self.updates, "scene updated");
    }

    /// Current accumulator value in radians.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn angular_rate(&self) -> f32 {
        self.angular_rate
    }

    /// Number of `update` calls so far.
    pub fn update_count(&self) -> u64 {
        self.updates
    }

    /// Objects in declaration order.
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_3;

    #[test]
    fn scene_starts_at_zero_angle() {
        let scene = SceneState::two_cubes(1.0);
        assert_eq!(scene.angle(), 0.0);
        assert_eq!(scene.object_count(), 2);
        assert_eq!(scene.update_count(), 0);
    }

    #[test]
    fn accumulator_is_rate_times_time() {
        let mut scene = SceneState::new(0.5);
        scene.update(2.0);
        assert!((scene.angle() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn accumulator_wraps_past_full_turn() {
        for (rate, t) in [(1.0_f32, 7.0_f64), (3.0, 5.0), (0.25, 100.0)] {
            let mut scene = SceneState::new(rate);
            scene.update(t);
            let expected = (rate * t as f32).rem_euclid(TAU);
            assert!((scene.angle() - expected).abs() < 1e-4);
            assert!(scene.angle() >= 0.0 && scene.angle() < TAU);
        }
    }

    #[test]
    fn negative_rate_stays_in_range() {
        let mut scene = SceneState::new(-1.0);
        scene.update(0.5);
        assert!((scene.angle() - (TAU - 0.5)).abs() < 1e-5);
    }

    #[test]
    fn wrap_angle_never_returns_full_turn() {
        assert_eq!(wrap_angle(TAU), 0.0);
        assert!(wrap_angle(-1e-9) < TAU);
        assert_eq!(wrap_angle(0.0), 0.0);
    }

    #[test]
    fn non_finite_dt_keeps_angle() {
        let mut scene = SceneState::two_cubes(1.0);
        scene.update(0.5);
        for dt in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            scene.update(dt);
            assert_eq!(scene.angle(), 0.5);
            assert!(scene.objects().iter().all(|o| o.world().is_finite()));
        }
        assert_eq!(wrap_angle(f32::NAN), 0.0);
        assert_eq!(wrap_angle(f32::INFINITY), 0.0);
    }

    #[test]
    fn orbiter_moves_on_circle() {
        let mut scene = SceneState::two_cubes(1.0);
        scene.update(FRAC_PI_3 as f64);
        let theta = scene.angle();
        let p = scene.objects()[0].world().transform_point3(Vec3::ZERO);
        let expected = Vec3::new(4.0 * theta.sin(), 0.0, 4.0 * theta.cos());
        assert!(p.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn centre_cube_counter_rotates() {
        let mut scene = SceneState::two_cubes(1.0);
        scene.update(0.4);
        let m = scene.objects()[1].world();
        let expected = Mat4::from_scale(Vec3::splat(1.3)) * Mat4::from_rotation_y(-0.4);
        assert!(m.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn worlds_are_recomputed_not_accumulated() {
        let mut a = SceneState::two_cubes(1.0);
        for _ in 0..100 {
            a.update(0.01);
        }
        let mut b = SceneState::two_cubes(1.0);
        b.update(1.0);
        assert!((a.angle() - b.angle()).abs() < 1e-4);
        for (x, y) in a.objects().iter().zip(b.objects()) {
            assert!(x.world().abs_diff_eq(y.world(), 1e-3));
        }
    }

    #[test]
    fn declaration_order_is_kept() {
        let mut scene = SceneState::new(1.0);
        let a = scene.add_object("a", TransformRecipe::new());
        let b = scene.add_object("b", TransformRecipe::new());
        assert_eq!(a, ObjectId(0));
        assert_eq!(b, ObjectId(1));
        let names: Vec<&str> = scene.objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(scene.get(b).map(|o| o.name.as_str()), Some("b"));
    }

    #[test]
    fn preset_spinning_cube_has_one_object() {
        let scene = SceneState::from_preset(ScenePreset::SpinningCube, 1.0);
        assert_eq!(scene.object_count(), 1);
    }
}
