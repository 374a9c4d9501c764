use crate::ecs::Entity;
use crate::geometry::Vec2;

/// Distance under which a camera move snaps onto its target.
pub const ARRIVAL_THRESHOLD: f32 = 0.5;

/// World point the view is centred on, optionally locked to an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera {
    pub position: Vec2,
    following: Option<Entity>,
}

impl Camera {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            following: None,
        }
    }

    pub fn following(&self) -> Option<Entity> {
        self.following
    }

    pub fn follow(&mut self, entity: Entity) {
        self.following = Some(entity);
    }

    pub fn stop_following(&mut self) {
        self.following = None;
    }

    /// Scripted pan; detaches from any follow target. Returns `true` on arrival.
    pub fn move_toward(&mut self, target: Vec2, speed: f32, dt: f32) -> bool {
        self.following = None;
        let (next, arrived) = step_toward(self.position, target, speed, dt, ARRIVAL_THRESHOLD);
        self.position = next;
        arrived
    }

    /// Snaps onto the followed entity's focus point, if there is one.
    pub fn update_follow(&mut self, focus: Option<Vec2>) {
        if self.following.is_none() {
            return;
        }
        if let Some(focus) = focus {
            self.position = focus;
        }
    }
}

pub fn step_toward(
    current: Vec2,
    target: Vec2,
    speed: f32,
    dt: f32,
    arrival_threshold: f32,
) -> (Vec2, bool) {
    let delta = target - current;
    let distance_sq = delta.x * delta.x + delta.y * delta.y;
    if distance_sq <= arrival_threshold * arrival_threshold {
        return (target, true);
    }

    let distance = distance_sq.sqrt();
    let max_step = speed * dt;
    if max_step >= distance {
        return (target, true);
    }

    (current + delta * (max_step / distance), false)
}
