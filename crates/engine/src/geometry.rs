use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangle; `x`/`y` is the top-left corner, y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Half-open intersection: touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x + self.w > other.x
            && self.x < other.x + other.w
            && self.y + self.h > other.y
            && self.y < other.y + other.h
    }

    pub fn contains_rect(&self, inner: &Rect) -> bool {
        inner.x >= self.x
            && inner.y >= self.y
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    pub fn translated(&self, delta: Vec2) -> Rect {
        Rect::new(self.x + delta.x, self.y + delta.y, self.w, self.h)
    }

    /// Quadrants in the order top-left, top-right, bottom-left, bottom-right.
    pub fn quadrants(&self) -> [Rect; 4] {
        let half_w = self.w / 2.0;
        let half_h = self.h / 2.0;
        [
            Rect::new(self.x, self.y, half_w, half_h),
            Rect::new(self.x + half_w, self.y, half_w, half_h),
            Rect::new(self.x, self.y + half_h, half_w, half_h),
            Rect::new(self.x + half_w, self.y + half_h, half_w, half_h),
        ]
    }
}

/// Smallest single-axis displacement that moves `moving` out of `obstacle`.
///
/// Each axis picks the cheaper of the two push-out directions; the axis with
/// the larger magnitude is then dropped so only one axis is corrected. Boxes
/// that do not overlap yield a zero vector.
pub fn minimum_translation(moving: &Rect, obstacle: &Rect) -> Vec2 {
    if !moving.overlaps(obstacle) {
        return Vec2::ZERO;
    }

    let push_left = obstacle.x - moving.right();
    let push_right = obstacle.right() - moving.x;
    let dx = if push_left.abs() < push_right.abs() {
        push_left
    } else {
        push_right
    };

    let push_up = obstacle.y - moving.bottom();
    let push_down = obstacle.bottom() - moving.y;
    let dy = if push_up.abs() < push_down.abs() {
        push_up
    } else {
        push_down
    };

    if dx.abs() < dy.abs() {
        Vec2::new(dx, 0.0)
    } else {
        Vec2::new(0.0, dy)
    }
}
