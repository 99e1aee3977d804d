//! World-space placement.
//!
//! Positions are `glam::Vec3` in engine units; rotations are yaw/pitch/roll in
//! degrees, matching how level designers author spawn points.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Euler rotation in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    /// Rotation around the up axis.
    pub yaw: f32,
    /// Rotation around the right axis.
    pub pitch: f32,
    /// Rotation around the forward axis.
    pub roll: f32,
}

impl Rotation {
    /// Rotation facing along yaw only.
    pub const fn yaw(yaw: f32) -> Self {
        Self { yaw, pitch: 0.0, roll: 0.0 }
    }

    /// Convert to a quaternion.
    pub fn to_quat(self) -> Quat {
        Quat::from_euler(
            EulerRot::ZYX,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            self.roll.to_radians(),
        )
    }
}

/// Position plus rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Location in world space.
    pub position: Vec3,
    /// Facing.
    pub rotation: Rotation,
}

impl Pose {
    /// Create a pose.
    pub const fn new(position: Vec3, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    /// Pose at a position with no rotation.
    pub const fn at(position: Vec3) -> Self {
        Self { position, rotation: Rotation { yaw: 0.0, pitch: 0.0, roll: 0.0 } }
    }

    /// Unit vector from `self` toward `target`, or zero when they coincide.
    pub fn direction_to(&self, target: Vec3) -> Vec3 {
        (target - self.position).normalize_or_zero()
    }
}
