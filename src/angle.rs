use std::fmt;

use serde::{Deserialize, Serialize};

/// Camera azimuth in whole degrees, always in `[0, 360)`.
///
/// Positive increments walk clockwise, negative increments counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CameraAngle(u16);

impl CameraAngle {
    pub const ZERO: CameraAngle = CameraAngle(0);

    /// Wraps any integer number of degrees into `[0, 360)`.
    pub fn new(degrees: i64) -> Self {
        CameraAngle(degrees.rem_euclid(360) as u16)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    /// `(self + increment) mod 360`.
    pub fn offset(self, increment: i32) -> Self {
        CameraAngle::new(self.0 as i64 + increment as i64)
    }

    /// Signed increment from `self` to `to` in `(-180, 180]`.
    pub fn signed_delta_to(self, to: CameraAngle) -> i32 {
        let d = (to.0 as i32 - self.0 as i32).rem_euclid(360);
        if d > 180 { d - 360 } else { d }
    }

    pub fn radians(self) -> f32 {
        (self.0 as f32).to_radians()
    }
}

impl From<u16> for CameraAngle {
    fn from(value: u16) -> Self {
        CameraAngle::new(value as i64)
    }
}

impl fmt::Display for CameraAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Midpoint of the arc between the two sweep boundaries that does not pass
/// through the front view.
///
/// `view_1` ends the clockwise sweep and `view_2` the counter-clockwise one.
/// Once the sweeps overlap (`view_1` past `view_2`) the arc runs from `view_2`
/// to `view_1` instead, so symmetric sweeps always meet at 180.
pub fn synthesis_angle(view_1: CameraAngle, view_2: CameraAngle) -> CameraAngle {
    let (start, end) = if view_2.0 < view_1.0 {
        (view_2, view_1)
    } else {
        (view_1, view_2)
    };
    let arc = (end.0 as i64 - start.0 as i64).rem_euclid(360);
    CameraAngle::new(start.0 as i64 + arc / 2)
}

/// Angles a single sweep visits, in order: fixed `increment` steps from 0
/// until `inc_limit` degrees have been travelled. Never empty.
pub fn sweep_angles(increment: i32, inc_limit: u32) -> Vec<CameraAngle> {
    let mut angles = Vec::new();
    let mut at = CameraAngle::ZERO;
    let mut travelled = 0u32;
    loop {
        at = at.offset(increment);
        travelled += increment.unsigned_abs();
        angles.push(at);
        if travelled >= inc_limit || increment == 0 {
            break;
        }
    }
    angles
}
