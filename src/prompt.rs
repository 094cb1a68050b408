use crate::angle::CameraAngle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewDescriptor {
    Front,
    Left,
    Back,
    Right,
}

impl ViewDescriptor {
    /// Boundaries are inclusive and resolved in front, left, back, right order,
    /// so 45 and 315 are front views and 135 is a left view.
    pub fn for_angle(angle: CameraAngle) -> Self {
        let a = angle.degrees();
        if a <= 45 || a >= 315 {
            ViewDescriptor::Front
        } else if a <= 135 {
            ViewDescriptor::Left
        } else if a <= 225 {
            ViewDescriptor::Back
        } else {
            ViewDescriptor::Right
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewDescriptor::Front => "front view",
            ViewDescriptor::Left => "left view",
            ViewDescriptor::Back => "back view",
            ViewDescriptor::Right => "right view",
        }
    }
}

/// Builds `"A photo of a [<color> ]<prompt>, <view>"`.
pub fn view_dep_prompt(prompt: &str, angle: CameraAngle, color: Option<&str>) -> String {
    let base = match color.map(str::trim).filter(|c| !c.is_empty()) {
        Some(color) => format!("A photo of a {color} {prompt}"),
        None => format!("A photo of a {prompt}"),
    };
    format!("{base}, {}", ViewDescriptor::for_angle(angle).as_str())
}
