//! Fixed-point number formatting
//!
//! Decimal places per field are part of the output contract: subscribers and
//! downstream parsers rely on them.

/// Decimal places per field
pub mod precision {
    pub const TIMESTAMP: usize = 3;
    pub const CONFIDENCE_SEQUENCE: usize = 2;
    pub const CONFIDENCE_IMAGE: usize = 3;
    pub const GAZE_DIRECTION: usize = 6;
    pub const GAZE_ANGLE: usize = 3;
    pub const EYE_LANDMARK: usize = 1;
    pub const POSE_TRANSLATION: usize = 1;
    pub const POSE_ROTATION: usize = 3;
    pub const LANDMARK: usize = 1;
    pub const MODEL_PARAM: usize = 3;
    pub const AU_INTENSITY: usize = 2;
    pub const AU_OCCURRENCE: usize = 1;
}

/// Format in fixed decimal notation with `places` digits after the point
pub fn fixed(value: impl Into<f64>, places: usize) -> String {
    format!("{:.*}", places, value.into())
}

/// Format a flag as `1` / `0`
pub fn flag(value: bool) -> String {
    u8::from(value).to_string()
}
