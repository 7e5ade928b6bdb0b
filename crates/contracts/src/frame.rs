//! FrameResult - upstream analysis output
//!
//! Measurements computed for one face in one frame. Produced by the
//! analysis pipeline, consumed (never stored) by result sinks.

use serde::{Deserialize, Serialize};

/// 2D point (image coordinates, pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

/// 3D point (camera coordinates, millimetres)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Rigid shape parameters of the face model
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidParams {
    pub scale: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
    pub tx: f32,
    pub ty: f32,
}

impl RigidParams {
    /// Values in output order
    pub fn to_array(&self) -> [f32; 6] {
        [self.scale, self.rx, self.ry, self.rz, self.tx, self.ty]
    }
}

/// Head pose estimate: translation (mm) then rotation (radians)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub tx: f32,
    pub ty: f32,
    pub tz: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
}

/// Gaze estimate for both eyes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GazeEstimate {
    /// Gaze direction of the first (left) eye, unit vector
    pub direction_0: Point3,

    /// Gaze direction of the second (right) eye, unit vector
    pub direction_1: Point3,

    /// Averaged gaze angle (x, y) in radians
    pub angle: [f32; 2],
}

/// Named action unit value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionUnit {
    /// AU name, e.g. "AU01"
    pub name: String,

    /// Intensity (0-5) or occurrence (0/1)
    pub value: f64,
}

impl ActionUnit {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Per-frame, per-face analysis result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameResult {
    /// Face index within the frame
    pub face_id: u32,

    /// Frame sequence number
    pub frame_number: u64,

    /// Frame timestamp (seconds)
    pub timestamp: f64,

    /// Whether landmark detection succeeded
    pub detection_success: bool,

    /// Landmark detection confidence (0-1)
    pub confidence: f64,

    /// 2D landmarks, flattened: all x, then all y
    pub landmarks_2d: Vec<f32>,

    /// 3D landmarks, flattened: all X, then all Y, then all Z
    pub landmarks_3d: Vec<f32>,

    /// Non-rigid shape model parameters
    pub model_params: Vec<f32>,

    /// Rigid shape model parameters
    pub rigid_params: RigidParams,

    /// Head pose estimate
    pub head_pose: HeadPose,

    /// Gaze estimate
    pub gaze: GazeEstimate,

    /// Eye region landmarks in the image
    pub eye_landmarks_2d: Vec<Point2>,

    /// Eye region landmarks in camera space
    pub eye_landmarks_3d: Vec<Point3>,

    /// AU intensities (regression outputs)
    pub au_intensities: Vec<ActionUnit>,

    /// AU occurrences (classification outputs)
    pub au_occurrences: Vec<ActionUnit>,
}
