//! Output schema - which field groups are recorded and how wide they are
//!
//! `RecordFlags` and `SchemaDescriptor` are captured once by a sink at init
//! and never change while the sink is open.

use serde::{Deserialize, Serialize};

use crate::{ActionUnit, ContractError, FrameResult};

/// Which optional field groups are recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFlags {
    /// Each record is a frame of a sequence (vs. a face of a single image)
    pub is_sequence: bool,

    pub output_2d_landmarks: bool,
    pub output_3d_landmarks: bool,
    pub output_pose: bool,
    pub output_gaze: bool,
    pub output_model_params: bool,
    pub output_aus: bool,
}

impl Default for RecordFlags {
    fn default() -> Self {
        Self::all(true)
    }
}

impl RecordFlags {
    /// Every group enabled
    pub fn all(is_sequence: bool) -> Self {
        Self {
            is_sequence,
            output_2d_landmarks: true,
            output_3d_landmarks: true,
            output_pose: true,
            output_gaze: true,
            output_model_params: true,
            output_aus: true,
        }
    }

    /// Only the metadata group
    pub fn none(is_sequence: bool) -> Self {
        Self {
            is_sequence,
            output_2d_landmarks: false,
            output_3d_landmarks: false,
            output_pose: false,
            output_gaze: false,
            output_model_params: false,
            output_aus: false,
        }
    }

    /// Whether the group is recorded (`Meta` always is)
    pub fn is_enabled(&self, group: FieldGroup) -> bool {
        match group {
            FieldGroup::Meta => true,
            FieldGroup::Gaze => self.output_gaze,
            FieldGroup::Pose => self.output_pose,
            FieldGroup::Landmarks2D => self.output_2d_landmarks,
            FieldGroup::Landmarks3D => self.output_3d_landmarks,
            FieldGroup::ModelParams => self.output_model_params,
            FieldGroup::ActionUnits => self.output_aus,
        }
    }

    /// Enabled groups in output order
    pub fn enabled_groups(&self) -> Vec<FieldGroup> {
        FieldGroup::ALL
            .into_iter()
            .filter(|g| self.is_enabled(*g))
            .collect()
    }
}

/// Field group, in the fixed output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldGroup {
    Meta,
    Gaze,
    Pose,
    Landmarks2D,
    Landmarks3D,
    ModelParams,
    ActionUnits,
}

impl FieldGroup {
    /// All groups in output order
    pub const ALL: [FieldGroup; 7] = [
        FieldGroup::Meta,
        FieldGroup::Gaze,
        FieldGroup::Pose,
        FieldGroup::Landmarks2D,
        FieldGroup::Landmarks3D,
        FieldGroup::ModelParams,
        FieldGroup::ActionUnits,
    ];

    /// Message tag on the streaming wire
    pub fn tag(&self) -> &'static str {
        match self {
            FieldGroup::Meta => "Meta",
            FieldGroup::Gaze => "Gaze",
            FieldGroup::Pose => "Pose",
            FieldGroup::Landmarks2D => "Landmarks2D",
            FieldGroup::Landmarks3D => "Landmarks3D",
            FieldGroup::ModelParams => "ModelParams",
            FieldGroup::ActionUnits => "AUs",
        }
    }

    /// Inverse of [`FieldGroup::tag`]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.tag() == tag)
    }
}

/// Fixed output shape: landmark/parameter counts and AU names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDescriptor {
    /// Face landmarks per record
    pub num_face_landmarks: usize,

    /// Non-rigid model parameters per record
    pub num_model_modes: usize,

    /// Eye landmarks per record (per 2D and per 3D set)
    pub num_eye_landmarks: usize,

    /// AU names produced by classification (occurrence), in column order
    pub au_names_class: Vec<String>,

    /// AU names produced by regression (intensity), in column order
    pub au_names_reg: Vec<String>,
}

impl SchemaDescriptor {
    /// Number of values a group contributes to one record
    pub fn group_width(&self, group: FieldGroup, is_sequence: bool) -> usize {
        match group {
            FieldGroup::Meta if is_sequence => 5,
            FieldGroup::Meta => 2,
            FieldGroup::Gaze => 8 + 5 * self.num_eye_landmarks,
            FieldGroup::Pose => 6,
            FieldGroup::Landmarks2D => 2 * self.num_face_landmarks,
            FieldGroup::Landmarks3D => 3 * self.num_face_landmarks,
            FieldGroup::ModelParams => 6 + self.num_model_modes,
            FieldGroup::ActionUnits => self.au_names_reg.len() + self.au_names_class.len(),
        }
    }

    /// Number of values in one tabular record
    pub fn column_count(&self, flags: &RecordFlags) -> usize {
        flags
            .enabled_groups()
            .into_iter()
            .map(|g| self.group_width(g, flags.is_sequence))
            .sum()
    }

    /// Check that every enabled group of `frame` has the cardinality fixed by this schema.
    ///
    /// # Errors
    /// Returns [`ContractError::CardinalityMismatch`] naming the first offending field.
    pub fn check_frame(&self, flags: &RecordFlags, frame: &FrameResult) -> Result<(), ContractError> {
        if flags.output_gaze {
            expect_len("eye_landmarks_2d", self.num_eye_landmarks, frame.eye_landmarks_2d.len())?;
            expect_len("eye_landmarks_3d", self.num_eye_landmarks, frame.eye_landmarks_3d.len())?;
        }
        if flags.output_2d_landmarks {
            expect_len("landmarks_2d", 2 * self.num_face_landmarks, frame.landmarks_2d.len())?;
        }
        if flags.output_3d_landmarks {
            expect_len("landmarks_3d", 3 * self.num_face_landmarks, frame.landmarks_3d.len())?;
        }
        if flags.output_model_params {
            expect_len("model_params", self.num_model_modes, frame.model_params.len())?;
        }
        Ok(())
    }

    /// Resolve AU values in schema name order.
    ///
    /// An empty list yields zeros (no AU output for this face). A non-empty
    /// list must contain every schema name.
    pub fn resolve_action_units(
        field: &str,
        names: &[String],
        values: &[ActionUnit],
    ) -> Result<Vec<f64>, ContractError> {
        if values.is_empty() {
            return Ok(vec![0.0; names.len()]);
        }

        names
            .iter()
            .map(|name| {
                values
                    .iter()
                    .find(|au| &au.name == name)
                    .map(|au| au.value)
                    .ok_or_else(|| {
                        ContractError::cardinality(
                            format!("{field}[{name}]"),
                            names.len(),
                            values.iter().filter(|au| names.contains(&au.name)).count(),
                        )
                    })
            })
            .collect()
    }
}

fn expect_len(field: &str, expected: usize, actual: usize) -> Result<(), ContractError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ContractError::cardinality(field, expected, actual))
    }
}
