//! Field layout shared by every sink
//!
//! A `Layout` is the immutable (flags, schema) pair captured at init. It names
//! the fields of each group and renders a frame's values in the fixed group
//! order, so the tabular header, the tabular rows and the streaming messages
//! can never disagree on names or order.

use contracts::{ActionUnit, ContractError, FieldGroup, FrameResult, RecordFlags, SchemaDescriptor};

use crate::format::{fixed, flag, precision};
use crate::message::StreamMessage;

/// How action units are ordered in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuOrder {
    /// Name order captured in the schema at init
    Schema,
    /// Frame's names sorted lexicographically
    SortedByName,
}

/// Immutable recording layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    flags: RecordFlags,
    schema: SchemaDescriptor,
}

impl Layout {
    pub fn new(flags: RecordFlags, schema: SchemaDescriptor) -> Self {
        Self { flags, schema }
    }

    pub fn flags(&self) -> &RecordFlags {
        &self.flags
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Enabled groups in output order
    pub fn groups(&self) -> Vec<FieldGroup> {
        self.flags.enabled_groups()
    }

    /// Column names of one group, as fixed by the schema
    pub fn column_names(&self, group: FieldGroup) -> Vec<String> {
        let schema = &self.schema;
        match group {
            FieldGroup::Meta => meta_names(self.flags.is_sequence),
            FieldGroup::Gaze => gaze_names(schema.num_eye_landmarks),
            FieldGroup::Pose => POSE_NAMES.iter().map(|s| s.to_string()).collect(),
            FieldGroup::Landmarks2D => axis_names(&["x", "y"], schema.num_face_landmarks),
            FieldGroup::Landmarks3D => axis_names(&["X", "Y", "Z"], schema.num_face_landmarks),
            FieldGroup::ModelParams => model_param_names(schema.num_model_modes),
            FieldGroup::ActionUnits => schema
                .au_names_reg
                .iter()
                .map(|n| intensity_key(n))
                .chain(schema.au_names_class.iter().map(|n| occurrence_key(n)))
                .collect(),
        }
    }

    /// Every column name of a tabular record
    pub fn header(&self) -> Vec<String> {
        self.groups()
            .into_iter()
            .flat_map(|g| self.column_names(g))
            .collect()
    }

    /// Values of one tabular record, matching [`Layout::header`]
    ///
    /// # Errors
    /// [`ContractError::CardinalityMismatch`] when the frame disagrees with the schema
    pub fn row(&self, frame: &FrameResult) -> Result<Vec<String>, ContractError> {
        self.schema.check_frame(&self.flags, frame)?;

        let mut values = Vec::with_capacity(self.schema.column_count(&self.flags));
        for group in self.groups() {
            let fields = self.group_fields(group, frame, AuOrder::Schema)?;
            values.extend(fields.into_iter().map(|(_, v)| v));
        }
        Ok(values)
    }

    /// Streaming messages for one frame, one per enabled group
    ///
    /// # Errors
    /// [`ContractError::CardinalityMismatch`] when the frame disagrees with the schema
    pub fn messages(&self, frame: &FrameResult) -> Result<Vec<StreamMessage>, ContractError> {
        self.schema.check_frame(&self.flags, frame)?;

        self.groups()
            .into_iter()
            .map(|group| {
                let fields = self.group_fields(group, frame, AuOrder::SortedByName)?;
                Ok(StreamMessage::new(group, fields))
            })
            .collect()
    }

    /// (name, formatted value) pairs of one group
    ///
    /// Assumes `check_frame` already passed, so lengths line up with the schema.
    pub fn group_fields(
        &self,
        group: FieldGroup,
        frame: &FrameResult,
        au_order: AuOrder,
    ) -> Result<Vec<(String, String)>, ContractError> {
        let values = match group {
            FieldGroup::ActionUnits => return self.action_unit_fields(frame, au_order),
            FieldGroup::Meta => self.meta_values(frame),
            FieldGroup::Gaze => gaze_values(frame),
            FieldGroup::Pose => pose_values(frame),
            FieldGroup::Landmarks2D => coordinate_values(&frame.landmarks_2d),
            FieldGroup::Landmarks3D => coordinate_values(&frame.landmarks_3d),
            FieldGroup::ModelParams => model_param_values(frame),
        };

        Ok(self.column_names(group).into_iter().zip(values).collect())
    }

    fn meta_values(&self, frame: &FrameResult) -> Vec<String> {
        if self.flags.is_sequence {
            vec![
                frame.frame_number.to_string(),
                frame.face_id.to_string(),
                fixed(frame.timestamp, precision::TIMESTAMP),
                fixed(frame.confidence, precision::CONFIDENCE_SEQUENCE),
                flag(frame.detection_success),
            ]
        } else {
            vec![
                frame.face_id.to_string(),
                fixed(frame.confidence, precision::CONFIDENCE_IMAGE),
            ]
        }
    }

    fn action_unit_fields(
        &self,
        frame: &FrameResult,
        au_order: AuOrder,
    ) -> Result<Vec<(String, String)>, ContractError> {
        match au_order {
            AuOrder::Schema => {
                let intensities = SchemaDescriptor::resolve_action_units(
                    "au_intensities",
                    &self.schema.au_names_reg,
                    &frame.au_intensities,
                )?;
                let occurrences = SchemaDescriptor::resolve_action_units(
                    "au_occurrences",
                    &self.schema.au_names_class,
                    &frame.au_occurrences,
                )?;

                let reg = self.schema.au_names_reg.iter().zip(intensities).map(|(n, v)| {
                    (intensity_key(n), fixed(v, precision::AU_INTENSITY))
                });
                let class = self.schema.au_names_class.iter().zip(occurrences).map(|(n, v)| {
                    (occurrence_key(n), fixed(v, precision::AU_OCCURRENCE))
                });
                Ok(reg.chain(class).collect())
            }
            AuOrder::SortedByName => {
                let reg = sorted_by_name(&frame.au_intensities).into_iter().map(|au| {
                    (intensity_key(&au.name), fixed(au.value, precision::AU_INTENSITY))
                });
                let class = sorted_by_name(&frame.au_occurrences).into_iter().map(|au| {
                    (occurrence_key(&au.name), fixed(au.value, precision::AU_OCCURRENCE))
                });
                Ok(reg.chain(class).collect())
            }
        }
    }
}

const POSE_NAMES: [&str; 6] = ["pose_Tx", "pose_Ty", "pose_Tz", "pose_Rx", "pose_Ry", "pose_Rz"];

const RIGID_NAMES: [&str; 6] = ["p_scale", "p_rx", "p_ry", "p_rz", "p_tx", "p_ty"];

fn meta_names(is_sequence: bool) -> Vec<String> {
    let names: &[&str] = if is_sequence {
        &["frame", "face_id", "timestamp", "confidence", "success"]
    } else {
        &["face_id", "confidence"]
    };
    names.iter().map(|s| s.to_string()).collect()
}

fn gaze_names(num_eye_landmarks: usize) -> Vec<String> {
    let mut names: Vec<String> = [
        "gaze_0_x",
        "gaze_0_y",
        "gaze_0_z",
        "gaze_1_x",
        "gaze_1_y",
        "gaze_1_z",
        "gaze_angle_x",
        "gaze_angle_y",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for axis in ["x", "y", "X", "Y", "Z"] {
        names.extend((0..num_eye_landmarks).map(|i| format!("eye_lmk_{axis}_{i}")));
    }
    names
}

/// `x_0..x_n, y_0..y_n, ...`: every index of one axis before the next axis
fn axis_names(axes: &[&str], count: usize) -> Vec<String> {
    axes.iter()
        .flat_map(|axis| (0..count).map(move |i| format!("{axis}_{i}")))
        .collect()
}

fn model_param_names(num_model_modes: usize) -> Vec<String> {
    RIGID_NAMES
        .iter()
        .map(|s| s.to_string())
        .chain((0..num_model_modes).map(|i| format!("p_{i}")))
        .collect()
}

fn intensity_key(name: &str) -> String {
    format!("{name}_r")
}

fn occurrence_key(name: &str) -> String {
    format!("{name}_c")
}

fn gaze_values(frame: &FrameResult) -> Vec<String> {
    let gaze = &frame.gaze;
    let mut values: Vec<String> = [gaze.direction_0, gaze.direction_1]
        .iter()
        .flat_map(|d| [d.x, d.y, d.z])
        .map(|v| fixed(v, precision::GAZE_DIRECTION))
        .collect();
    values.extend(gaze.angle.iter().map(|v| fixed(*v, precision::GAZE_ANGLE)));

    let eye_2d = &frame.eye_landmarks_2d;
    let eye_3d = &frame.eye_landmarks_3d;
    let coords = eye_2d
        .iter()
        .map(|p| p.x)
        .chain(eye_2d.iter().map(|p| p.y))
        .chain(eye_3d.iter().map(|p| p.x))
        .chain(eye_3d.iter().map(|p| p.y))
        .chain(eye_3d.iter().map(|p| p.z));
    values.extend(coords.map(|v| fixed(v, precision::EYE_LANDMARK)));
    values
}

fn pose_values(frame: &FrameResult) -> Vec<String> {
    let pose = &frame.head_pose;
    [pose.tx, pose.ty, pose.tz]
        .iter()
        .map(|v| fixed(*v, precision::POSE_TRANSLATION))
        .chain(
            [pose.rx, pose.ry, pose.rz]
                .iter()
                .map(|v| fixed(*v, precision::POSE_ROTATION)),
        )
        .collect()
}

fn coordinate_values(flat: &[f32]) -> Vec<String> {
    flat.iter().map(|v| fixed(*v, precision::LANDMARK)).collect()
}

fn model_param_values(frame: &FrameResult) -> Vec<String> {
    frame
        .rigid_params
        .to_array()
        .iter()
        .chain(frame.model_params.iter())
        .map(|v| fixed(*v, precision::MODEL_PARAM))
        .collect()
}

/// Borrowed view of `units` sorted by name, ties broken by value
fn sorted_by_name(units: &[ActionUnit]) -> Vec<&ActionUnit> {
    let mut sorted: Vec<&ActionUnit> = units.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then(a.value.total_cmp(&b.value)));
    sorted
}
