//! StreamMessage - one tagged message on the streaming wire
//!
//! Wire shape: `<Tag>:<key>:<value>,<key>:<value>,...`

use std::fmt;
use std::str::FromStr;

use contracts::FieldGroup;

use crate::error::RecorderError;

/// A self-describing group of `key:value` fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Group the fields belong to, rendered as the message tag
    pub group: FieldGroup,

    /// Ordered (key, value) pairs
    pub fields: Vec<(String, String)>,
}

impl StreamMessage {
    pub fn new(group: FieldGroup, fields: Vec<(String, String)>) -> Self {
        Self { group, fields }
    }

    pub fn tag(&self) -> &'static str {
        self.group.tag()
    }

    /// Raw value of a field
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Numeric value of a field
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for StreamMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.tag())?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}:{value}")?;
        }
        Ok(())
    }
}

impl FromStr for StreamMessage {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        let (tag, body) = line
            .split_once(':')
            .ok_or_else(|| RecorderError::message_parse(format!("missing tag in '{line}'")))?;

        let group = FieldGroup::from_tag(tag)
            .ok_or_else(|| RecorderError::message_parse(format!("unknown tag '{tag}'")))?;

        let fields = if body.is_empty() {
            Vec::new()
        } else {
            body.split(',')
                .map(|field| {
                    field
                        .split_once(':')
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .ok_or_else(|| {
                            RecorderError::message_parse(format!(
                                "field '{field}' in {tag} is not key:value"
                            ))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self { group, fields })
    }
}
