use std::collections::BTreeMap;

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Value recorded for one response group. Unanswered groups still get an
/// entry, serialized as the empty string rather than being omitted, so every
/// participant's response map has the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseValue {
    Selected(u32),
    Unanswered,
}

impl ResponseValue {
    pub fn selected(self) -> Option<u32> {
        match self {
            Self::Selected(v) => Some(v),
            Self::Unanswered => None,
        }
    }
}

impl Serialize for ResponseValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Selected(v) => serializer.serialize_u32(*v),
            Self::Unanswered => serializer.serialize_str(""),
        }
    }
}

/// Finalized payload of a form trial (table or semantic-differential).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyData {
    #[serde(rename = "rt")]
    pub reaction_time_ms: f64,
    pub responses: BTreeMap<String, ResponseValue>,
    #[serde(rename = "question_order")]
    pub presentation_order: Vec<usize>,
}

/// Finalized payload of a video trial. `reaction_time_ms` and `response` are
/// both null when the trial ended without a recorded selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    #[serde(rename = "rt")]
    pub reaction_time_ms: Option<f64>,
    pub stimulus: Vec<String>,
    pub start: Option<f64>,
    pub response: Option<u32>,
}

/// The one payload a trial emits. Created at finalization, never mutated,
/// handed to the host runner's completion callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrialResult {
    Survey(SurveyData),
    Video(VideoData),
}

impl TrialResult {
    pub fn as_survey(&self) -> Option<&SurveyData> {
        match self {
            Self::Survey(d) => Some(d),
            Self::Video(_) => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoData> {
        match self {
            Self::Video(d) => Some(d),
            Self::Survey(_) => None,
        }
    }
}
