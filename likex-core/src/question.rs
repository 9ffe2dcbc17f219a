use serde::{Deserialize, Serialize};

/// One questionnaire item. Immutable once a trial starts.
///
/// For the table variant the scale labels come from
/// [`TrialConfig::shared_labels`](crate::TrialConfig) and `labels`/`poles`
/// here stay empty. The semantic-differential variants carry their scale on
/// the question itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub prompt: String,
    /// Key used for this question in the response map. Empty means "fall
    /// back to the stable group id".
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub required: bool,
    /// Per-question scale labels (semantic-differential variants).
    #[serde(default)]
    pub labels: Vec<String>,
    /// Labels at the two extremes of a semantic-differential scale.
    #[serde(default)]
    pub poles: Option<[String; 2]>,
}

impl QuestionSpec {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            name: String::new(),
            required: false,
            labels: Vec::new(),
            poles: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_scale(mut self, labels: Vec<String>, poles: [String; 2]) -> Self {
        self.labels = labels;
        self.poles = Some(poles);
        self
    }
}
