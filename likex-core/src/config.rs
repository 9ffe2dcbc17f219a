use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::question::QuestionSpec;

/// Which renderer variant a trial uses. Selected by configuration, never by
/// a runtime registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialKind {
    /// All questions share one scale, laid out as a grid table.
    Table,
    /// Each question carries its own labels and pole pair.
    SemanticDifferential,
    /// A single semantic-differential scale gated on video playback.
    VideoSemanticDifferential,
}

/// Playback parameters for the video variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Candidate media files; the host resolves one into a playable handle.
    pub sources: Vec<String>,
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default)]
    pub controls: bool,
    /// Seek target in seconds. When set, the first frame is withheld until
    /// the seek completes.
    #[serde(default)]
    pub start: Option<f64>,
    /// Media time at which playback is paused.
    #[serde(default)]
    pub stop: Option<f64>,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Text shown below the stimulus.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub trial_ends_after_video: bool,
    /// Hard deadline for the whole trial, in milliseconds.
    #[serde(default)]
    pub trial_duration_ms: Option<u64>,
    #[serde(default = "default_true")]
    pub response_ends_trial: bool,
    #[serde(default = "default_true")]
    pub response_allowed_while_playing: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            autoplay: true,
            controls: false,
            start: None,
            stop: None,
            rate: 1.0,
            width: None,
            height: None,
            prompt: None,
            trial_ends_after_video: false,
            trial_duration_ms: None,
            response_ends_trial: true,
            response_allowed_while_playing: true,
        }
    }
}

/// One trial descriptor, as handed over by the host runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    pub kind: TrialKind,
    pub questions: Vec<QuestionSpec>,
    /// Scale labels shared by every question (table variant).
    #[serde(default)]
    pub shared_labels: Vec<String>,
    /// Fixed pixel width for the scale region; full width when absent.
    #[serde(default)]
    pub layout_width: Option<u32>,
    #[serde(default)]
    pub randomize_order: bool,
    #[serde(default = "default_true")]
    pub alternate_row_color: bool,
    #[serde(default = "default_button_label")]
    pub button_label: String,
    /// Text shown above the form.
    #[serde(default)]
    pub preamble: Option<String>,
    /// Present for the video variant only.
    #[serde(default)]
    pub media: Option<MediaConfig>,
}

fn default_true() -> bool {
    true
}

fn default_rate() -> f64 {
    1.0
}

fn default_button_label() -> String {
    "Continue".to_string()
}

impl TrialConfig {
    pub fn table(questions: Vec<QuestionSpec>, shared_labels: Vec<String>) -> Self {
        Self {
            kind: TrialKind::Table,
            questions,
            shared_labels,
            layout_width: None,
            randomize_order: false,
            alternate_row_color: true,
            button_label: default_button_label(),
            preamble: None,
            media: None,
        }
    }

    pub fn semantic_differential(questions: Vec<QuestionSpec>) -> Self {
        Self {
            kind: TrialKind::SemanticDifferential,
            shared_labels: Vec::new(),
            ..Self::table(questions, Vec::new())
        }
    }

    pub fn video(question: QuestionSpec, media: MediaConfig) -> Self {
        Self {
            kind: TrialKind::VideoSemanticDifferential,
            media: Some(media),
            ..Self::table(vec![question], Vec::new())
        }
    }

    /// Fail-fast validation, run before the presentation order is drawn or
    /// anything touches the surface. Zero questions is a legal (empty) table
    /// or semantic-differential trial; a zero-length label set is not, since
    /// the layout math is undefined for it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.kind {
            TrialKind::Table => {
                if self.shared_labels.is_empty() {
                    return Err(ConfigError::NoSharedLabels);
                }
                for (index, q) in self.questions.iter().enumerate() {
                    if q.prompt.is_empty() {
                        return Err(ConfigError::EmptyPrompt { index });
                    }
                }
            }
            TrialKind::SemanticDifferential => {
                for (index, q) in self.questions.iter().enumerate() {
                    if q.prompt.is_empty() {
                        return Err(ConfigError::EmptyPrompt { index });
                    }
                    if q.labels.is_empty() {
                        return Err(ConfigError::NoLabels { index });
                    }
                    if q.poles.is_none() {
                        return Err(ConfigError::NoPoles { index });
                    }
                }
            }
            TrialKind::VideoSemanticDifferential => {
                if self.questions.len() != 1 {
                    return Err(ConfigError::VideoQuestionCount {
                        count: self.questions.len(),
                    });
                }
                // The video prompt is optional, the scale is not.
                let q = &self.questions[0];
                if q.labels.is_empty() {
                    return Err(ConfigError::NoLabels { index: 0 });
                }
                if q.poles.is_none() {
                    return Err(ConfigError::NoPoles { index: 0 });
                }
                let media = self.media.as_ref().ok_or(ConfigError::NoMedia)?;
                if media.sources.is_empty() {
                    return Err(ConfigError::NoMediaSource);
                }
                if media.rate <= 0.0 {
                    return Err(ConfigError::BadPlaybackRate { rate: media.rate });
                }
                if let (Some(start), Some(stop)) = (media.start, media.stop) {
                    if stop < start {
                        return Err(ConfigError::InvertedPlaybackWindow { start, stop });
                    }
                }
            }
        }
        Ok(())
    }

    /// Scale length for the question at `index`, respecting the shared-scale
    /// rule of the table variant.
    pub fn label_count(&self, index: usize) -> usize {
        match self.kind {
            TrialKind::Table => self.shared_labels.len(),
            _ => self.questions.get(index).map_or(0, |q| q.labels.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale_question(prompt: &str) -> QuestionSpec {
        QuestionSpec::new(prompt).with_scale(
            vec!["1".into(), "2".into(), "3".into()],
            ["bad".into(), "good".into()],
        )
    }

    #[test]
    fn table_without_shared_labels_is_rejected() {
        let cfg = TrialConfig::table(vec![QuestionSpec::new("ok?")], vec![]);
        assert_eq!(cfg.validate(), Err(ConfigError::NoSharedLabels));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let cfg = TrialConfig::table(vec![QuestionSpec::new("")], vec!["yes".into()]);
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyPrompt { index: 0 }));
    }

    #[test]
    fn zero_questions_is_a_valid_table() {
        let cfg = TrialConfig::table(vec![], vec!["yes".into(), "no".into()]);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn semantic_differential_needs_labels_and_poles() {
        let mut cfg = TrialConfig::semantic_differential(vec![scale_question("how warm?")]);
        assert_eq!(cfg.validate(), Ok(()));

        cfg.questions[0].poles = None;
        assert_eq!(cfg.validate(), Err(ConfigError::NoPoles { index: 0 }));

        cfg.questions[0].labels.clear();
        assert_eq!(cfg.validate(), Err(ConfigError::NoLabels { index: 0 }));
    }

    #[test]
    fn video_needs_media_and_a_source() {
        let mut cfg = TrialConfig::video(scale_question(""), MediaConfig::default());
        assert_eq!(cfg.validate(), Err(ConfigError::NoMediaSource));

        cfg.media.as_mut().unwrap().sources.push("clip.mp4".into());
        assert_eq!(cfg.validate(), Ok(()));

        cfg.media = None;
        assert_eq!(cfg.validate(), Err(ConfigError::NoMedia));
    }

    #[test]
    fn inverted_playback_window_is_rejected() {
        let media = MediaConfig {
            sources: vec!["clip.mp4".into()],
            start: Some(10.0),
            stop: Some(5.0),
            ..MediaConfig::default()
        };
        let cfg = TrialConfig::video(scale_question(""), media);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvertedPlaybackWindow {
                start: 10.0,
                stop: 5.0
            })
        );
    }

    #[test]
    fn descriptor_defaults_apply() {
        let cfg: TrialConfig = serde_json::from_str(
            r#"{
                "kind": "table",
                "questions": [{"prompt": "ok?"}],
                "shared_labels": ["no", "yes"]
            }"#,
        )
        .unwrap();
        assert!(!cfg.randomize_order);
        assert!(cfg.alternate_row_color);
        assert_eq!(cfg.button_label, "Continue");
        assert!(!cfg.questions[0].required);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn video_descriptor_defaults_apply() {
        let cfg: TrialConfig = serde_json::from_str(
            r#"{
                "kind": "video_semantic_differential",
                "questions": [{"labels": ["1", "2"], "poles": ["sad", "happy"], "prompt": ""}],
                "media": {"sources": ["clip.mp4"]}
            }"#,
        )
        .unwrap();
        let media = cfg.media.as_ref().unwrap();
        assert!(media.autoplay);
        assert!(media.response_ends_trial);
        assert!(media.response_allowed_while_playing);
        assert_eq!(media.rate, 1.0);
        assert!(cfg.validate().is_ok());
    }
}
