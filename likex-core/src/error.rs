use thiserror::Error;

/// Rejected trial configuration. Raised by
/// [`TrialConfig::validate`](crate::TrialConfig::validate) before anything is
/// rendered; an invalid trial never reaches the surface.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("question {index} has an empty prompt")]
    EmptyPrompt { index: usize },

    #[error("table layout needs at least one shared scale label")]
    NoSharedLabels,

    #[error("question {index} has no scale labels")]
    NoLabels { index: usize },

    #[error("question {index} is missing its pole labels")]
    NoPoles { index: usize },

    #[error("video trial needs a media configuration")]
    NoMedia,

    #[error("video trial needs at least one media source")]
    NoMediaSource,

    #[error("video trial carries {count} questions, expected exactly one")]
    VideoQuestionCount { count: usize },

    #[error("playback window is inverted (start {start}s, stop {stop}s)")]
    InvertedPlaybackWindow { start: f64, stop: f64 },

    #[error("playback rate {rate} is not positive")]
    BadPlaybackRate { rate: f64 },
}
