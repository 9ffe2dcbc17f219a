pub mod config;
pub mod error;
pub mod question;
pub mod result;

pub use config::{MediaConfig, TrialConfig, TrialKind};
pub use error::ConfigError;
pub use question::QuestionSpec;
pub use result::{ResponseValue, SurveyData, TrialResult, VideoData};
