mod app;
pub use app::App;

use anyhow::{Context, Result};
use likex_core::{QuestionSpec, TrialConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A trial descriptor can be passed as a JSON file; without one we run a
    // small built-in questionnaire.
    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text =
                std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?
        }
        None => demo_config(),
    };

    let app = App::new(config)?;
    app.run()
}

fn demo_config() -> TrialConfig {
    let mut config = TrialConfig::table(
        vec![
            QuestionSpec::new("I found the task engaging.").required(),
            QuestionSpec::new("The instructions were clear.").named("clarity"),
            QuestionSpec::new("I would participate again."),
        ],
        vec![
            "Strongly disagree".into(),
            "Disagree".into(),
            "Neutral".into(),
            "Agree".into(),
            "Strongly agree".into(),
        ],
    );
    config.preamble = Some("Please rate the following statements.".into());
    config.randomize_order = true;
    config
}
