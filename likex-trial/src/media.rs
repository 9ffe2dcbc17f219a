//! Playback gating for the video variant.
//!
//! The engine never decodes media itself; the host runner hands it a
//! ready-to-play handle behind [`MediaPlayer`] and forwards that handle's
//! events here. The stop-offset check piggybacks on the host's periodic
//! time-update event, so the pause lands on the normal update cadence rather
//! than frame-exactly.

use std::path::Path;

use likex_core::MediaConfig;
use tracing::{debug, warn};

/// Host-resolved playback handle.
pub trait MediaPlayer {
    fn play(&mut self);
    fn pause(&mut self);
    /// Seek to an absolute media time in seconds.
    fn seek(&mut self, seconds: f64);
    fn current_time(&self) -> f64;
    fn set_rate(&mut self, rate: f64);
    fn set_visible(&mut self, visible: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Loading,
    /// A start offset was requested; the surface stays hidden until the seek
    /// lands so the pre-roll frame never flashes.
    Seeking,
    Playing,
    PausedAtStop,
    Ended,
}

/// What the lifecycle controller should do after a playback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    None,
    EnableResponses,
    FinalizeTrial,
}

/// State machine tracking the playback window of one trial's stimulus.
#[derive(Debug, Clone)]
pub struct MediaGate {
    autoplay: bool,
    start: Option<f64>,
    stop: Option<f64>,
    rate: f64,
    trial_ends_after_video: bool,
    response_allowed_while_playing: bool,
    state: PlaybackState,
}

impl MediaGate {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            autoplay: config.autoplay,
            start: config.start,
            stop: config.stop,
            rate: config.rate,
            trial_ends_after_video: config.trial_ends_after_video,
            response_allowed_while_playing: config.response_allowed_while_playing,
            state: PlaybackState::Loading,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether response controls start out disabled when the trial renders.
    pub fn responses_locked_at_render(&self) -> bool {
        !self.response_allowed_while_playing
    }

    /// The handle is ready. Applies the playback rate, then either starts
    /// playback outright or hides the stimulus and seeks to the start
    /// offset, deferring playback to [`Self::seek_complete`].
    pub fn load(&mut self, player: &mut dyn MediaPlayer) {
        if self.state != PlaybackState::Loading {
            return;
        }
        player.set_rate(self.rate);
        if let Some(start) = self.start {
            player.set_visible(false);
            player.pause();
            player.seek(start);
            self.state = PlaybackState::Seeking;
        } else {
            if self.autoplay {
                player.play();
            }
            self.state = PlaybackState::Playing;
        }
    }

    pub fn seek_complete(&mut self, player: &mut dyn MediaPlayer) {
        if self.state != PlaybackState::Seeking {
            return;
        }
        player.set_visible(true);
        if self.autoplay {
            player.play();
        }
        self.state = PlaybackState::Playing;
    }

    /// Periodic time-update: pause once the play-head reaches the stop
    /// offset.
    pub fn time_update(&mut self, player: &mut dyn MediaPlayer) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(stop) = self.stop {
            if player.current_time() >= stop {
                player.pause();
                self.state = PlaybackState::PausedAtStop;
                debug!(stop, "playback paused at stop offset");
            }
        }
    }

    /// Natural end of playback.
    pub fn playback_ended(&mut self) -> MediaOutcome {
        self.state = PlaybackState::Ended;
        if self.trial_ends_after_video {
            MediaOutcome::FinalizeTrial
        } else if !self.response_allowed_while_playing {
            MediaOutcome::EnableResponses
        } else {
            MediaOutcome::None
        }
    }
}

/// Media subtype guessed from a source's file extension, with any query
/// string stripped first.
pub fn source_subtype(source: &str) -> Option<String> {
    let path = source.split('?').next().unwrap_or(source);
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Operator warning for formats playback handles are known to choke on.
/// Never blocks the trial.
pub fn warn_unreliable_sources(sources: &[String]) {
    for source in sources {
        if source_subtype(source).as_deref() == Some("mov") {
            warn!(source, "video trials do not reliably support .mov files");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct FakePlayer {
        playing: bool,
        visible: bool,
        rate: f64,
        position: f64,
        seeks: Vec<f64>,
    }

    impl FakePlayer {
        fn new() -> Self {
            Self {
                visible: true,
                rate: 1.0,
                ..Self::default()
            }
        }
    }

    impl MediaPlayer for FakePlayer {
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn seek(&mut self, seconds: f64) {
            self.seeks.push(seconds);
            self.position = seconds;
        }
        fn current_time(&self) -> f64 {
            self.position
        }
        fn set_rate(&mut self, rate: f64) {
            self.rate = rate;
        }
        fn set_visible(&mut self, visible: bool) {
            self.visible = visible;
        }
    }

    fn gated_config() -> MediaConfig {
        MediaConfig {
            sources: vec!["clip.mp4".into()],
            start: Some(5.0),
            stop: Some(10.0),
            rate: 1.5,
            ..MediaConfig::default()
        }
    }

    #[test]
    fn start_offset_hides_until_seek_completes() {
        let mut gate = MediaGate::new(&gated_config());
        let mut player = FakePlayer::new();

        gate.load(&mut player);
        assert_eq!(gate.state(), PlaybackState::Seeking);
        assert!(!player.visible);
        assert!(!player.playing);
        assert_eq!(player.seeks, vec![5.0]);
        assert_eq!(player.rate, 1.5);

        gate.seek_complete(&mut player);
        assert_eq!(gate.state(), PlaybackState::Playing);
        assert!(player.visible);
        assert!(player.playing);
    }

    #[test]
    fn stop_offset_pauses_on_time_update() {
        let mut gate = MediaGate::new(&gated_config());
        let mut player = FakePlayer::new();
        gate.load(&mut player);
        gate.seek_complete(&mut player);

        player.position = 9.9;
        gate.time_update(&mut player);
        assert!(player.playing);

        player.position = 10.2;
        gate.time_update(&mut player);
        assert!(!player.playing);
        assert_eq!(gate.state(), PlaybackState::PausedAtStop);
    }

    #[test]
    fn no_start_offset_plays_immediately() {
        let config = MediaConfig {
            sources: vec!["clip.mp4".into()],
            ..MediaConfig::default()
        };
        let mut gate = MediaGate::new(&config);
        let mut player = FakePlayer::new();
        gate.load(&mut player);
        assert!(player.playing);
        assert!(player.seeks.is_empty());
        assert_eq!(gate.state(), PlaybackState::Playing);
    }

    #[test]
    fn ended_outcome_follows_configuration() {
        let mut ends_trial = MediaGate::new(&MediaConfig {
            trial_ends_after_video: true,
            ..MediaConfig::default()
        });
        assert_eq!(ends_trial.playback_ended(), MediaOutcome::FinalizeTrial);

        let mut unlocks = MediaGate::new(&MediaConfig {
            response_allowed_while_playing: false,
            ..MediaConfig::default()
        });
        assert!(unlocks.responses_locked_at_render());
        assert_eq!(unlocks.playback_ended(), MediaOutcome::EnableResponses);

        let mut plain = MediaGate::new(&MediaConfig::default());
        assert_eq!(plain.playback_ended(), MediaOutcome::None);
    }

    #[test]
    fn subtype_strips_query_strings() {
        assert_eq!(source_subtype("clips/a.MP4?v=3").as_deref(), Some("mp4"));
        assert_eq!(source_subtype("a.webm").as_deref(), Some("webm"));
        assert_eq!(source_subtype("noext"), None);
    }
}
