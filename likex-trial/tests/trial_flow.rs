//! End-to-end lifecycle tests driven through a manual clock and a fake
//! playback handle, the way a host runner would drive the engine.

use std::cell::Cell;
use std::rc::Rc;

use likex_core::{MediaConfig, QuestionSpec, ResponseValue, TrialConfig, TrialResult};
use likex_layout::Shuffled;
use likex_timing::ManualClock;
use likex_trial::{MediaPlayer, SubmitOutcome, Surface, TrialController, TrialPhase};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Surface that counts how often the controller wipes it.
#[derive(Debug, Clone, Default)]
struct CountingSurface {
    clears: Rc<Cell<usize>>,
}

impl Surface for CountingSurface {
    fn clear(&mut self) {
        self.clears.set(self.clears.get() + 1);
    }
}

#[derive(Debug)]
struct FakePlayer {
    playing: bool,
    visible: bool,
    position: f64,
}

impl FakePlayer {
    fn new() -> Self {
        Self {
            playing: false,
            visible: true,
            position: 0.0,
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
        self.position = seconds;
    }
    fn current_time(&self) -> f64 {
        self.position
    }
    fn set_rate(&mut self, _rate: f64) {}
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

type Delivered = Rc<std::cell::RefCell<Vec<TrialResult>>>;

fn capture() -> (Delivered, likex_trial::FinishFn) {
    let delivered: Delivered = Rc::default();
    let slot = Rc::clone(&delivered);
    (
        delivered,
        Box::new(move |result| slot.borrow_mut().push(result)),
    )
}

fn three_question_table() -> TrialConfig {
    TrialConfig::table(
        vec![
            QuestionSpec::new("The robot seemed friendly."),
            QuestionSpec::new("The robot seemed competent.")
                .named("competence")
                .required(),
            QuestionSpec::new("I would interact with it again."),
        ],
        vec![
            "Strongly disagree".into(),
            "Disagree".into(),
            "Neutral".into(),
            "Agree".into(),
            "Strongly agree".into(),
        ],
    )
}

fn video_config(media: MediaConfig) -> TrialConfig {
    TrialConfig::video(
        QuestionSpec::new("").with_scale(
            (1..=7).map(|i| i.to_string()).collect(),
            ["Unsafe".into(), "Safe".into()],
        ),
        media,
    )
}

#[test]
fn required_question_blocks_until_answered() {
    let clock = ManualClock::new();
    let (delivered, finish) = capture();
    let mut trial = TrialController::new(
        three_question_table(),
        clock.clone(),
        CountingSurface::default(),
        &mut likex_layout::InOrder,
        finish,
    )
    .unwrap();

    trial.begin();
    clock.advance_ms(500);
    assert!(trial.select("Q0", 1));
    assert!(trial.select("Q2", 4));

    // The required question (Q1) is still blank.
    assert_eq!(
        trial.submit(),
        SubmitOutcome::Blocked {
            missing: vec!["Q1".to_string()]
        }
    );
    assert!(delivered.borrow().is_empty());
    assert_eq!(trial.phase(), TrialPhase::AwaitingResponse);

    assert!(trial.select("Q1", 3));
    clock.advance_ms(100);
    assert_eq!(trial.submit(), SubmitOutcome::Finalized);

    let delivered = delivered.borrow();
    assert_eq!(delivered.len(), 1);
    let data = delivered[0].as_survey().unwrap();
    assert_eq!(data.responses.len(), 3);
    assert_eq!(data.responses["Q0"], ResponseValue::Selected(1));
    assert_eq!(data.responses["competence"], ResponseValue::Selected(3));
    assert_eq!(data.responses["Q2"], ResponseValue::Selected(4));
    assert_eq!(data.presentation_order, vec![0, 1, 2]);
    assert_eq!(data.reaction_time_ms, 600.0);
}

#[test]
fn finalize_is_delivered_exactly_once() {
    let clock = ManualClock::new();
    let (delivered, finish) = capture();
    let surface = CountingSurface::default();
    let clears = Rc::clone(&surface.clears);
    let mut config = three_question_table();
    config.questions[1].required = false;
    let mut trial =
        TrialController::new(config, clock.clone(), surface, &mut likex_layout::InOrder, finish)
            .unwrap();

    trial.begin();
    clock.advance_ms(50);
    assert_eq!(trial.submit(), SubmitOutcome::Finalized);
    assert_eq!(trial.submit(), SubmitOutcome::Ignored);
    trial.tick();
    trial.media_ended();

    assert_eq!(delivered.borrow().len(), 1);
    assert_eq!(clears.get(), 1);
    assert!(trial.is_done());

    // All three groups are present even though nothing was answered.
    let data = delivered.borrow()[0].as_survey().unwrap().clone();
    assert!(data.responses.values().all(|v| *v == ResponseValue::Unanswered));
    assert_eq!(data.responses.len(), 3);
}

#[test]
fn reaction_time_tracks_simulated_elapsed_time() {
    for wait_ms in [1u64, 250, 4000] {
        let clock = ManualClock::new();
        let (delivered, finish) = capture();
        let mut trial = TrialController::new(
            TrialConfig::table(vec![], vec!["ok".into()]),
            clock.clone(),
            (),
            &mut likex_layout::InOrder,
            finish,
        )
        .unwrap();
        trial.begin();
        clock.advance_ms(wait_ms);
        assert_eq!(trial.submit(), SubmitOutcome::Finalized);
        let data = delivered.borrow()[0].as_survey().unwrap().clone();
        assert_eq!(data.reaction_time_ms, wait_ms as f64);
        assert!(data.responses.is_empty());
    }
}

#[test]
fn randomized_order_keeps_original_attribution() {
    let clock = ManualClock::new();
    let (delivered, finish) = capture();
    let mut config = three_question_table();
    config.questions[1].required = false;
    config.randomize_order = true;
    let mut source = Shuffled(StdRng::seed_from_u64(11));
    let mut trial =
        TrialController::new(config, clock.clone(), (), &mut source, finish).unwrap();

    let order = trial.order().as_slice().to_vec();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2]);

    trial.begin();
    // Answer by stable group id, regardless of where each question landed.
    assert!(trial.select("Q1", 2));
    assert_eq!(trial.submit(), SubmitOutcome::Finalized);

    let data = delivered.borrow()[0].as_survey().unwrap().clone();
    assert_eq!(data.presentation_order, order);
    assert_eq!(data.responses["competence"], ResponseValue::Selected(2));
    assert_eq!(data.responses["Q0"], ResponseValue::Unanswered);
}

#[test]
fn duration_timeout_wins_over_paused_playback() {
    // start=5, stop=10, trial_duration=8000, response does not end the
    // trial: playback pauses at 10s media time, the trial ends purely from
    // the 8000 ms deadline with a null response.
    let clock = ManualClock::new();
    let (delivered, finish) = capture();
    let media = MediaConfig {
        sources: vec!["robot_intro.mp4".into()],
        start: Some(5.0),
        stop: Some(10.0),
        trial_duration_ms: Some(8000),
        response_ends_trial: false,
        ..MediaConfig::default()
    };
    let mut trial = TrialController::new(
        video_config(media),
        clock.clone(),
        CountingSurface::default(),
        &mut likex_layout::InOrder,
        finish,
    )
    .unwrap();

    let mut player = FakePlayer::new();
    trial.begin();
    trial.media_loaded(&mut player);
    assert!(!player.visible);
    assert_eq!(player.current_time(), 5.0);
    trial.media_seeked(&mut player);
    assert!(player.visible);
    assert!(player.playing);

    clock.advance_ms(4000);
    player.position = 9.0;
    trial.media_time_update(&mut player);
    assert!(player.playing);

    clock.advance_ms(1100);
    player.position = 10.1;
    trial.media_time_update(&mut player);
    assert!(!player.playing);
    assert!(delivered.borrow().is_empty());

    clock.advance_ms(2900);
    trial.media_time_update(&mut player);

    let delivered = delivered.borrow();
    assert_eq!(delivered.len(), 1);
    let data = delivered[0].as_video().unwrap();
    assert_eq!(data.response, None);
    assert_eq!(data.reaction_time_ms, None);
    assert_eq!(data.start, Some(5.0));
    assert_eq!(data.stimulus, vec!["robot_intro.mp4".to_string()]);
}

#[test]
fn gated_responses_unlock_on_playback_end() {
    let clock = ManualClock::new();
    let (delivered, finish) = capture();
    let media = MediaConfig {
        sources: vec!["clip.webm".into()],
        response_allowed_while_playing: false,
        ..MediaConfig::default()
    };
    let mut trial = TrialController::new(
        video_config(media),
        clock.clone(),
        (),
        &mut likex_layout::InOrder,
        finish,
    )
    .unwrap();

    let mut player = FakePlayer::new();
    trial.begin();
    trial.media_loaded(&mut player);

    // Controls are disabled during playback.
    assert!(!trial.select("response", 3));
    assert_eq!(trial.click_continue(), SubmitOutcome::Ignored);

    trial.media_ended();
    clock.advance_ms(1234);
    assert!(trial.select("response", 3));
    assert_eq!(trial.click_continue(), SubmitOutcome::Finalized);

    let data = delivered.borrow()[0].as_video().unwrap().clone();
    assert_eq!(data.response, Some(3));
    assert_eq!(data.reaction_time_ms, Some(1234.0));
}

#[test]
fn trial_can_end_with_the_video() {
    let (delivered, finish) = capture();
    let media = MediaConfig {
        sources: vec!["clip.mp4".into()],
        trial_ends_after_video: true,
        ..MediaConfig::default()
    };
    let mut trial = TrialController::new(
        video_config(media),
        ManualClock::new(),
        (),
        &mut likex_layout::InOrder,
        finish,
    )
    .unwrap();

    let mut player = FakePlayer::new();
    trial.begin();
    trial.media_loaded(&mut player);
    trial.media_ended();
    trial.media_ended();

    assert_eq!(delivered.borrow().len(), 1);
    assert_eq!(delivered.borrow()[0].as_video().unwrap().response, None);
}

#[test]
fn recorded_response_survives_until_the_timeout() {
    let clock = ManualClock::new();
    let (delivered, finish) = capture();
    let media = MediaConfig {
        sources: vec!["clip.mp4".into()],
        response_ends_trial: false,
        trial_duration_ms: Some(5000),
        ..MediaConfig::default()
    };
    let mut trial = TrialController::new(
        video_config(media),
        clock.clone(),
        (),
        &mut likex_layout::InOrder,
        finish,
    )
    .unwrap();

    let mut player = FakePlayer::new();
    trial.begin();
    trial.media_loaded(&mut player);

    // The continue button only arms once something is selected.
    assert_eq!(trial.click_continue(), SubmitOutcome::Ignored);
    clock.advance_ms(800);
    assert!(trial.select("response", 5));
    assert_eq!(trial.click_continue(), SubmitOutcome::Recorded);
    assert_eq!(trial.click_continue(), SubmitOutcome::Ignored);
    assert!(delivered.borrow().is_empty());

    clock.advance_ms(4200);
    trial.tick();

    let data = delivered.borrow()[0].as_video().unwrap().clone();
    assert_eq!(data.response, Some(5));
    assert_eq!(data.reaction_time_ms, Some(800.0));
}
