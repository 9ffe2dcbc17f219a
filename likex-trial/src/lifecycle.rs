//! Trial lifecycle: render, wait for a trigger, finalize exactly once.
//!
//! The controller is the only stateful piece of the engine. It owns the
//! rendered surface for the trial's duration, computes the presentation
//! order exactly once, and funnels every completion trigger (submit, video
//! continue click, natural media end, duration timeout) through one guarded
//! finalize path. Entering `Finalizing` disarms the duration deadline and
//! makes every other trigger a no-op, so the completion callback fires at
//! most once.

use std::collections::HashMap;

use likex_core::{ConfigError, SurveyData, TrialConfig, TrialKind, TrialResult, VideoData};
use likex_layout::{
    OrderError, OrderSource, PresentationOrder, ScalePlan, TablePlan, VideoScalePlan, plan_scales,
    plan_table, plan_video_scale,
};
use likex_timing::Clock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{ResponseGroup, collect_responses};
use crate::media::{MediaGate, MediaOutcome, MediaPlayer, warn_unreliable_sources};

#[derive(Debug, Error)]
pub enum TrialError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// The mutable container a trial renders into. Opaque to the controller
/// except for the one operation it needs: wiping the trial's content at
/// finalization.
pub trait Surface {
    fn clear(&mut self);
}

/// Headless surface, for hosts that drive the engine without rendering.
impl Surface for () {
    fn clear(&mut self) {}
}

/// One-shot completion callback; taking it out of its `Option` is what makes
/// duplicate finalization structurally impossible.
pub type FinishFn = Box<dyn FnOnce(TrialResult)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Rendering,
    AwaitingResponse,
    Finalizing,
    Done,
}

/// Which trigger closed the trial. Carried in the finalize log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinalizeTrigger {
    Submit,
    ResponseClick,
    MediaEnded,
    Timeout,
}

/// Result of a submit or continue-click attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Finalized,
    /// Required questions are still unanswered; the user can fix the form
    /// and resubmit.
    Blocked { missing: Vec<String> },
    /// Video response recorded, trial continues (response does not end it).
    Recorded,
    Ignored,
}

/// Placement records for the configured variant, computed once at
/// construction from the drawn presentation order.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialLayout {
    Table(TablePlan),
    Scales(ScalePlan),
    VideoScale(VideoScalePlan),
}

/// Everything a renderer needs to draw the trial, borrowed from the
/// controller alongside the mutable surface.
#[derive(Debug)]
pub struct TrialView<'a> {
    pub config: &'a TrialConfig,
    pub layout: &'a TrialLayout,
    pub order: &'a PresentationOrder,
    pub selections: &'a HashMap<String, u32>,
    pub phase: TrialPhase,
    pub responses_enabled: bool,
    pub submit_enabled: bool,
}

pub struct TrialController<C: Clock, S: Surface> {
    config: TrialConfig,
    order: PresentationOrder,
    layout: TrialLayout,
    groups: Vec<ResponseGroup>,
    selections: HashMap<String, u32>,
    phase: TrialPhase,
    clock: C,
    surface: S,
    render_start: Option<C::Timestamp>,
    /// Armed duration deadline in ms; cleared on finalize with every other
    /// pending trigger.
    deadline_ms: Option<u64>,
    media: Option<MediaGate>,
    responses_enabled: bool,
    submit_enabled: bool,
    /// Provisional video response: (reaction time ms, selected value).
    video_response: Option<(f64, u32)>,
    on_finish: Option<FinishFn>,
}

impl<C: Clock, S: Surface> TrialController<C, S> {
    /// Validates the configuration, draws the presentation order (exactly
    /// once; it is never recomputed mid-trial) and plans the layout.
    pub fn new(
        config: TrialConfig,
        clock: C,
        surface: S,
        source: &mut dyn OrderSource,
        on_finish: FinishFn,
    ) -> Result<Self, TrialError> {
        config.validate()?;

        let n = config.questions.len();
        let order = if config.randomize_order {
            PresentationOrder::randomized(n, source)?
        } else {
            PresentationOrder::identity(n)
        };

        let layout = plan_layout(&config, &order);
        let groups = bind_groups(&config, &order);

        let media = config.media.as_ref().map(MediaGate::new);
        if let Some(media_config) = &config.media {
            warn_unreliable_sources(&media_config.sources);
        }
        let is_video = config.kind == TrialKind::VideoSemanticDifferential;
        let responses_enabled = media
            .as_ref()
            .is_none_or(|gate| !gate.responses_locked_at_render());
        let deadline_ms = config.media.as_ref().and_then(|m| m.trial_duration_ms);

        Ok(Self {
            config,
            order,
            layout,
            groups,
            selections: HashMap::new(),
            phase: TrialPhase::Rendering,
            clock,
            surface,
            render_start: None,
            deadline_ms,
            media,
            responses_enabled,
            // Form submits are always clickable; the video continue button
            // waits for a first selection.
            submit_enabled: !is_video,
            video_response: None,
            on_finish: Some(on_finish),
        })
    }

    /// Marks the trial as presented: reaction time counts from here and the
    /// duration deadline, if any, is armed against this instant.
    pub fn begin(&mut self) {
        if self.phase != TrialPhase::Rendering {
            return;
        }
        self.render_start = Some(self.clock.now());
        self.phase = TrialPhase::AwaitingResponse;
        debug!(order = ?self.order.as_slice(), "trial presented");
    }

    /// Records a radio selection. The newest selection in a group wins;
    /// returns false when the input is inert (unknown group, responses
    /// locked by playback gating, trial already finalizing).
    pub fn select(&mut self, group_id: &str, value: u32) -> bool {
        if self.phase != TrialPhase::AwaitingResponse || !self.responses_enabled {
            return false;
        }
        if !self.groups.iter().any(|g| g.group_id == group_id) {
            return false;
        }
        self.selections.insert(group_id.to_string(), value);
        self.submit_enabled = true;
        true
    }

    /// Form submission (table and semantic-differential variants). Blocked,
    /// not finalized, while a required question has no selection.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.phase != TrialPhase::AwaitingResponse
            || self.config.kind == TrialKind::VideoSemanticDifferential
        {
            return SubmitOutcome::Ignored;
        }
        let missing: Vec<String> = self
            .groups
            .iter()
            .filter(|g| {
                self.config.questions[g.original_index].required
                    && !self.selections.contains_key(&g.group_id)
            })
            .map(|g| g.group_id.clone())
            .collect();
        if !missing.is_empty() {
            warn!(?missing, "submission blocked by unanswered required questions");
            return SubmitOutcome::Blocked { missing };
        }
        self.finalize(FinalizeTrigger::Submit);
        SubmitOutcome::Finalized
    }

    /// Continue click in the video variant. Requires a prior selection (the
    /// button only arms once one exists). When the response does not end the
    /// trial the click records it provisionally and re-disables the button.
    pub fn click_continue(&mut self) -> SubmitOutcome {
        if self.phase != TrialPhase::AwaitingResponse
            || self.config.kind != TrialKind::VideoSemanticDifferential
            || !self.submit_enabled
        {
            return SubmitOutcome::Ignored;
        }
        let Some(group) = self.groups.first() else {
            return SubmitOutcome::Ignored;
        };
        let Some(value) = self.selections.get(&group.group_id).copied() else {
            return SubmitOutcome::Ignored;
        };
        let rt = self
            .render_start
            .map_or(0.0, |t0| self.clock.elapsed_ms(t0));
        self.video_response = Some((rt, value));

        let ends_trial = self
            .config
            .media
            .as_ref()
            .is_none_or(|m| m.response_ends_trial);
        if ends_trial {
            self.finalize(FinalizeTrigger::ResponseClick);
            SubmitOutcome::Finalized
        } else {
            self.submit_enabled = false;
            SubmitOutcome::Recorded
        }
    }

    /// The host's playback handle finished loading.
    pub fn media_loaded(&mut self, player: &mut dyn MediaPlayer) {
        if self.finalized() {
            return;
        }
        if let Some(gate) = &mut self.media {
            gate.load(player);
        }
    }

    pub fn media_seeked(&mut self, player: &mut dyn MediaPlayer) {
        if self.finalized() {
            return;
        }
        if let Some(gate) = &mut self.media {
            gate.seek_complete(player);
        }
    }

    /// Periodic media time-update. The duration deadline rides on the same
    /// cadence, so hosts without a separate tick source stay correct.
    pub fn media_time_update(&mut self, player: &mut dyn MediaPlayer) {
        if self.finalized() {
            return;
        }
        if let Some(gate) = &mut self.media {
            gate.time_update(player);
        }
        self.tick();
    }

    /// Natural end of playback: either finalizes the trial or unlocks the
    /// response controls, per configuration.
    pub fn media_ended(&mut self) {
        if self.phase != TrialPhase::AwaitingResponse {
            return;
        }
        let Some(gate) = &mut self.media else {
            return;
        };
        match gate.playback_ended() {
            MediaOutcome::FinalizeTrial => self.finalize(FinalizeTrigger::MediaEnded),
            MediaOutcome::EnableResponses => {
                self.responses_enabled = true;
                debug!("response controls enabled after playback end");
            }
            MediaOutcome::None => {}
        }
    }

    /// Deadline poll. Finalizes unconditionally once the configured trial
    /// duration has elapsed, regardless of media or response state.
    pub fn tick(&mut self) {
        if self.phase != TrialPhase::AwaitingResponse {
            return;
        }
        if let (Some(deadline), Some(t0)) = (self.deadline_ms, self.render_start) {
            if self.clock.elapsed_ms(t0) >= deadline as f64 {
                self.finalize(FinalizeTrigger::Timeout);
            }
        }
    }

    fn finalized(&self) -> bool {
        matches!(self.phase, TrialPhase::Finalizing | TrialPhase::Done)
    }

    /// The one-time transition. Re-entry is a suppressed no-op, never an
    /// error.
    fn finalize(&mut self, trigger: FinalizeTrigger) {
        if self.finalized() {
            return;
        }
        self.phase = TrialPhase::Finalizing;
        self.deadline_ms = None;

        let result = match self.config.kind {
            TrialKind::VideoSemanticDifferential => {
                let (rt, response) = match self.video_response {
                    Some((rt, value)) => (Some(rt), Some(value)),
                    None => (None, None),
                };
                let (stimulus, start) = self
                    .config
                    .media
                    .as_ref()
                    .map(|m| (m.sources.clone(), m.start))
                    .unwrap_or_default();
                TrialResult::Video(VideoData {
                    reaction_time_ms: rt,
                    stimulus,
                    start,
                    response,
                })
            }
            TrialKind::Table | TrialKind::SemanticDifferential => {
                let rt = self
                    .render_start
                    .map_or(0.0, |t0| self.clock.elapsed_ms(t0));
                TrialResult::Survey(SurveyData {
                    reaction_time_ms: rt,
                    responses: collect_responses(&self.groups, &self.selections),
                    presentation_order: self.order.as_slice().to_vec(),
                })
            }
        };

        self.surface.clear();
        self.phase = TrialPhase::Done;
        info!(?trigger, "trial finalized");
        if let Some(finish) = self.on_finish.take() {
            finish(result);
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == TrialPhase::Done
    }

    pub fn order(&self) -> &PresentationOrder {
        &self.order
    }

    pub fn layout(&self) -> &TrialLayout {
        &self.layout
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn view_and_surface(&mut self) -> (TrialView<'_>, &mut S) {
        let view = TrialView {
            config: &self.config,
            layout: &self.layout,
            order: &self.order,
            selections: &self.selections,
            phase: self.phase,
            responses_enabled: self.responses_enabled,
            submit_enabled: self.submit_enabled,
        };
        (view, &mut self.surface)
    }
}

fn plan_layout(config: &TrialConfig, order: &PresentationOrder) -> TrialLayout {
    match config.kind {
        TrialKind::Table => TrialLayout::Table(plan_table(
            order,
            config.shared_labels.len(),
            config.layout_width,
            config.alternate_row_color,
        )),
        TrialKind::SemanticDifferential => {
            let label_counts: Vec<usize> = config.questions.iter().map(|q| q.labels.len()).collect();
            TrialLayout::Scales(plan_scales(order, &label_counts, config.layout_width))
        }
        TrialKind::VideoSemanticDifferential => TrialLayout::VideoScale(plan_video_scale(
            config.questions[0].labels.len(),
            config.layout_width,
        )),
    }
}

fn bind_groups(config: &TrialConfig, order: &PresentationOrder) -> Vec<ResponseGroup> {
    if config.kind == TrialKind::VideoSemanticDifferential {
        return vec![ResponseGroup::for_video(&config.questions[0].name)];
    }
    (0..order.len())
        .map(|pos| {
            let original = order.original_index(pos);
            ResponseGroup::for_question(original, &config.questions[original].name)
        })
        .collect()
}
