use anyhow::{Context, Result};
use likex_core::{TrialConfig, TrialKind, TrialResult};
use likex_layout::Shuffled;
use likex_render::{FormRenderer, FormSurface, WidgetAction};
use likex_timing::MonotonicClock;
use likex_trial::{FinishFn, MediaPlayer, SubmitOutcome, TrialController};
use pixels::{Pixels, SurfaceTexture};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

const WINDOW_WIDTH: u32 = 1024;
const WINDOW_HEIGHT: u32 = 768;
const FALLBACK_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
/// Nominal clip length of the stand-in player, seconds.
const DEMO_CLIP_SECONDS: f64 = 12.0;

/// Wall-clock playback stand-in for hosts without a real decoder. The
/// play-head advances at the configured rate while playing; pause, seek and
/// visibility behave like a real handle so the gating logic is exercised
/// unchanged.
struct DemoPlayer {
    position: f64,
    rate: f64,
    playing: bool,
    visible: bool,
    duration: f64,
    last_tick: Instant,
    seek_pending: bool,
    end_reported: bool,
}

impl DemoPlayer {
    fn new(duration: f64) -> Self {
        Self {
            position: 0.0,
            rate: 1.0,
            playing: false,
            visible: true,
            duration,
            last_tick: Instant::now(),
            seek_pending: false,
            end_reported: false,
        }
    }

    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        if self.playing {
            self.position = (self.position + dt * self.rate).min(self.duration);
        }
    }

    /// Seeks complete instantly; the host still reports them so the gate
    /// sees the same loaded/seeked handshake a real player produces.
    fn take_seek_pending(&mut self) -> bool {
        std::mem::take(&mut self.seek_pending)
    }

    /// True exactly once, when the play-head first reaches the clip end.
    fn crossed_end(&mut self) -> bool {
        if self.end_reported || self.position < self.duration {
            return false;
        }
        self.playing = false;
        self.end_reported = true;
        true
    }
}

impl MediaPlayer for DemoPlayer {
    fn play(&mut self) {
        self.last_tick = Instant::now();
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        self.position = seconds.clamp(0.0, self.duration);
        self.seek_pending = true;
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

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<FormRenderer>,
    trial: Option<TrialController<MonotonicClock, FormSurface>>,
    /// Taken when the window comes up and the trial starts.
    pending: Option<TrialConfig>,
    kind: TrialKind,
    player: Option<DemoPlayer>,
    result: Rc<RefCell<Option<TrialResult>>>,
    cursor: (f32, f32),
    should_exit: bool,
}

impl App {
    pub fn new(config: TrialConfig) -> Result<Self> {
        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            trial: None,
            kind: config.kind,
            pending: Some(config),
            player: None,
            result: Rc::new(RefCell::new(None)),
            cursor: (0.0, 0.0),
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn load_font() -> Result<Vec<u8>> {
        let path = std::env::var("LIKEX_FONT").unwrap_or_else(|_| FALLBACK_FONT.to_string());
        std::fs::read(&path).with_context(|| format!("reading font {path}"))
    }

    fn create_window_and_trial(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("likex")
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();

        let surface_texture = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface_texture)?);
        self.renderer = Some(FormRenderer::from_font_bytes(Self::load_font()?)?);

        let surface = FormSurface::new(size.width, size.height)?;
        let config = self.pending.take().context("trial already started")?;
        let slot = Rc::clone(&self.result);
        let on_finish: FinishFn = Box::new(move |result| {
            *slot.borrow_mut() = Some(result);
        });

        let mut source = Shuffled(rand::rng());
        let mut trial = TrialController::new(
            config,
            MonotonicClock::new(),
            surface,
            &mut source,
            on_finish,
        )?;
        trial.begin();

        if self.kind == TrialKind::VideoSemanticDifferential {
            let mut player = DemoPlayer::new(DEMO_CLIP_SECONDS);
            trial.media_loaded(&mut player);
            if player.take_seek_pending() {
                trial.media_seeked(&mut player);
            }
            self.player = Some(player);
        }

        self.trial = Some(trial);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(trial) = &mut self.trial else {
            return Ok(());
        };

        if let Some(player) = &mut self.player {
            player.advance();
            trial.media_time_update(player);
            if player.crossed_end() {
                trial.media_ended();
            }
        } else {
            trial.tick();
        }

        let renderer = self.renderer.as_mut().context("renderer missing")?;
        let pixels = self.pixels.as_mut().context("pixels missing")?;
        let (view, surface) = trial.view_and_surface();
        renderer.draw(&view, surface)?;
        surface.copy_to(pixels.frame_mut());
        pixels.render()?;
        Ok(())
    }

    fn handle_click(&mut self) {
        let Some(trial) = &mut self.trial else {
            return;
        };
        let (x, y) = self.cursor;
        let action = trial.surface().hit(x, y).map(|w| w.action.clone());
        match action {
            Some(WidgetAction::Radio { group, value }) => {
                trial.select(&group, value);
            }
            Some(WidgetAction::Submit) => {
                let outcome = trial.submit();
                if outcome == SubmitOutcome::Ignored {
                    trial.click_continue();
                }
            }
            None => {}
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    /// Writes the finished trial's data to stdout and schedules shutdown.
    fn report_result(&mut self) {
        let Some(result) = self.result.borrow_mut().take() else {
            return;
        };
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "could not serialize trial data"),
        }
        info!("trial complete");
        self.should_exit = true;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_trial(event_loop) {
                error!(error = %e, "could not start the trial");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    error!(error = %e, "render failed");
                    event_loop.exit();
                    return;
                }
                if self.trial.as_ref().is_some_and(|t| t.is_done()) {
                    self.report_result();
                } else if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.handle_click(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
