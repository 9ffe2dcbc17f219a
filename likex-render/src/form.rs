//! Draws planned layouts into an owned pixmap surface and records widget
//! hit boxes, so a host can translate pointer events back into lifecycle
//! triggers without this crate knowing anything about windowing.

use std::collections::HashMap;
use std::sync::Arc;

use ab_glyph::FontArc;
use anyhow::{Context, Result, anyhow};
use likex_layout::{ScaleItem, ScalePlan, TablePlan, Track, VideoScalePlan};
use likex_trial::{Surface, TrialLayout, TrialPhase, TrialView, VIDEO_GROUP, group_id};
use string_cache::DefaultAtom as Atom;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Stroke, Transform,
};
use tracing::debug;

use crate::text::rasterize_text;

const MARGIN: f32 = 40.0;
const HEADER_ROW_H: f32 = 56.0;
const ROW_H: f32 = 48.0;
const SCALE_BLOCK_H: f32 = 96.0;
const STATEMENT_PX: f32 = 16.0;
const LABEL_PX: f32 = 13.0;
const RADIO_R: f32 = 7.0;
const RADIO_HIT: f32 = 28.0;
const BUTTON_W: f32 = 150.0;
const BUTTON_H: f32 = 38.0;
/// Share of the non-fixed width granted to each `auto` track.
const AUTO_SHARE: f32 = 0.45;

const INK: [u8; 4] = [34, 34, 34, 255];
const LABEL_INK: [u8; 4] = [68, 68, 68, 255];
const DISABLED_INK: [u8; 4] = [170, 170, 170, 255];

fn background() -> Color {
    Color::from_rgba8(255, 255, 255, 255)
}

fn shade() -> Color {
    Color::from_rgba8(248, 248, 248, 255)
}

fn line() -> Color {
    Color::from_rgba8(211, 211, 211, 255)
}

/// Axis-aligned hit box in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl WidgetRect {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// What a pointer press inside a widget means to the trial.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetAction {
    Radio { group: String, value: u32 },
    Submit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub rect: WidgetRect,
    pub action: WidgetAction,
}

/// The opaque mutable container a trial renders into: pixels plus the hit
/// boxes of the interactive widgets currently on them. The lifecycle
/// controller owns it for the trial's duration and wipes it at finalize.
pub struct FormSurface {
    canvas: Pixmap,
    widgets: Vec<Widget>,
}

impl FormSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let mut canvas = Pixmap::new(width, height).context("zero-sized surface")?;
        canvas.fill(background());
        Ok(Self {
            canvas,
            widgets: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    /// Topmost widget under a pointer position, if any.
    pub fn hit(&self, x: f32, y: f32) -> Option<&Widget> {
        self.widgets.iter().rev().find(|w| w.rect.contains(x, y))
    }

    /// Raw premultiplied RGBA bytes, one frame's worth.
    pub fn data(&self) -> &[u8] {
        self.canvas.data()
    }

    pub fn copy_to(&self, frame: &mut [u8]) {
        let len = self.canvas.data().len().min(frame.len());
        frame[..len].copy_from_slice(&self.canvas.data()[..len]);
    }

    fn begin_frame(&mut self) {
        self.canvas.fill(background());
        self.widgets.clear();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            let mut paint = Paint::default();
            paint.set_color(color);
            self.canvas.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }

    /// Blits a premultiplied pixmap with its center at (cx, cy).
    fn blit_centered(&mut self, pm: &Pixmap, cx: f32, cy: f32) {
        self.blit(
            pm,
            cx - pm.width() as f32 * 0.5,
            cy - pm.height() as f32 * 0.5,
        );
    }

    fn blit(&mut self, pm: &Pixmap, x: f32, y: f32) {
        let (cw, ch) = (self.canvas.width() as i32, self.canvas.height() as i32);
        let (x, y) = (x.floor() as i32, y.floor() as i32);
        let (w, h) = (pm.width() as i32, pm.height() as i32);
        if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
            return;
        }

        let src_x0 = (-x).max(0);
        let src_y0 = (-y).max(0);
        let copy_w = (w - src_x0).min(cw - x.max(0));
        let copy_h = (h - src_y0).min(ch - y.max(0));

        let stride = cw as usize;
        let src_stride = w as usize;
        let dst_x = x.max(0) as usize;
        let dst_y = y.max(0) as usize;
        let src = pm.pixels();
        let dst = self.canvas.pixels_mut();

        for row in 0..copy_h as usize {
            let src_off = (src_y0 as usize + row) * src_stride + src_x0 as usize;
            let dst_off = (dst_y + row) * stride + dst_x;
            for i in 0..copy_w as usize {
                let s = src[src_off + i];
                let sa = s.alpha() as u32;
                if sa == 0 {
                    continue;
                }
                if sa == 255 {
                    dst[dst_off + i] = s;
                    continue;
                }
                let d = dst[dst_off + i];
                let inv = 255 - sa;
                let r = s.red() as u32 + (d.red() as u32 * inv + 127) / 255;
                let g = s.green() as u32 + (d.green() as u32 * inv + 127) / 255;
                let b = s.blue() as u32 + (d.blue() as u32 * inv + 127) / 255;
                let a = sa + (d.alpha() as u32 * inv + 127) / 255;
                if let Some(px) =
                    PremultipliedColorU8::from_rgba(r as u8, g as u8, b as u8, a as u8)
                {
                    dst[dst_off + i] = px;
                }
            }
        }
    }

    fn draw_radio(&mut self, cx: f32, cy: f32, selected: bool, enabled: bool) {
        let ink = if enabled { LABEL_INK } else { DISABLED_INK };
        let ring = Color::from_rgba8(ink[0], ink[1], ink[2], ink[3]);
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(ring);

        let mut pb = PathBuilder::new();
        pb.push_circle(cx, cy, RADIO_R);
        if let Some(path) = pb.finish() {
            let stroke = Stroke {
                width: 1.5,
                ..Stroke::default()
            };
            self.canvas
                .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }

        if selected {
            let mut pb = PathBuilder::new();
            pb.push_circle(cx, cy, RADIO_R - 3.0);
            if let Some(path) = pb.finish() {
                self.canvas.fill_path(
                    &path,
                    &paint,
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        }
    }

    fn push_radio_widget(&mut self, cx: f32, cy: f32, group: String, value: u32) {
        self.widgets.push(Widget {
            rect: WidgetRect {
                x: cx - RADIO_HIT * 0.5,
                y: cy - RADIO_HIT * 0.5,
                w: RADIO_HIT,
                h: RADIO_HIT,
            },
            action: WidgetAction::Radio { group, value },
        });
    }
}

impl Surface for FormSurface {
    fn clear(&mut self) {
        self.begin_frame();
    }
}

/// Resolves grid tracks into pixel widths: `px` tracks are taken as-is,
/// `auto` tracks split a fixed share of the rest, `fr` tracks divide what
/// remains by weight.
fn resolve_tracks(tracks: &[Track], content_w: f32) -> Vec<f32> {
    let fixed: f32 = tracks
        .iter()
        .map(|t| if let Track::Px(px) = t { *px } else { 0.0 })
        .sum();
    let autos = tracks.iter().filter(|t| matches!(t, Track::Auto)).count() as f32;
    let fr_units: f32 = tracks
        .iter()
        .map(|t| if let Track::Fr(n) = t { *n as f32 } else { 0.0 })
        .sum();

    let remaining = (content_w - fixed).max(0.0);
    let auto_w = if autos > 0.0 {
        AUTO_SHARE * remaining / autos
    } else {
        0.0
    };
    let per_fr = if fr_units > 0.0 {
        (remaining - auto_w * autos) / fr_units
    } else {
        0.0
    };

    tracks
        .iter()
        .map(|t| match t {
            Track::Px(px) => *px,
            Track::Auto => auto_w,
            Track::Fr(n) => per_fr * *n as f32,
        })
        .collect()
}

fn column_left(widths: &[f32], index: usize) -> f32 {
    widths[..index].iter().sum()
}

/// Rasterizes trial views into a [`FormSurface`]. Text pixmaps are cached by
/// (atom, size, color) since label strings repeat across rows and frames.
pub struct FormRenderer {
    font: FontArc,
    cache: HashMap<(Atom, u32, [u8; 4]), Arc<Pixmap>>,
}

impl FormRenderer {
    pub fn new(font: FontArc) -> Self {
        Self {
            font,
            cache: HashMap::new(),
        }
    }

    pub fn from_font_bytes(bytes: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(bytes).map_err(|e| anyhow!("font data: {e}"))?;
        Ok(Self::new(font))
    }

    fn text(&mut self, text: &str, size_px: f32, color: [u8; 4]) -> Arc<Pixmap> {
        let key = (Atom::from(text), (size_px * 10.0) as u32, color);
        if let Some(pm) = self.cache.get(&key) {
            return Arc::clone(pm);
        }
        let pm = Arc::new(rasterize_text(text, &self.font, size_px, color));
        self.cache.insert(key, Arc::clone(&pm));
        pm
    }

    /// Redraws the whole trial. A finalized trial stays blank; the
    /// controller has already wiped the surface.
    pub fn draw(&mut self, view: &TrialView<'_>, surface: &mut FormSurface) -> Result<()> {
        if matches!(view.phase, TrialPhase::Finalizing | TrialPhase::Done) {
            return Ok(());
        }
        surface.begin_frame();

        let canvas_w = surface.width() as f32;
        let mut y = MARGIN;
        if let Some(preamble) = &view.config.preamble {
            let pm = self.text(preamble, STATEMENT_PX, INK);
            surface.blit_centered(&pm, canvas_w * 0.5, y + pm.height() as f32 * 0.5);
            y += pm.height() as f32 + 24.0;
        }

        let bottom = match view.layout {
            TrialLayout::Table(plan) => self.draw_table(plan, view, surface, y),
            TrialLayout::Scales(plan) => self.draw_scales(plan, view, surface, y),
            TrialLayout::VideoScale(plan) => self.draw_video_scale(plan, view, surface, y),
        };

        self.draw_button(view, surface, bottom + 28.0);
        debug!(widgets = surface.widgets.len(), "form drawn");
        Ok(())
    }

    fn content_region(&self, surface: &FormSurface, width_px: Option<u32>) -> (f32, f32) {
        let canvas_w = surface.width() as f32;
        let max_w = canvas_w - 2.0 * MARGIN;
        let content_w = width_px.map_or(max_w, |w| (w as f32).min(max_w));
        ((canvas_w - content_w) * 0.5, content_w)
    }

    fn draw_table(
        &mut self,
        plan: &TablePlan,
        view: &TrialView<'_>,
        surface: &mut FormSurface,
        y0: f32,
    ) -> f32 {
        let (x0, content_w) = self.content_region(surface, plan.width_px);
        let widths = resolve_tracks(&plan.columns, content_w);
        let n = plan.question_rows.len();
        let table_h = HEADER_ROW_H + n as f32 * ROW_H;
        let row_top = |row: u32| {
            if row <= 1 {
                y0
            } else {
                y0 + HEADER_ROW_H + (row - 2) as f32 * ROW_H
            }
        };

        for &row in &plan.shaded_rows {
            surface.fill_rect(x0, row_top(row), content_w, ROW_H, shade());
        }

        for (j, cell) in plan.header_cells.iter().enumerate() {
            let col = cell.column.start as usize - 1;
            let cx = x0 + column_left(&widths, col) + widths[col] * 0.5;
            let pm = self.text(&view.config.shared_labels[j], LABEL_PX, LABEL_INK);
            surface.blit_centered(&pm, cx, y0 + HEADER_ROW_H * 0.5);
        }

        // Header rule and the statement divider.
        surface.fill_rect(x0, row_top(plan.header_rule_row + 1) - 1.0, content_w, 1.0, line());
        let divider_x =
            x0 + column_left(&widths, plan.divider_column as usize - 1) + widths[plan.divider_column as usize - 1];
        surface.fill_rect(divider_x, y0, 1.0, table_h, line());

        for row in &plan.question_rows {
            let cy = row_top(row.row) + ROW_H * 0.5;
            let question = &view.config.questions[row.original_index];
            let group = group_id(row.original_index);

            let number = format!("{})", row.display_position + 1);
            let num_col = row.number_cell.column.start as usize - 1;
            let pm = self.text(&number, STATEMENT_PX, INK);
            surface.blit_centered(&pm, x0 + column_left(&widths, num_col) + widths[num_col] * 0.5, cy);

            let stmt_col = row.statement_cell.column.start as usize - 1;
            let pm = self.text(&question.prompt, STATEMENT_PX, INK);
            let stmt_x = x0 + column_left(&widths, stmt_col) + 10.0;
            surface.blit(&pm, stmt_x, cy - pm.height() as f32 * 0.5);

            for option in &row.option_cells {
                let col = option.cell.column.start as usize - 1;
                let cx = x0 + column_left(&widths, col) + widths[col] * 0.5;
                let selected = view.selections.get(&group) == Some(&option.value);
                surface.draw_radio(cx, cy, selected, view.responses_enabled);
                surface.push_radio_widget(cx, cy, group.clone(), option.value);
            }
        }

        y0 + table_h
    }

    fn draw_scales(
        &mut self,
        plan: &ScalePlan,
        view: &TrialView<'_>,
        surface: &mut FormSurface,
        y0: f32,
    ) -> f32 {
        let (x0, content_w) = self.content_region(surface, plan.width_px);
        let mut y = y0;

        for row in &plan.rows {
            let question = &view.config.questions[row.original_index];
            let group = group_id(row.original_index);

            let pm = self.text(&question.prompt, STATEMENT_PX, INK);
            surface.blit_centered(
                &pm,
                x0 + content_w * 0.5,
                y + pm.height() as f32 * 0.5,
            );
            let radio_cy = y + 52.0;
            let label_cy = y + 76.0;

            let item_w = content_w * row.item_width_pct / 100.0;
            for (i, item) in row.items.iter().enumerate() {
                let cx = x0 + i as f32 * item_w + item_w * 0.5;
                match item {
                    ScaleItem::Pole { pole } => {
                        if let Some(poles) = &question.poles {
                            let pm = self.text(&poles[*pole], LABEL_PX, INK);
                            surface.blit_centered(&pm, cx, radio_cy);
                        }
                    }
                    ScaleItem::Option { value } => {
                        let selected = view.selections.get(&group) == Some(value);
                        surface.draw_radio(cx, radio_cy, selected, view.responses_enabled);
                        surface.push_radio_widget(cx, radio_cy, group.clone(), *value);
                        let pm = self.text(&question.labels[*value as usize], LABEL_PX, LABEL_INK);
                        surface.blit_centered(&pm, cx, label_cy);
                    }
                }
            }
            y += SCALE_BLOCK_H;
        }

        y
    }

    fn draw_video_scale(
        &mut self,
        plan: &VideoScalePlan,
        view: &TrialView<'_>,
        surface: &mut FormSurface,
        y0: f32,
    ) -> f32 {
        let (x0, content_w) = self.content_region(surface, plan.width_px);
        let canvas_w = surface.width() as f32;
        let media = view.config.media.as_ref();
        let mut y = y0;

        // Stimulus hole: the host composites video frames over this region.
        let stim_w = media
            .and_then(|m| m.width)
            .map_or(640.0, |w| w as f32)
            .min(content_w);
        let stim_h = media.and_then(|m| m.height).map_or(360.0, |h| h as f32);
        surface.fill_rect(
            (canvas_w - stim_w) * 0.5,
            y,
            stim_w,
            stim_h,
            Color::from_rgba8(0, 0, 0, 255),
        );
        y += stim_h + 28.0;

        let question = &view.config.questions[0];
        let widths = resolve_tracks(&plan.columns, content_w);
        let radio_cy = y + 18.0;
        let label_cy = y + 48.0;

        if let Some(poles) = &question.poles {
            for (pole, cell) in [(0usize, plan.pole_left), (1usize, plan.pole_right)] {
                let col = cell.column.start as usize - 1;
                let cx = x0 + column_left(&widths, col) + widths[col] * 0.5;
                let pm = self.text(&poles[pole], STATEMENT_PX, INK);
                surface.blit_centered(&pm, cx, radio_cy);
            }
        }

        for option in &plan.option_cells {
            let col = option.cell.column.start as usize - 1;
            let cx = x0 + column_left(&widths, col) + widths[col] * 0.5;
            let selected = view.selections.get(VIDEO_GROUP) == Some(&option.value);
            surface.draw_radio(cx, radio_cy, selected, view.responses_enabled);
            surface.push_radio_widget(cx, radio_cy, VIDEO_GROUP.to_string(), option.value);
        }
        for (j, cell) in plan.label_cells.iter().enumerate() {
            let col = cell.column.start as usize - 1;
            let cx = x0 + column_left(&widths, col) + widths[col] * 0.5;
            let pm = self.text(&question.labels[j], LABEL_PX, LABEL_INK);
            surface.blit_centered(&pm, cx, label_cy);
        }
        y = label_cy + 20.0;

        if let Some(prompt) = media.and_then(|m| m.prompt.as_ref()) {
            let pm = self.text(prompt, STATEMENT_PX, INK);
            surface.blit_centered(&pm, canvas_w * 0.5, y + pm.height() as f32 * 0.5);
            y += pm.height() as f32 + 12.0;
        }

        y
    }

    fn draw_button(&mut self, view: &TrialView<'_>, surface: &mut FormSurface, y: f32) {
        let canvas_w = surface.width() as f32;
        let x = (canvas_w - BUTTON_W) * 0.5;
        surface.fill_rect(x, y, BUTTON_W, BUTTON_H, Color::from_rgba8(240, 240, 240, 255));
        surface.fill_rect(x, y, BUTTON_W, 1.0, line());
        surface.fill_rect(x, y + BUTTON_H - 1.0, BUTTON_W, 1.0, line());
        surface.fill_rect(x, y, 1.0, BUTTON_H, line());
        surface.fill_rect(x + BUTTON_W - 1.0, y, 1.0, BUTTON_H, line());

        let ink = if view.submit_enabled { INK } else { DISABLED_INK };
        let pm = self.text(&view.config.button_label, 15.0, ink);
        surface.blit_centered(&pm, canvas_w * 0.5, y + BUTTON_H * 0.5);

        surface.widgets.push(Widget {
            rect: WidgetRect {
                x,
                y,
                w: BUTTON_W,
                h: BUTTON_H,
            },
            action: WidgetAction::Submit,
        });
    }
}
