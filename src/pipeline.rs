//! Render cycle
//!
//! One tick resolves the time code, asks for a poem, picks an image from the
//! index, downloads it, lays the poem out over the image's text region, and
//! hands the frame to the display. Failures end the cycle without touching
//! `last_rendered`, so the next tick simply tries again.

use chrono::Timelike;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{AppConfig, DisplayGeometry, LayoutConfig};
use crate::error::{Error, Result};
use crate::fetch::AssetFetcher;
use crate::http::HttpConnection;
use crate::layout::{layout, TextLayout};
use crate::poem::{normalize, FontFamily, PoemContent, PoemService};
use crate::state::DisplayState;
use crate::time_index::{TimeCode, TimeIndex};

/// Image plus laid-out poem, ready to compose.
#[derive(Debug, Clone, Copy)]
pub struct ClockFrame<'a> {
    pub code: TimeCode,
    /// Encoded image as downloaded
    pub image: &'a [u8],
    pub font: FontFamily,
    pub layout: &'a TextLayout,
}

/// Full-screen note text.
#[derive(Debug, Clone, Copy)]
pub struct NoteFrame<'a> {
    pub font: FontFamily,
    pub layout: &'a TextLayout,
}

/// Where frames end up. Implementations own decoding and rasterization.
pub trait DisplaySink {
    /// Width of `text` at `size` pixels in the given face.
    fn text_width(&self, font: FontFamily, text: &str, size: u32) -> u32;

    fn show_clock(&mut self, frame: &ClockFrame<'_>) -> Result<()>;

    fn show_note(&mut self, frame: &NoteFrame<'_>) -> Result<()>;

    /// Brief full-screen confirmation after a like.
    fn show_acknowledgment(&mut self) -> Result<()>;

    /// Boot progress or a persistent error message.
    fn show_status(&mut self, message: &str) -> Result<()>;
}

#[derive(Debug)]
pub enum RenderOutcome {
    /// Time code already on screen
    Unchanged,
    Rendered(TimeCode),
    /// Cycle aborted, previous frame stays up
    Failed(Error),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered(_))
    }
}

pub struct RenderPipeline<C> {
    index: TimeIndex,
    fetcher: AssetFetcher<C>,
    rng: StdRng,
    geometry: DisplayGeometry,
    poem_layout: LayoutConfig,
    note_layout: LayoutConfig,
    image_limit: usize,
}

impl<C: HttpConnection> RenderPipeline<C> {
    pub fn new(index: TimeIndex, conn: C, config: &AppConfig) -> Self {
        Self {
            index,
            fetcher: AssetFetcher::new(conn),
            rng: StdRng::from_entropy(),
            geometry: config.geometry,
            poem_layout: config.poem_layout,
            note_layout: config.note_layout,
            image_limit: config.limits.image,
        }
    }

    /// Replace the candidate picker's randomness, for repeatable runs.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn fetcher(&mut self) -> &mut AssetFetcher<C> {
        &mut self.fetcher
    }

    /// Render the clock view for `now` unless that time code is already shown.
    pub fn tick<T, P, D>(
        &mut self,
        ctx: &mut DisplayState,
        now: &T,
        poems: &mut P,
        display: &mut D,
    ) -> RenderOutcome
    where
        T: Timelike,
        P: PoemService + ?Sized,
        D: DisplaySink + ?Sized,
    {
        let code = TimeCode::from_time(now);
        if ctx.last_rendered == Some(code) {
            debug!("{} already on screen", code);
            return RenderOutcome::Unchanged;
        }
        let poem = compose_or_default(poems, &time24(now));
        self.render(ctx, code, poem, display)
    }

    /// Render the clock view for `now` even if it is already shown. The poem of
    /// the last render is reused while the time code has not moved on.
    pub fn redraw<T, P, D>(
        &mut self,
        ctx: &mut DisplayState,
        now: &T,
        poems: &mut P,
        display: &mut D,
    ) -> RenderOutcome
    where
        T: Timelike,
        P: PoemService + ?Sized,
        D: DisplaySink + ?Sized,
    {
        let code = TimeCode::from_time(now);
        let poem = match &ctx.poem {
            Some(poem) if ctx.poem_code == Some(code) => poem.clone(),
            _ => compose_or_default(poems, &time24(now)),
        };
        self.render(ctx, code, poem, display)
    }

    /// Show the current poem's note full-screen. `Ok(false)` when there is none.
    pub fn show_note<D>(&self, ctx: &mut DisplayState, now_ms: u64, display: &mut D) -> Result<bool>
    where
        D: DisplaySink + ?Sized,
    {
        let Some((font, body)) = ctx
            .poem
            .as_ref()
            .and_then(|p| p.note.as_ref().map(|n| (p.font, normalize(&n.body))))
        else {
            debug!("No note to show");
            return Ok(false);
        };

        let measure = |text: &str, size: u32| display.text_width(font, text, size);
        let layout = layout(&body, self.geometry.full_screen(), &self.note_layout, &measure);
        display.show_note(&NoteFrame { font, layout: &layout })?;

        ctx.enter_note(now_ms);
        info!("Note shown");
        Ok(true)
    }

    fn render<D>(
        &mut self,
        ctx: &mut DisplayState,
        code: TimeCode,
        poem: PoemContent,
        display: &mut D,
    ) -> RenderOutcome
    where
        D: DisplaySink + ?Sized,
    {
        match self.draw_clock(code, &poem, display) {
            Ok(()) => {
                ctx.last_rendered = Some(code);
                ctx.poem_code = Some(code);
                ctx.poem = Some(poem);
                RenderOutcome::Rendered(code)
            }
            Err(e) => {
                error!("Render of {} abandoned: {}", code, e);
                RenderOutcome::Failed(e)
            }
        }
    }

    fn draw_clock<D>(&mut self, code: TimeCode, poem: &PoemContent, display: &mut D) -> Result<()>
    where
        D: DisplaySink + ?Sized,
    {
        let candidate = self
            .index
            .find_nearest(code, &mut self.rng)
            .ok_or(Error::IndexEmpty)?;
        let image = self.fetcher.fetch(&candidate.url, self.image_limit)?;

        let region = candidate.text_region(&self.geometry);
        let text = poem.display_text();
        let font = poem.font;
        let measure = |text: &str, size: u32| display.text_width(font, text, size);
        let layout = layout(&text, region, &self.poem_layout, &measure);
        info!(
            "Time {}: {} lines at size {} in {}x{}",
            code,
            layout.lines.len(),
            layout.font_size,
            region.width,
            region.height
        );

        display.show_clock(&ClockFrame {
            code,
            image: &image,
            font,
            layout: &layout,
        })
    }
}

fn compose_or_default<P: PoemService + ?Sized>(poems: &mut P, time24: &str) -> PoemContent {
    poems.compose(time24).unwrap_or_else(|e| {
        warn!("Poem unavailable ({}), using default", e);
        PoemContent::fallback()
    })
}

/// 24-hour `HH:MM` for the poem service.
pub fn time24<T: Timelike>(now: &T) -> String {
    format!("{:02}:{:02}", now.hour(), now.minute())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;

    #[test]
    fn time24_is_zero_padded() {
        let t = NaiveTime::from_hms_opt(7, 5, 0).unwrap();
        assert_eq!(time24(&t), "07:05");
        let t = NaiveTime::from_hms_opt(21, 30, 59).unwrap();
        assert_eq!(time24(&t), "21:30");
    }

    #[test]
    fn only_successful_renders_count() {
        assert!(RenderOutcome::Rendered(TimeCode::from_24h(9, 30)).is_rendered());
        assert!(!RenderOutcome::Unchanged.is_rendered());
        assert!(!RenderOutcome::Failed(Error::SizeUnknown).is_rendered());
    }
}
