//! Adaptive text layout
//!
//! Finds the largest font size whose greedily wrapped text fits a margin-reduced
//! share of a target region, then centers the lines inside the full region.
//! Width comes from a caller-supplied [`TextMeasure`], so the same search serves
//! TTF fonts, the mono fallback font, and tests.

use log::{debug, warn};

use crate::config::LayoutConfig;

/// Axis-aligned rectangle in panel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn center_x(&self) -> i32 {
        self.x + (self.width / 2) as i32
    }
}

/// Rendered width of `text` at font size `size`, in pixels.
pub trait TextMeasure {
    fn text_width(&self, text: &str, size: u32) -> u32;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, u32) -> u32,
{
    fn text_width(&self, text: &str, size: u32) -> u32 {
        self(text, size)
    }
}

/// One output line with its top-left anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    /// Top of the em box
    pub y: i32,
    pub width: u32,
}

/// Result of a layout search.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: u32,
    pub lines: Vec<PlacedLine>,
    pub usable_width: u32,
    pub usable_height: u32,
    /// False when even the smallest size overflowed the usable height
    pub fits: bool,
}

impl TextLayout {
    pub fn line_texts(&self) -> Vec<&str> {
        self.lines.iter().map(|l| l.text.as_str()).collect()
    }
}

/// Lay `text` out inside `region`. Never fails: if no size fits, the smallest
/// size is used and the block may overflow vertically.
pub fn layout<M>(text: &str, region: Region, config: &LayoutConfig, measure: &M) -> TextLayout
where
    M: TextMeasure + ?Sized,
{
    let usable_width = (region.width as f32 * config.width_fraction) as u32;
    let usable_height = (region.height as f32 * config.height_fraction) as u32;

    let mut chosen: Option<(u32, Vec<&str>)> = None;
    let mut smallest: Option<(u32, Vec<&str>)> = None;

    for size in config.sizes() {
        let lines = wrap(text, usable_width, size, config.max_lines, measure);
        let block = block_height(lines.len(), size, config);

        if block <= usable_height as f32 {
            chosen = Some((size, lines));
            break;
        }
        smallest = Some((size, lines));
    }

    let fits = chosen.is_some();
    let (font_size, lines) = match chosen.or(smallest) {
        Some(found) => found,
        // empty size range
        None => {
            let size = config.min_font_size;
            (size, wrap(text, usable_width, size, config.max_lines, measure))
        }
    };

    if fits {
        debug!(
            "Zone {}x{} -> {} lines, font size {}",
            region.width,
            region.height,
            lines.len(),
            font_size
        );
    } else {
        warn!(
            "Text does not fit {}x{} even at size {}, {} lines may overflow",
            usable_width,
            usable_height,
            font_size,
            lines.len()
        );
    }

    let lines = place(&lines, region, font_size, config, measure);

    TextLayout {
        font_size,
        lines,
        usable_width,
        usable_height,
        fits,
    }
}

fn block_height(line_count: usize, size: u32, config: &LayoutConfig) -> f32 {
    line_count as f32 * size as f32 * config.line_height
}

/// Greedy word wrap. Each line is the longest prefix of the remaining text that
/// measures within `max_width`, cut at its last whitespace, or at the last
/// fitting character when the prefix has none. Text past `max_lines` is dropped.
pub fn wrap<'a, M>(
    text: &'a str,
    max_width: u32,
    size: u32,
    max_lines: usize,
    measure: &M,
) -> Vec<&'a str>
where
    M: TextMeasure + ?Sized,
{
    let mut lines = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() && lines.len() < max_lines {
        let (line, consumed) = next_line(rest, max_width, size, measure);
        lines.push(line);
        rest = rest[consumed..].trim_start();
    }

    lines
}

fn next_line<'a, M>(rest: &'a str, max_width: u32, size: u32, measure: &M) -> (&'a str, usize)
where
    M: TextMeasure + ?Sized,
{
    let mut fit_end = 0;
    let mut last_break = None;

    for (idx, ch) in rest.char_indices() {
        let end = idx + ch.len_utf8();
        if measure.text_width(&rest[..end], size) > max_width {
            break;
        }
        fit_end = end;
        if ch.is_whitespace() {
            last_break = Some(idx);
        }
    }

    if fit_end == rest.len() {
        return (rest.trim_end(), rest.len());
    }

    // The character right after the fitting prefix may itself be the break
    let next_is_break = rest[fit_end..].starts_with(char::is_whitespace);

    let cut = if next_is_break {
        fit_end
    } else {
        match last_break {
            Some(idx) if idx > 0 => idx,
            _ if fit_end > 0 => fit_end,
            // A single glyph wider than the line still has to go somewhere
            _ => rest.chars().next().map_or(rest.len(), char::len_utf8),
        }
    };

    (rest[..cut].trim_end(), cut)
}

fn place<M>(
    lines: &[&str],
    region: Region,
    size: u32,
    config: &LayoutConfig,
    measure: &M,
) -> Vec<PlacedLine>
where
    M: TextMeasure + ?Sized,
{
    let pitch = size as f32 * config.line_height;
    let block = block_height(lines.len(), size, config);
    let top = region.y as f32 + (region.height as f32 - block) / 2.0;
    // Distance from the em-box top to the visual middle of the glyphs
    let ink_middle = size as f32 * (1.0 + config.ascender - config.descender) / 2.0;

    lines
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let width = measure.text_width(text, size);
            let slot_middle = top + pitch * (i as f32 + 0.5);
            PlacedLine {
                text: (*text).to_string(),
                x: region.x + (region.width as i32 - width as i32) / 2,
                y: (slot_middle - ink_middle).round() as i32,
                width,
            }
        })
        .collect()
}
