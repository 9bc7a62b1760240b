//! Reference display sink
//!
//! Composes frames into a packed 1-bit [`Framebuffer`] with `embedded-graphics`
//! and hands the finished buffer to a [`Panel`]. PNG photographs are decoded
//! with `image` and thresholded; poem text uses the TTF faces fetched at boot
//! through `ab_glyph`, falling back to the built-in 10x20 mono font.

use core::convert::Infallible;
use core::f32::consts::PI;

use ab_glyph::{point, Font, FontVec, GlyphId, PxScale, ScaleFont};
use embedded_graphics::mono_font::ascii::FONT_10X20;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};
use image::ImageFormat;
use log::{info, warn};

use crate::config::DisplayGeometry;
use crate::error::{Error, Result};
use crate::layout::TextLayout;
use crate::pipeline::{ClockFrame, DisplaySink, NoteFrame};
use crate::poem::FontFamily;

// Pre-converted acknowledgment icon (generated at build time, may be empty)
const ACK_ICON: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/liked.bin"));
/// Edge length of the square acknowledgment icon
pub const ACK_ICON_SIZE: u32 = 160;

/// Luma below this is ink
const INK_THRESHOLD: u8 = 128;
/// Glyph coverage at or above this is ink
const COVERAGE_THRESHOLD: f32 = 0.5;
const MONO_ADVANCE: u32 = 10;

pub const STATUS_TITLE: &str = "Poem/1";
pub const STATUS_SUBTITLE: &str = "Stopped Clocks Mod";

/// Row-major 1-bit image, MSB first, set bits are ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let stride = width.div_ceil(8) as usize;
        Self {
            width,
            height,
            bits: vec![0; stride * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    pub fn fill_white(&mut self) {
        self.bits.fill(0);
    }

    /// Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, ink: bool) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let idx = y as usize * self.stride() + x as usize / 8;
        let mask = 0x80u8 >> (x as u32 % 8);
        if ink {
            self.bits[idx] |= mask;
        } else {
            self.bits[idx] &= !mask;
        }
    }

    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.stride() + x as usize / 8;
        self.bits[idx] & (0x80 >> (x % 8)) != 0
    }

    pub fn ink_count(&self) -> usize {
        self.bits.iter().map(|b| b.count_ones() as usize).sum()
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            self.set(p.x, p.y, color.is_on());
        }
        Ok(())
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

fn paint<D>(frame: &mut Framebuffer, item: &D)
where
    D: Drawable<Color = BinaryColor>,
{
    match item.draw(frame) {
        Ok(_) => {}
        Err(never) => match never {},
    }
}

/// Physical e-paper refresh.
pub trait Panel {
    fn refresh(&mut self, frame: &Framebuffer) -> Result<()>;
}

/// TTF faces fetched at boot. Serif falls back to sans, sans to the mono font.
#[derive(Default)]
pub struct FontBook {
    sans: Option<FontVec>,
    serif: Option<FontVec>,
}

impl FontBook {
    pub fn from_buffers(sans: Option<Vec<u8>>, serif: Option<Vec<u8>>) -> Self {
        Self {
            sans: sans.and_then(|b| parse_font("Inter", b)),
            serif: serif.and_then(|b| parse_font("Playfair", b)),
        }
    }

    fn face(&self, family: FontFamily) -> Option<&FontVec> {
        match family {
            FontFamily::Serif => self.serif.as_ref().or(self.sans.as_ref()),
            FontFamily::Sans => self.sans.as_ref(),
        }
    }

    pub fn has_ttf(&self, family: FontFamily) -> bool {
        self.face(family).is_some()
    }

    /// Pixel width of `text`. The mono fallback has one size, so `size` is ignored there.
    pub fn text_width(&self, family: FontFamily, text: &str, size: u32) -> u32 {
        match self.face(family) {
            Some(font) => ttf_width(font, text, size),
            None => text.chars().count() as u32 * MONO_ADVANCE,
        }
    }

    /// Draw `text` with its em box's top-left corner at (`x`, `y`).
    pub fn draw(
        &self,
        frame: &mut Framebuffer,
        family: FontFamily,
        text: &str,
        x: i32,
        y: i32,
        size: u32,
    ) {
        match self.face(family) {
            Some(font) => draw_ttf(frame, font, text, x, y, size),
            None => paint(
                frame,
                &Text::with_baseline(
                    text,
                    Point::new(x, y),
                    MonoTextStyle::new(&FONT_10X20, BinaryColor::On),
                    Baseline::Top,
                ),
            ),
        }
    }

    fn draw_centered(&self, frame: &mut Framebuffer, text: &str, center: Point, size: u32) {
        let width = self.text_width(FontFamily::Sans, text, size) as i32;
        let height = if self.has_ttf(FontFamily::Sans) { size as i32 } else { 20 };
        self.draw(
            frame,
            FontFamily::Sans,
            text,
            center.x - width / 2,
            center.y - height / 2,
            size,
        );
    }
}

fn parse_font(name: &str, bytes: Vec<u8>) -> Option<FontVec> {
    match FontVec::try_from_vec(bytes) {
        Ok(font) => {
            info!("{} font loaded", name);
            Some(font)
        }
        Err(e) => {
            warn!("{} font unusable: {}", name, e);
            None
        }
    }
}

fn ttf_width(font: &FontVec, text: &str, size: u32) -> u32 {
    let scaled = font.as_scaled(PxScale::from(size as f32));
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }

    width.ceil().max(0.0) as u32
}

fn draw_ttf(frame: &mut Framebuffer, font: &FontVec, text: &str, x: i32, y: i32, size: u32) {
    let scale = PxScale::from(size as f32);
    let scaled = font.as_scaled(scale);
    let baseline = y as f32 + scaled.ascent();
    let mut caret = x as f32;
    let mut prev: Option<GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                if coverage >= COVERAGE_THRESHOLD {
                    frame.set(
                        bounds.min.x as i32 + gx as i32,
                        bounds.min.y as i32 + gy as i32,
                        true,
                    );
                }
            });
        }
    }
}

/// Clock face with hands stopped at 4:25.
fn draw_clock_logo(frame: &mut Framebuffer, center: Point, radius: i32) {
    let stroke = PrimitiveStyle::with_stroke(BinaryColor::On, 2);
    let diameter = (radius * 2) as u32;
    paint(frame, &Circle::with_center(center, diameter).into_styled(stroke));
    paint(
        frame,
        &Circle::with_center(center, diameter.saturating_sub(4)).into_styled(stroke),
    );

    let at = |angle: f32, len: f32| {
        Point::new(
            center.x + (angle.cos() * len) as i32,
            center.y + (angle.sin() * len) as i32,
        )
    };

    for hour in 0..12 {
        let angle = (hour as f32 * 30.0).to_radians() - PI / 2.0;
        let inner = at(angle, (radius - 15) as f32);
        let outer = at(angle, (radius - 5) as f32);
        paint(frame, &Line::new(inner, outer).into_styled(stroke));
    }

    let hour_angle = ((4.0 + 25.0 / 60.0) * 30.0f32).to_radians() - PI / 2.0;
    let minute_angle = (25.0 * 6.0f32).to_radians() - PI / 2.0;
    paint(
        frame,
        &Line::new(center, at(hour_angle, radius as f32 * 0.5)).into_styled(stroke),
    );
    paint(
        frame,
        &Line::new(center, at(minute_angle, radius as f32 * 0.7)).into_styled(stroke),
    );
    paint(
        frame,
        &Circle::with_center(center, 8).into_styled(PrimitiveStyle::with_fill(BinaryColor::On)),
    );
}

/// [`DisplaySink`] over a 1-bit panel.
pub struct EpaperSink<P> {
    panel: P,
    fonts: FontBook,
    geometry: DisplayGeometry,
    frame: Framebuffer,
}

impl<P: Panel> EpaperSink<P> {
    pub fn new(panel: P, fonts: FontBook, geometry: DisplayGeometry) -> Self {
        Self {
            panel,
            fonts,
            frame: Framebuffer::new(geometry.width, geometry.height),
            geometry,
        }
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn frame(&self) -> &Framebuffer {
        &self.frame
    }

    /// Swap in fonts once they have been fetched.
    pub fn set_fonts(&mut self, fonts: FontBook) {
        self.fonts = fonts;
    }

    /// Scale `png` onto the panel through the catalog transform, thresholding luma.
    fn draw_image(&mut self, png: &[u8]) -> Result<()> {
        let image = image::load_from_memory_with_format(png, ImageFormat::Png)
            .map_err(|e| Error::Decode(e.to_string()))?
            .to_luma8();
        let (src_w, src_h) = image.dimensions();
        if src_w == 0 || src_h == 0 {
            return Err(Error::Decode("image has no pixels".into()));
        }

        let (scale, ox, oy) = self.geometry.image_transform();
        let drawn_w = (self.geometry.image_width as f32 * scale) as u32;
        let drawn_h = (self.geometry.image_height as f32 * scale) as u32;

        for py in 0..drawn_h {
            let sy = (py as u64 * src_h as u64 / drawn_h as u64) as u32;
            for px in 0..drawn_w {
                let sx = (px as u64 * src_w as u64 / drawn_w as u64) as u32;
                let luma = image.get_pixel(sx.min(src_w - 1), sy.min(src_h - 1)).0[0];
                if luma < INK_THRESHOLD {
                    self.frame.set(ox + px as i32, oy + py as i32, true);
                }
            }
        }
        Ok(())
    }

    fn draw_lines(&mut self, font: FontFamily, layout: &TextLayout) {
        for line in &layout.lines {
            self.fonts
                .draw(&mut self.frame, font, &line.text, line.x, line.y, layout.font_size);
        }
    }

    fn draw_branding(&mut self) {
        let w = self.geometry.width as i32;
        let h = self.geometry.height as i32;
        let center = Point::new(w / 2, h / 2);
        draw_clock_logo(&mut self.frame, center, h / 3);
        self.fonts
            .draw_centered(&mut self.frame, STATUS_TITLE, Point::new(w / 2, h / 3), 48);
        self.fonts
            .draw_centered(&mut self.frame, STATUS_SUBTITLE, Point::new(w / 2, h * 4 / 9), 24);
    }

    fn refresh(&mut self) -> Result<()> {
        self.panel.refresh(&self.frame)
    }
}

impl<P: Panel> DisplaySink for EpaperSink<P> {
    fn text_width(&self, font: FontFamily, text: &str, size: u32) -> u32 {
        self.fonts.text_width(font, text, size)
    }

    fn show_clock(&mut self, frame: &ClockFrame<'_>) -> Result<()> {
        self.frame.fill_white();
        if let Err(e) = self.draw_image(frame.image) {
            // keep whatever the panel showed before
            self.frame.fill_white();
            return Err(e);
        }
        self.draw_lines(frame.font, frame.layout);
        info!("Showing {}", frame.code);
        self.refresh()
    }

    fn show_note(&mut self, frame: &NoteFrame<'_>) -> Result<()> {
        self.frame.fill_white();
        self.draw_lines(frame.font, frame.layout);
        self.refresh()
    }

    fn show_acknowledgment(&mut self) -> Result<()> {
        self.frame.fill_white();
        let w = self.geometry.width as i32;
        let h = self.geometry.height as i32;
        let stride = ACK_ICON_SIZE.div_ceil(8) as usize;

        if ACK_ICON.len() == stride * ACK_ICON_SIZE as usize {
            let left = (w - ACK_ICON_SIZE as i32) / 2;
            let top = (h - ACK_ICON_SIZE as i32) / 2;
            for y in 0..ACK_ICON_SIZE {
                for x in 0..ACK_ICON_SIZE {
                    let byte = ACK_ICON[y as usize * stride + x as usize / 8];
                    if byte & (0x80 >> (x % 8)) != 0 {
                        self.frame.set(left + x as i32, top + y as i32, true);
                    }
                }
            }
        } else {
            self.fonts
                .draw_centered(&mut self.frame, "Liked", Point::new(w / 2, h / 2), 64);
        }
        self.refresh()
    }

    fn show_status(&mut self, message: &str) -> Result<()> {
        self.frame.fill_white();
        self.draw_branding();
        let w = self.geometry.width as i32;
        let h = self.geometry.height as i32;
        self.fonts
            .draw_centered(&mut self.frame, message, Point::new(w / 2, h * 19 / 27), 24);
        self.refresh()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{GrayImage, Luma};

    use super::*;
    use crate::layout::PlacedLine;
    use crate::time_index::TimeCode;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Framebuffer>,
    }

    impl Panel for Recorder {
        fn refresh(&mut self, frame: &Framebuffer) -> Result<()> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    fn tiny_geometry() -> DisplayGeometry {
        DisplayGeometry {
            width: 8,
            height: 4,
            image_width: 4,
            image_height: 2,
        }
    }

    fn png(pixels: &[u8], width: u32, height: u32) -> Vec<u8> {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([pixels[(y * width + x) as usize]])
        });
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn empty_layout() -> TextLayout {
        TextLayout {
            font_size: 20,
            lines: Vec::new(),
            usable_width: 0,
            usable_height: 0,
            fits: true,
        }
    }

    #[test]
    fn framebuffer_packs_msb_first() {
        let mut fb = Framebuffer::new(10, 2);
        assert_eq!(fb.stride(), 2);
        fb.set(0, 0, true);
        fb.set(9, 1, true);
        fb.set(-1, 0, true);
        fb.set(10, 0, true);
        assert_eq!(fb.as_bytes(), &[0x80, 0x00, 0x00, 0x40]);
        assert!(fb.is_ink(9, 1));
        fb.set(9, 1, false);
        assert_eq!(fb.ink_count(), 1);
    }

    #[test]
    fn image_is_thresholded_and_doubled() {
        let mut sink = EpaperSink::new(Recorder::default(), FontBook::default(), tiny_geometry());
        let image = png(&[0, 255, 127, 128, 255, 255, 255, 10], 4, 2);
        let layout = empty_layout();
        let frame = ClockFrame {
            code: TimeCode::from_24h(9, 30),
            image: &image,
            font: FontFamily::Sans,
            layout: &layout,
        };
        sink.show_clock(&frame).unwrap();

        let shown = &sink.panel().frames[0];
        assert!(shown.is_ink(0, 0) && shown.is_ink(1, 1));
        assert!(!shown.is_ink(2, 0));
        assert!(shown.is_ink(4, 0) && shown.is_ink(5, 1));
        assert!(!shown.is_ink(6, 0));
        assert!(shown.is_ink(7, 3));
        assert_eq!(shown.ink_count(), 12);
    }

    #[test]
    fn undecodable_image_leaves_panel_alone() {
        let mut sink = EpaperSink::new(Recorder::default(), FontBook::default(), tiny_geometry());
        let layout = empty_layout();
        let frame = ClockFrame {
            code: TimeCode::from_24h(9, 30),
            image: b"not a png",
            font: FontFamily::Sans,
            layout: &layout,
        };
        assert!(matches!(sink.show_clock(&frame), Err(Error::Decode(_))));
        assert!(sink.panel().frames.is_empty());
    }

    #[test]
    fn mono_fallback_measures_fixed_advance() {
        let fonts = FontBook::from_buffers(Some(b"garbage".to_vec()), None);
        assert!(!fonts.has_ttf(FontFamily::Sans));
        assert!(!fonts.has_ttf(FontFamily::Serif));
        assert_eq!(fonts.text_width(FontFamily::Serif, "stopped", 48), 70);
    }

    #[test]
    fn note_text_is_drawn() {
        let geometry = DisplayGeometry {
            width: 200,
            height: 60,
            ..DisplayGeometry::default()
        };
        let mut sink = EpaperSink::new(Recorder::default(), FontBook::default(), geometry);
        let layout = TextLayout {
            font_size: 20,
            lines: vec![PlacedLine { text: "hello".into(), x: 10, y: 10, width: 50 }],
            usable_width: 150,
            usable_height: 45,
            fits: true,
        };
        sink.show_note(&NoteFrame { font: FontFamily::Sans, layout: &layout }).unwrap();

        let shown = &sink.panel().frames[0];
        assert!(shown.ink_count() > 0);
        // nothing outside the text cell
        assert!((0..200).all(|x| !shown.is_ink(x, 5)));
    }

    #[test]
    fn status_and_acknowledgment_refresh_the_panel() {
        let mut sink =
            EpaperSink::new(Recorder::default(), FontBook::default(), DisplayGeometry::default());
        sink.show_status("Connecting to WiFi").unwrap();
        sink.show_acknowledgment().unwrap();

        let frames = &sink.panel().frames;
        assert_eq!(frames.len(), 2);
        // clock logo center dot
        assert!(frames[0].is_ink(480, 270));
        assert!(frames[1].ink_count() > 0);
    }
}
