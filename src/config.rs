//! Named configuration values
//!
//! Layout margins, timing windows, panel geometry, size limits and endpoints.
//! Static device input (credentials, token, UTC offset) is taken from the build
//! environment with `option_env!` so nothing secret lives in the tree.

use crate::layout::Region;
use crate::time_index::{Strip, TextZone};

/// Knobs for the text layout search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Share of the region width text may occupy
    pub width_fraction: f32,
    /// Share of the region height text may occupy
    pub height_fraction: f32,
    /// Largest font size tried, in pixels
    pub max_font_size: u32,
    /// Smallest font size tried, also the fallback when nothing fits
    pub min_font_size: u32,
    /// Distance between tried sizes
    pub size_step: u32,
    /// Line pitch as a multiple of the font size
    pub line_height: f32,
    /// Blank space above the glyphs, as a fraction of the font size
    pub ascender: f32,
    /// Blank space below the glyphs, as a fraction of the font size
    pub descender: f32,
    /// Lines beyond this count are dropped
    pub max_lines: usize,
}

impl LayoutConfig {
    /// Poem overlay inside an image zone or strip.
    pub const fn poem() -> Self {
        Self {
            width_fraction: 0.60,
            height_fraction: 0.60,
            max_font_size: 56,
            min_font_size: 20,
            size_step: 4,
            line_height: 1.3,
            ascender: 0.25,
            descender: 0.20,
            max_lines: 6,
        }
    }

    /// Full-screen note view.
    pub const fn note() -> Self {
        Self {
            width_fraction: 0.75,
            height_fraction: 0.75,
            max_font_size: 64,
            min_font_size: 24,
            size_step: 4,
            line_height: 1.3,
            ascender: 0.25,
            descender: 0.20,
            max_lines: 10,
        }
    }

    /// Candidate sizes, largest first.
    pub fn sizes(&self) -> impl Iterator<Item = u32> {
        let min = self.min_font_size.min(self.max_font_size);
        let step = self.size_step.max(1);
        // the smallest size is the fallback, keep it even when the step skips it
        let tail = ((self.max_font_size - min) % step != 0).then_some(min);
        (min..=self.max_font_size)
            .rev()
            .step_by(step as usize)
            .chain(tail)
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::poem()
    }
}

/// Button and scheduling windows, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTiming {
    pub debounce_ms: u64,
    pub double_click_ms: u64,
    pub note_timeout_ms: u64,
    pub render_interval_ms: u64,
}

impl Default for InputTiming {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            double_click_ms: 400,
            note_timeout_ms: 10_000,
            render_interval_ms: 10_000,
        }
    }
}

/// Panel size and the size of catalog images drawn onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    pub image_width: u32,
    pub image_height: u32,
}

// Strip bands as laid out on the 960x540 reference panel
const REF_WIDTH: u32 = 960;
const REF_HEIGHT: u32 = 540;
const STRIP_X: u32 = 40;
const STRIP_WIDTH: u32 = 880;
const STRIP_HEIGHT: u32 = 160;
const STRIP_TOP_Y: u32 = 20;
const STRIP_MIDDLE_Y: u32 = 190;
const STRIP_BOTTOM_Y: u32 = 360;

impl DisplayGeometry {
    /// Scale factor and top-left offset placing the catalog image centered on the panel.
    pub fn image_transform(&self) -> (f32, i32, i32) {
        let sx = self.width as f32 / self.image_width.max(1) as f32;
        let sy = self.height as f32 / self.image_height.max(1) as f32;
        let scale = sx.min(sy);
        let drawn_w = (self.image_width as f32 * scale) as i32;
        let drawn_h = (self.image_height as f32 * scale) as i32;
        let ox = (self.width as i32 - drawn_w) / 2;
        let oy = (self.height as i32 - drawn_h) / 2;
        (scale, ox, oy)
    }

    /// Map an image-space zone to panel coordinates.
    pub fn zone_region(&self, zone: &TextZone) -> Region {
        let (scale, ox, oy) = self.image_transform();
        Region {
            x: ox + (zone.x as f32 * scale) as i32,
            y: oy + (zone.y as f32 * scale) as i32,
            width: (zone.width as f32 * scale) as u32,
            height: (zone.height as f32 * scale) as u32,
        }
    }

    /// Fixed horizontal band used when an image has no zone.
    pub fn strip_region(&self, strip: Strip) -> Region {
        let sx = |v: u32| (v as u64 * self.width as u64 / REF_WIDTH as u64) as u32;
        let sy = |v: u32| (v as u64 * self.height as u64 / REF_HEIGHT as u64) as u32;
        let y = match strip {
            Strip::Top => STRIP_TOP_Y,
            Strip::Middle => STRIP_MIDDLE_Y,
            Strip::Bottom => STRIP_BOTTOM_Y,
        };
        Region {
            x: sx(STRIP_X) as i32,
            y: sy(y) as i32,
            width: sx(STRIP_WIDTH),
            height: sy(STRIP_HEIGHT),
        }
    }

    /// The whole panel.
    pub fn full_screen(&self) -> Region {
        Region {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for DisplayGeometry {
    fn default() -> Self {
        Self {
            width: REF_WIDTH,
            height: REF_HEIGHT,
            image_width: 480,
            image_height: 270,
        }
    }
}

/// Upper bounds for fetched bodies, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub image: usize,
    pub sans_font: usize,
    pub serif_font: usize,
    pub index: usize,
    pub json: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            image: 500_000,
            sans_font: 600_000,
            serif_font: 200_000,
            index: 1_000_000,
            json: 64 * 1024,
        }
    }
}

/// Remote services the appliance talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub compose_url: String,
    pub status_url: String,
    pub like_url: String,
    pub note_seen_url: String,
    pub index_url: String,
    pub sans_font_url: String,
    pub serif_font_url: String,
    pub build_id: String,
    /// Bearer token for the compose endpoint, empty when unset
    pub token: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            compose_url: "https://poem.town/api/v1/clock/compose".into(),
            status_url: "https://poem.town/api/v1/clock/status".into(),
            like_url: "https://poem.town/api/v1/clock/like".into(),
            note_seen_url: "https://poem.town/api/v1/clock/note/seen".into(),
            index_url: "https://stoppedclocks.org/living-clock/living-clock-index.json".into(),
            sans_font_url: "https://stoppedclocks.org/living-clock/fonts/Inter-Regular.ttf".into(),
            serif_font_url:
                "https://stoppedclocks.org/living-clock/fonts/PlayfairDisplay-Regular.ttf".into(),
            build_id: "living-clock-v1".into(),
            token: option_env!("POEM_TOWN_TOKEN").unwrap_or_default().into(),
        }
    }
}

/// Credentials and locale supplied at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Seconds east of UTC for the wall clock
    pub utc_offset_secs: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or_default().into(),
            wifi_password: option_env!("WIFI_PASS").unwrap_or_default().into(),
            utc_offset_secs: option_env!("UTC_OFFSET_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }
}

/// Everything the appliance needs to run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub poem_layout: LayoutConfig,
    pub note_layout: LayoutConfig,
    pub timing: InputTiming,
    pub geometry: DisplayGeometry,
    pub limits: FetchLimits,
    pub endpoints: Endpoints,
    pub device: DeviceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poem_layout: LayoutConfig::poem(),
            note_layout: LayoutConfig::note(),
            timing: InputTiming::default(),
            geometry: DisplayGeometry::default(),
            limits: FetchLimits::default(),
            endpoints: Endpoints::default(),
            device: DeviceConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poem_sizes_step_down_from_max_to_min() {
        let sizes: Vec<u32> = LayoutConfig::poem().sizes().collect();
        assert_eq!(sizes.first(), Some(&56));
        assert_eq!(sizes.last(), Some(&20));
        assert_eq!(sizes.len(), 10);
    }

    #[test]
    fn uneven_range_still_ends_at_min() {
        let config = LayoutConfig {
            min_font_size: 22,
            ..LayoutConfig::poem()
        };
        let sizes: Vec<u32> = config.sizes().collect();
        assert_eq!(sizes.first(), Some(&56));
        assert_eq!(sizes.last(), Some(&22));
        assert_eq!(&sizes[sizes.len() - 2..], &[24, 22]);
    }

    #[test]
    fn reference_panel_doubles_catalog_images() {
        let geometry = DisplayGeometry::default();
        assert_eq!(geometry.image_transform(), (2.0, 0, 0));

        let zone = TextZone { x: 10, y: 20, width: 100, height: 50 };
        assert_eq!(
            geometry.zone_region(&zone),
            Region { x: 20, y: 40, width: 200, height: 100 }
        );
    }

    #[test]
    fn strips_match_reference_bands() {
        let geometry = DisplayGeometry::default();
        assert_eq!(
            geometry.strip_region(Strip::Bottom),
            Region { x: 40, y: 360, width: 880, height: 160 }
        );
        assert_eq!(geometry.strip_region(Strip::Middle).y, 190);
    }

    #[test]
    fn smaller_panel_letterboxes_and_scales_strips() {
        let geometry = DisplayGeometry { width: 800, height: 480, ..DisplayGeometry::default() };
        let (scale, ox, oy) = geometry.image_transform();
        assert!((scale - 800.0 / 480.0).abs() < 1e-6);
        assert_eq!(ox, 0);
        assert_eq!(oy, 15);
        assert_eq!(geometry.strip_region(Strip::Top).width, 733);
    }
}
