//! Catalog of stopped-clock photographs keyed by 12-hour time code
//!
//! The index document is fetched once at boot and never changes afterwards.
//! Lookups pick the entry with the smallest circular distance to the target
//! code and then one of its candidates at random.

use core::fmt;
use core::str::FromStr;

use chrono::Timelike;
use log::{debug, info, warn};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use crate::config::DisplayGeometry;
use crate::error::{Error, Result};
use crate::layout::Region;

/// 12-hour clock time encoded as `hour * 100 + minute`, 100..=1259.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeCode(u16);

impl TimeCode {
    /// Span of the HHMM-as-integer encoding used for wraparound.
    pub const MODULUS: u16 = 1200;

    /// Validate a raw code.
    pub fn new(code: u16) -> Option<Self> {
        let hour = code / 100;
        let minute = code % 100;
        ((1..=12).contains(&hour) && minute < 60).then_some(Self(code))
    }

    /// Fold a 24-hour clock reading onto the 12-hour dial.
    pub fn from_24h(hour: u32, minute: u32) -> Self {
        let hour12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        Self((hour12 * 100 + minute % 60) as u16)
    }

    pub fn from_time<T: Timelike>(time: &T) -> Self {
        Self::from_24h(time.hour(), time.minute())
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Circular distance over the HHMM encoding. Not elapsed minutes: 1259 and 100
    /// score 41 apart.
    pub fn distance(self, other: TimeCode) -> u16 {
        let direct = self.0.abs_diff(other.0);
        direct.min(Self::MODULUS.saturating_sub(direct))
    }
}

impl FromStr for TimeCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code: u16 = s
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("time code {:?} is not a number", s)))?;
        TimeCode::new(code).ok_or_else(|| Error::Parse(format!("time code {} out of range", code)))
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

/// Coarse placement band for images without a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strip {
    Top,
    #[default]
    Middle,
    Bottom,
}

impl Strip {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Strip::Top),
            "middle" => Some(Strip::Middle),
            "bottom" => Some(Strip::Bottom),
            _ => None,
        }
    }
}

/// Blank rectangle in image space suitable for text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextZone {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextZone {
    /// True when the zone has area and lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

/// One photograph usable for a time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub url: String,
    pub zone: Option<TextZone>,
    /// Used only when `zone` is absent
    pub strip: Strip,
}

impl ImageCandidate {
    /// Panel region the overlay text goes into.
    pub fn text_region(&self, geometry: &DisplayGeometry) -> Region {
        match &self.zone {
            Some(zone) => geometry.zone_region(zone),
            None => geometry.strip_region(self.strip),
        }
    }
}

/// All candidates for one time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    pub code: TimeCode,
    /// Never empty
    pub candidates: Vec<ImageCandidate>,
}

/// Entry as read from the index document, before validation.
#[derive(Debug, Clone, Default)]
pub struct IndexRecord {
    pub time: Option<String>,
    pub candidates: Vec<ImageCandidate>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    times: Vec<Value>,
}

#[derive(Deserialize)]
struct RawEntry {
    t: Option<Value>,
    i: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawCandidate {
    url: Option<String>,
    tz: Option<Value>,
    strip: Option<String>,
}

/// Read-only catalog, sorted by time code.
#[derive(Debug, Clone)]
pub struct TimeIndex {
    entries: Vec<TimeEntry>,
}

impl TimeIndex {
    /// Validate and store entries. Malformed records are skipped; an index left
    /// with no entries is an error.
    pub fn load(records: impl IntoIterator<Item = IndexRecord>) -> Result<Self> {
        let mut entries: Vec<TimeEntry> = Vec::new();

        for (position, record) in records.into_iter().enumerate() {
            let Some(time) = record.time.as_deref() else {
                warn!("Index entry {} has no time field, skipping", position);
                continue;
            };
            let code = match time.parse::<TimeCode>() {
                Ok(code) => code,
                Err(e) => {
                    warn!("Index entry {} skipped: {}", position, e);
                    continue;
                }
            };
            if record.candidates.is_empty() {
                warn!("Index entry {} has no images, skipping", code);
                continue;
            }
            if entries.iter().any(|e| e.code == code) {
                warn!("Duplicate index entry {}, keeping the first", code);
                continue;
            }
            entries.push(TimeEntry {
                code,
                candidates: record.candidates,
            });
        }

        if entries.is_empty() {
            return Err(Error::IndexEmpty);
        }

        entries.sort_by_key(|e| e.code);
        info!("Loaded {} time entries", entries.len());
        Ok(Self { entries })
    }

    /// Parse the `{"times": [{"t", "i": [...]}]}` document and load it.
    pub fn from_json(bytes: &[u8], geometry: &DisplayGeometry) -> Result<Self> {
        let document: RawDocument = serde_json::from_slice(bytes)?;
        let records = document
            .times
            .into_iter()
            .map(|value| parse_record(value, geometry));
        Self::load(records)
    }

    pub fn entries(&self) -> &[TimeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry with the smallest circular distance to `target`, with that distance.
    /// Ties go to the entry met first.
    pub fn nearest(&self, target: TimeCode) -> Option<(&TimeEntry, u16)> {
        let mut best: Option<(&TimeEntry, u16)> = None;

        for entry in &self.entries {
            let distance = entry.code.distance(target);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((entry, distance));
            }
            if distance == 0 {
                break;
            }
        }

        best
    }

    /// Nearest entry's candidate, chosen uniformly when there are several.
    pub fn find_nearest<R: Rng + ?Sized>(
        &self,
        target: TimeCode,
        rng: &mut R,
    ) -> Option<&ImageCandidate> {
        let (entry, distance) = self.nearest(target)?;
        info!("Target: {}, Found: {} (diff: {})", target, entry.code, distance);

        let pick = match entry.candidates.len() {
            1 => 0,
            n => rng.gen_range(0..n),
        };
        entry.candidates.get(pick)
    }
}

fn parse_record(value: Value, geometry: &DisplayGeometry) -> IndexRecord {
    let raw: RawEntry = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("Unreadable index entry: {}", e);
            return IndexRecord::default();
        }
    };

    let time = match raw.t {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let candidates = raw
        .i
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| parse_candidate(v, geometry))
        .collect();

    IndexRecord { time, candidates }
}

fn parse_candidate(value: Value, geometry: &DisplayGeometry) -> Option<ImageCandidate> {
    let raw: RawCandidate = serde_json::from_value(value).ok()?;
    let url = raw.url.filter(|u| !u.is_empty())?;

    let zone = raw.tz.as_ref().and_then(parse_zone).filter(|zone| {
        let fits = zone.fits_within(geometry.image_width, geometry.image_height);
        if !fits {
            debug!("Zone {:?} of {} lies outside the image, using strip", zone, url);
        }
        fits
    });

    let strip = raw.strip.as_deref().and_then(Strip::parse).unwrap_or_default();

    Some(ImageCandidate { url, zone, strip })
}

fn parse_zone(value: &Value) -> Option<TextZone> {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    };
    Some(TextZone {
        x: field("x")?,
        y: field("y")?,
        width: field("w")?,
        height: field("h")?,
    })
}
