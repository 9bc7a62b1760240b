//! Poem content and the poem.town client
//!
//! A fresh [`PoemContent`] is requested for every render cycle. The response is
//! loosely typed: the font preference and ids appear under several key names,
//! resolved here through fixed priority lists.

use log::{info, warn};
use serde_json::{json, Value};

use crate::config::Endpoints;
use crate::error::{Error, Result};
use crate::http::{post_json, HttpConnection};

/// Shown when the poem service cannot be reached.
pub const DEFAULT_POEM: &str = "Time moves on / But clocks stand still";

const FONT_KEYS: [&str; 3] = ["preferredFont", "font", "fontFamily"];
const POEM_ID_KEYS: [&str; 2] = ["poemId", "id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontFamily {
    /// Inter
    #[default]
    Sans,
    /// Playfair Display
    Serif,
}

impl FontFamily {
    /// `PLAYFAIR` selects the serif face; anything else is sans.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("PLAYFAIR") {
            FontFamily::Serif
        } else {
            FontFamily::Sans
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub body: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoemContent {
    pub body: String,
    pub font: FontFamily,
    pub note: Option<Note>,
    pub poem_id: Option<String>,
}

impl PoemContent {
    pub fn fallback() -> Self {
        Self {
            body: DEFAULT_POEM.to_string(),
            font: FontFamily::Sans,
            note: None,
            poem_id: None,
        }
    }

    /// Parse a compose response. Only `poem` is required.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: Value = serde_json::from_slice(bytes)?;

        let body = match doc.get("poem") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => return Err(Error::Parse("no poem in response".into())),
        };

        let font = first_present(&doc, &FONT_KEYS)
            .and_then(Value::as_str)
            .map(FontFamily::from_name)
            .unwrap_or_default();

        let poem_id = first_present(&doc, &POEM_ID_KEYS).and_then(id_string);

        let note = doc.get("note").and_then(|note| {
            let body = note.get("body")?.as_str()?.trim();
            (!body.is_empty()).then(|| Note {
                body: body.to_string(),
                id: note.get("noteId").and_then(id_string),
            })
        });

        Ok(Self {
            body,
            font,
            note,
            poem_id,
        })
    }

    /// Poem body ready for wrapping: the `" / "` line separator becomes a space
    /// and whitespace runs collapse.
    pub fn display_text(&self) -> String {
        normalize(&self.body)
    }
}

pub fn normalize(text: &str) -> String {
    text.replace(" / ", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_present<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| doc.get(*key))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Remote poem service. Side-effect calls report success or failure only.
pub trait PoemService {
    /// Poem for a 24-hour `HH:MM` time.
    fn compose(&mut self, time24: &str) -> Result<PoemContent>;
    fn like(&mut self, poem_id: &str) -> Result<()>;
    fn mark_note_seen(&mut self, note_id: &str) -> Result<()>;
}

/// poem.town clock API over any [`HttpConnection`].
pub struct PoemTown<C> {
    conn: C,
    endpoints: Endpoints,
    screen_id: String,
    body_limit: usize,
}

impl<C: HttpConnection> PoemTown<C> {
    pub fn new(conn: C, endpoints: Endpoints, screen_id: impl Into<String>, body_limit: usize) -> Self {
        Self {
            conn,
            endpoints,
            screen_id: screen_id.into(),
            body_limit,
        }
    }

    pub fn screen_id(&self) -> &str {
        &self.screen_id
    }

    /// Announce the device so its screen id is recognized by compose.
    pub fn register(&mut self) -> Result<()> {
        info!("Registering with poem.town as {}", self.screen_id);
        let payload = json!({
            "screenId": self.screen_id,
            "buildId": self.endpoints.build_id,
        });
        let body = post_json(&mut self.conn, &self.endpoints.status_url, None, &payload, self.body_limit)?;

        let success = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| v.get("success").and_then(Value::as_bool))
            .unwrap_or(false);
        info!("Registration success: {}", if success { "yes" } else { "no" });
        Ok(())
    }

    fn bearer(&self) -> Option<&str> {
        Some(self.endpoints.token.as_str()).filter(|t| !t.is_empty())
    }

    fn post(&mut self, url: &str, payload: &Value) -> Result<Vec<u8>> {
        let bearer = self.bearer().map(str::to_owned);
        post_json(&mut self.conn, url, bearer.as_deref(), payload, self.body_limit)
    }
}

impl<C: HttpConnection> PoemService for PoemTown<C> {
    fn compose(&mut self, time24: &str) -> Result<PoemContent> {
        info!("Fetching poem for {} from poem.town", time24);
        let payload = json!({ "screenId": self.screen_id, "time24": time24 });
        let url = self.endpoints.compose_url.clone();
        let body = self.post(&url, &payload)?;

        let poem = PoemContent::from_json(&body)?;
        info!("Poem received: {:?} ({:?})", poem.body, poem.font);
        Ok(poem)
    }

    fn like(&mut self, poem_id: &str) -> Result<()> {
        let payload = json!({ "screenId": self.screen_id, "poemId": poem_id });
        let url = self.endpoints.like_url.clone();
        self.post(&url, &payload).map(|_| ()).inspect_err(|e| {
            warn!("Like for {} failed: {}", poem_id, e);
        })
    }

    fn mark_note_seen(&mut self, note_id: &str) -> Result<()> {
        let payload = json!({ "screenId": self.screen_id, "noteId": note_id });
        let url = self.endpoints.note_seen_url.clone();
        self.post(&url, &payload).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_response_uses_defaults() {
        let poem = PoemContent::from_json(br#"{"poem": "hands at rest"}"#).unwrap();
        assert_eq!(poem.body, "hands at rest");
        assert_eq!(poem.font, FontFamily::Sans);
        assert_eq!(poem.poem_id, None);
        assert_eq!(poem.note, None);
    }

    #[test]
    fn first_present_font_key_wins() {
        let poem = PoemContent::from_json(
            br#"{"poem": "x", "font": "PLAYFAIR", "fontFamily": "INTER"}"#,
        )
        .unwrap();
        assert_eq!(poem.font, FontFamily::Serif);

        let poem = PoemContent::from_json(
            br#"{"poem": "x", "preferredFont": "INTER", "font": "PLAYFAIR"}"#,
        )
        .unwrap();
        assert_eq!(poem.font, FontFamily::Sans);

        let poem = PoemContent::from_json(br#"{"poem": "x", "fontFamily": "playfair"}"#).unwrap();
        assert_eq!(poem.font, FontFamily::Serif);
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        let poem = PoemContent::from_json(
            br#"{"poem": "x", "id": 17, "note": {"body": "hello", "noteId": 99}}"#,
        )
        .unwrap();
        assert_eq!(poem.poem_id.as_deref(), Some("17"));
        assert_eq!(
            poem.note,
            Some(Note { body: "hello".into(), id: Some("99".into()) })
        );

        let poem = PoemContent::from_json(br#"{"poem": "x", "poemId": "p-1", "id": "ignored"}"#)
            .unwrap();
        assert_eq!(poem.poem_id.as_deref(), Some("p-1"));
    }

    #[test]
    fn empty_note_is_dropped() {
        let poem = PoemContent::from_json(br#"{"poem": "x", "note": {"body": "  "}}"#).unwrap();
        assert_eq!(poem.note, None);
    }

    #[test]
    fn missing_poem_is_a_parse_error() {
        assert!(matches!(PoemContent::from_json(br#"{"font": "INTER"}"#), Err(Error::Parse(_))));
        assert!(matches!(PoemContent::from_json(br#"{"poem": null}"#), Err(Error::Parse(_))));
        assert!(matches!(PoemContent::from_json(b"<html>"), Err(Error::Parse(_))));
    }

    #[test]
    fn separators_become_spaces() {
        assert_eq!(
            normalize("Time moves on / But clocks  stand\nstill"),
            "Time moves on But clocks stand still"
        );
        assert_eq!(PoemContent::fallback().display_text(), "Time moves on But clocks stand still");
    }
}
