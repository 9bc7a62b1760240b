//! In-memory stand-ins for the network, poem service and display.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::NaiveTime;
use living_clock::config::DisplayGeometry;
use living_clock::http::{HttpConnection, Method, ResponseHead};
use living_clock::pipeline::{ClockFrame, DisplaySink, NoteFrame};
use living_clock::poem::{FontFamily, Note, PoemContent, PoemService};
use living_clock::time_index::{TimeCode, TimeIndex};
use living_clock::{Error, Result};

/// Canned response for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_length: Option<usize>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self {
            status: 200,
            content_length: Some(body.len()),
            body,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_length: Some(0),
            body: Vec::new(),
        }
    }

    pub fn declared(mut self, len: Option<usize>) -> Self {
        self.content_length = len;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(self.body.as_deref().unwrap_or_default()).unwrap()
    }
}

#[derive(Default)]
struct HttpLog {
    routes: HashMap<String, Vec<Reply>>,
    requests: Vec<Request>,
    pending: Vec<u8>,
}

/// Routes by exact URL. Each route plays its replies in order and repeats the
/// last one. Clones share state.
#[derive(Clone, Default)]
pub struct FakeHttp {
    inner: Rc<RefCell<HttpLog>>,
}

impl FakeHttp {
    pub fn route(&self, url: &str, replies: Vec<Reply>) -> &Self {
        self.inner.borrow_mut().routes.insert(url.to_string(), replies);
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.inner.borrow().requests.clone()
    }

    pub fn hits(&self, url: &str) -> usize {
        self.inner
            .borrow()
            .requests
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

impl HttpConnection for FakeHttp {
    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<ResponseHead> {
        let mut log = self.inner.borrow_mut();
        log.requests.push(Request {
            method,
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.map(<[u8]>::to_vec),
        });

        let replies = log
            .routes
            .get_mut(url)
            .ok_or_else(|| Error::Transport(format!("no route to {}", url)))?;
        let reply = if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies
                .first()
                .cloned()
                .ok_or_else(|| Error::Transport(format!("no reply for {}", url)))?
        };

        log.pending = reply.body;
        Ok(ResponseHead {
            status: reply.status,
            content_length: reply.content_length,
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut log = self.inner.borrow_mut();
        // small chunks so callers have to loop
        let n = buf.len().min(log.pending.len()).min(5);
        buf[..n].copy_from_slice(&log.pending[..n]);
        log.pending.drain(..n);
        Ok(n)
    }
}

#[derive(Default)]
struct PoemLog {
    poem: Option<PoemContent>,
    like_ok: bool,
    composed: Vec<String>,
    liked: Vec<String>,
    seen: Vec<String>,
}

/// Poem service returning one fixed poem, or failing when none is set.
#[derive(Clone, Default)]
pub struct FakePoems {
    inner: Rc<RefCell<PoemLog>>,
}

impl FakePoems {
    pub fn serving(poem: PoemContent) -> Self {
        let fake = Self::default();
        fake.inner.borrow_mut().poem = Some(poem);
        fake.inner.borrow_mut().like_ok = true;
        fake
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_like_ok(&self, ok: bool) {
        self.inner.borrow_mut().like_ok = ok;
    }

    pub fn composed(&self) -> Vec<String> {
        self.inner.borrow().composed.clone()
    }

    pub fn liked(&self) -> Vec<String> {
        self.inner.borrow().liked.clone()
    }

    pub fn seen(&self) -> Vec<String> {
        self.inner.borrow().seen.clone()
    }
}

impl PoemService for FakePoems {
    fn compose(&mut self, time24: &str) -> Result<PoemContent> {
        let mut log = self.inner.borrow_mut();
        log.composed.push(time24.to_string());
        log.poem
            .clone()
            .ok_or_else(|| Error::Transport("poem service down".into()))
    }

    fn like(&mut self, poem_id: &str) -> Result<()> {
        let mut log = self.inner.borrow_mut();
        if !log.like_ok {
            return Err(Error::Transport("like rejected".into()));
        }
        log.liked.push(poem_id.to_string());
        Ok(())
    }

    fn mark_note_seen(&mut self, note_id: &str) -> Result<()> {
        self.inner.borrow_mut().seen.push(note_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Clock {
        code: TimeCode,
        image: Vec<u8>,
        font: FontFamily,
        lines: Vec<String>,
    },
    Note(Vec<String>),
    Acknowledgment,
    Status(String),
}

/// Records every frame; text is half an em per character.
#[derive(Clone, Default)]
pub struct FakeDisplay {
    shown: Rc<RefCell<Vec<Shown>>>,
}

impl FakeDisplay {
    pub fn shown(&self) -> Vec<Shown> {
        self.shown.borrow().clone()
    }

    pub fn clocks(&self) -> usize {
        self.shown
            .borrow()
            .iter()
            .filter(|s| matches!(s, Shown::Clock { .. }))
            .count()
    }

    pub fn last(&self) -> Option<Shown> {
        self.shown.borrow().last().cloned()
    }
}

impl DisplaySink for FakeDisplay {
    fn text_width(&self, _font: FontFamily, text: &str, size: u32) -> u32 {
        text.chars().count() as u32 * size / 2
    }

    fn show_clock(&mut self, frame: &ClockFrame<'_>) -> Result<()> {
        self.shown.borrow_mut().push(Shown::Clock {
            code: frame.code,
            image: frame.image.to_vec(),
            font: frame.font,
            lines: frame.layout.lines.iter().map(|l| l.text.clone()).collect(),
        });
        Ok(())
    }

    fn show_note(&mut self, frame: &NoteFrame<'_>) -> Result<()> {
        let lines = frame.layout.lines.iter().map(|l| l.text.clone()).collect();
        self.shown.borrow_mut().push(Shown::Note(lines));
        Ok(())
    }

    fn show_acknowledgment(&mut self) -> Result<()> {
        self.shown.borrow_mut().push(Shown::Acknowledgment);
        Ok(())
    }

    fn show_status(&mut self, message: &str) -> Result<()> {
        self.shown.borrow_mut().push(Shown::Status(message.to_string()));
        Ok(())
    }
}

pub const IMAGE_930: &str = "https://img.test/0930.png";
pub const IMAGE_945: &str = "https://img.test/0945.png";

/// Index with entries at 9:30 and 9:45 only.
pub fn index_930_945() -> TimeIndex {
    let doc = format!(
        r#"{{"times": [
            {{"t": "930", "i": [{{"url": "{}", "tz": {{"x": 20, "y": 20, "w": 200, "h": 100}}}}]}},
            {{"t": "945", "i": [{{"url": "{}", "tz": null, "strip": "bottom"}}]}}
        ]}}"#,
        IMAGE_930, IMAGE_945
    );
    TimeIndex::from_json(doc.as_bytes(), &DisplayGeometry::default()).unwrap()
}

/// HTTP fake serving both catalog images.
pub fn image_server() -> FakeHttp {
    let http = FakeHttp::default();
    http.route(IMAGE_930, vec![Reply::ok(b"png-0930".to_vec())]);
    http.route(IMAGE_945, vec![Reply::ok(b"png-0945".to_vec())]);
    http
}

pub fn poem_with_note() -> PoemContent {
    PoemContent {
        body: "Nine thirty seven / and the kettle sings".into(),
        font: FontFamily::Serif,
        note: Some(Note {
            body: "Happy birthday from the kitchen".into(),
            id: Some("n-1".into()),
        }),
        poem_id: Some("p-9".into()),
    }
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}
