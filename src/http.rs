//! HTTP seam
//!
//! The core never talks to a network stack directly. The device wraps
//! `esp-idf-svc`'s client behind [`HttpConnection`]; tests use in-memory fakes.

use log::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Status line and the headers the core cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    /// Declared `Content-Length`, when the server sent one
    pub content_length: Option<usize>,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request at a time: `request` sends and waits for the response head,
/// `read` then drains the body. A new `request` abandons any unread body.
pub trait HttpConnection {
    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<ResponseHead>;

    /// Read body bytes into `buf`; `Ok(0)` marks the end of the body.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

impl<C: HttpConnection + ?Sized> HttpConnection for &mut C {
    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<ResponseHead> {
        (**self).request(method, url, headers, body)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }
}

/// Read the rest of the body, failing once it grows past `limit` bytes.
pub fn read_body<C: HttpConnection + ?Sized>(conn: &mut C, limit: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut chunk = [0u8; 512];

    loop {
        let n = conn.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        if body.len() + n > limit {
            return Err(Error::TooLarge {
                len: body.len() + n,
                max: limit,
            });
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(body)
}

/// POST a JSON document and return the response body of a 2xx reply.
pub fn post_json<C: HttpConnection + ?Sized>(
    conn: &mut C,
    url: &str,
    bearer: Option<&str>,
    payload: &serde_json::Value,
    limit: usize,
) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(payload)?;
    let auth = bearer.map(|token| format!("Bearer {}", token));

    let mut headers = vec![("Content-Type", "application/json")];
    if let Some(auth) = auth.as_deref() {
        headers.push(("Authorization", auth));
    }

    debug!("POST {} {}", url, payload);
    let head = conn.request(Method::Post, url, &headers, Some(&body))?;
    if !head.is_success() {
        return Err(Error::Transport(format!("{} answered HTTP {}", url, head.status)));
    }

    read_body(conn, limit)
}
