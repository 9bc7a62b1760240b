//! `HttpConnection` over the ESP-IDF HTTP client

use core::time::Duration;

use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::http::Method as EspMethod;
use living_clock::http::{HttpConnection, Method, ResponseHead};
use living_clock::{Error, Result};
use log::debug;

/// Opens a fresh TLS connection per request, so an abandoned body never leaks
/// into the next response.
pub struct EspHttp {
    config: Configuration,
    conn: Option<EspHttpConnection>,
}

impl EspHttp {
    pub fn new(timeout: Duration) -> Self {
        Self {
            config: Configuration {
                timeout: Some(timeout),
                use_global_ca_store: true,
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            },
            conn: None,
        }
    }
}

fn transport(e: impl core::fmt::Debug) -> Error {
    Error::Transport(format!("{:?}", e))
}

impl HttpConnection for EspHttp {
    fn request(
        &mut self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<ResponseHead> {
        self.conn = None;
        let mut conn = EspHttpConnection::new(&self.config).map_err(transport)?;

        let method = match method {
            Method::Get => EspMethod::Get,
            Method::Post => EspMethod::Post,
        };
        let length = body.map(|b| b.len().to_string());
        let mut all_headers = headers.to_vec();
        if let Some(length) = length.as_deref() {
            all_headers.push(("Content-Length", length));
        }

        conn.initiate_request(method, url, &all_headers)
            .map_err(transport)?;
        if let Some(mut rest) = body {
            while !rest.is_empty() {
                let n = conn.write(rest).map_err(transport)?;
                if n == 0 {
                    return Err(Error::Transport("request body not accepted".into()));
                }
                rest = &rest[n..];
            }
        }
        conn.initiate_response().map_err(transport)?;

        let head = ResponseHead {
            status: conn.status(),
            content_length: conn
                .header("Content-Length")
                .and_then(|v| v.trim().parse().ok()),
        };
        debug!("{} -> {} ({:?} bytes)", url, head.status, head.content_length);

        self.conn = Some(conn);
        Ok(head)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::Transport("read without a request".into()))?;
        conn.read(buf).map_err(transport)
    }
}
