//! Size-bounded asset download
//!
//! Images on every render cycle and the two TTF fonts at boot are pulled into
//! a buffer of exactly the declared length. No retries happen here; the caller
//! tries again on its next tick.

use core::ops::Deref;

use log::{error, info};

use crate::error::{Error, Result};
use crate::http::{HttpConnection, Method};

/// Exact-length download, owned by the caller and released on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBuffer {
    bytes: Vec<u8>,
}

impl AssetBuffer {
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for AssetBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

pub struct AssetFetcher<C> {
    conn: C,
}

impl<C: HttpConnection> AssetFetcher<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// Download `url` if it declares a non-zero length of at most `max_size` bytes.
    pub fn fetch(&mut self, url: &str, max_size: usize) -> Result<AssetBuffer> {
        info!("Downloading: {}", url);

        let head = self.conn.request(Method::Get, url, &[], None)?;
        if !head.is_success() {
            error!("Download failed: {}", head.status);
            return Err(Error::Transport(format!("{} answered HTTP {}", url, head.status)));
        }

        let len = match head.content_length {
            Some(len) if len > 0 => len,
            _ => {
                error!("Download of {} has no usable length", url);
                return Err(Error::SizeUnknown);
            }
        };
        if len > max_size {
            error!("Invalid size: {} (max: {})", len, max_size);
            return Err(Error::TooLarge { len, max: max_size });
        }

        let mut bytes = Vec::new();
        if bytes.try_reserve_exact(len).is_err() {
            error!("Could not allocate {} bytes", len);
            return Err(Error::AllocationFailed(len));
        }
        bytes.resize(len, 0);

        let mut filled = 0;
        while filled < len {
            match self.conn.read(&mut bytes[filled..])? {
                0 => break,
                n => filled += n,
            }
        }

        if filled < len {
            error!("Read mismatch: {} vs {}", filled, len);
            return Err(Error::ShortRead {
                expected: len,
                received: filled,
            });
        }

        info!("Downloaded {} bytes", len);
        Ok(AssetBuffer { bytes })
    }

    pub fn connection(&mut self) -> &mut C {
        &mut self.conn
    }
}
