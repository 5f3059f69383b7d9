// src/ami/codec.rs
use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::ami::{AmiError, RawEvent};

/// Incremental decoder for the AMI wire format.
///
/// Blocks are `Key: Value` lines terminated by an empty line. The transport
/// may deliver partial lines; anything incomplete stays buffered until the
/// next read. Lines without a colon (the `Asterisk Call Manager/x.y` banner,
/// stray noise) are skipped, and a blank line with no pending fields emits
/// nothing, so a malformed block never crashes decoding - it simply resumes
/// at the next blank-line boundary.
#[derive(Debug, Default)]
pub struct AmiCodec {
    pending: Vec<(String, String)>,
}

impl AmiCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for AmiCodec {
    type Item = RawEvent;
    type Error = AmiError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<RawEvent>, AmiError> {
        loop {
            let Some(pos) = buf.iter().position(|&b| b == b'\n') else {
                // No complete line buffered yet.
                return Ok(None);
            };

            let raw = buf.split_to(pos + 1);
            let line = String::from_utf8_lossy(&raw[..pos]);
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if !self.pending.is_empty() {
                    return Ok(Some(RawEvent::from_fields(std::mem::take(
                        &mut self.pending,
                    ))));
                }
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                self.pending
                    .push((key.trim().to_string(), value.trim().to_string()));
            }
            // Non key/value line: protocol noise, ignored.
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<RawEvent>, AmiError> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }
        // A truncated block at EOF is never emitted.
        buf.clear();
        self.pending.clear();
        Ok(None)
    }
}
