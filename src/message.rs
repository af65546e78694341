//! Wire codec: the `tag=value<SOH>` grammar, BodyLength/CheckSum arithmetic,
//! and the ordered [`FixMessage`] value object.

use std::collections::HashMap;
use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::constants::{tags, BEGIN_STRING, TRAILER_LEN};
use crate::error::{FixConnectorError, Result};

pub const SOH: u8 = 0x01;

/// An ordered sequence of `(tag, value)` pairs, preserving insertion order
/// and repeated tags. Lookups by tag are O(1) amortized via an auxiliary
/// index of tag -> positions, built incrementally as pairs are appended.
#[derive(Debug, Clone, Default)]
pub struct FixMessage {
    pairs: Vec<(u32, Bytes)>,
    index: HashMap<u32, Vec<usize>>,
}

impl FixMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a message with BeginString, a placeholder BodyLength, and
    /// MsgType (tag 35) populated, as required by [`FixConnectorError`]-free
    /// callers of `create_fix_message_with_basic_header`.
    pub fn with_basic_header(msg_type: &str) -> Self {
        let mut msg = Self::new();
        msg.append_pair(tags::BEGIN_STRING, BEGIN_STRING);
        msg.append_pair(tags::BODY_LENGTH, "0");
        msg.append_pair(tags::MSG_TYPE, msg_type);
        msg
    }

    /// Appends a tag/value pair unconditionally. Repeated tags retain
    /// insertion order; later `get(tag, n)` calls index into that order.
    pub fn append_pair(&mut self, tag: u32, value: impl Into<Bytes>) {
        let pos = self.pairs.len();
        self.pairs.push((tag, value.into()));
        self.index.entry(tag).or_default().push(pos);
    }

    /// Returns the value of the Nth (1-based) occurrence of `tag`, or `None`
    /// if it is absent.
    pub fn get(&self, tag: u32, occurrence: usize) -> Option<&Bytes> {
        let occurrence = occurrence.max(1);
        self.index
            .get(&tag)
            .and_then(|positions| positions.get(occurrence - 1))
            .map(|&pos| &self.pairs[pos].1)
    }

    /// Convenience for the common case of the first occurrence.
    pub fn get_first(&self, tag: u32) -> Option<&Bytes> {
        self.get(tag, 1)
    }

    pub fn get_str(&self, tag: u32, occurrence: usize) -> Option<&str> {
        self.get(tag, occurrence)
            .and_then(|v| std::str::from_utf8(v).ok())
    }

    /// The distinguished MsgType (tag 35) value, if present.
    pub fn msg_type(&self) -> Option<&str> {
        self.get_str(tags::MSG_TYPE, 1)
    }

    pub fn pairs(&self) -> impl Iterator<Item = (u32, &Bytes)> {
        self.pairs.iter().map(|(t, v)| (*t, v))
    }

    /// Encodes to wire bytes, finalizing BodyLength (tag 9) and appending
    /// CheckSum (tag 10). The first pair must be BeginString and the second
    /// must be the BodyLength placeholder written by `with_basic_header`.
    pub fn encode(&self) -> Result<Bytes> {
        if self.pairs.len() < 3
            || self.pairs[0].0 != tags::BEGIN_STRING
            || self.pairs[1].0 != tags::BODY_LENGTH
        {
            return Err(FixConnectorError::MalformedMessage(
                "message missing BeginString/BodyLength header".into(),
            ));
        }

        let mut body = BytesMut::new();
        for (tag, value) in self.pairs.iter().skip(2) {
            body.extend_from_slice(tag.to_string().as_bytes());
            body.extend_from_slice(b"=");
            body.extend_from_slice(value);
            body.extend_from_slice(&[SOH]);
        }

        let mut out = BytesMut::new();
        out.extend_from_slice(format!("8={}", BEGIN_STRING).as_bytes());
        out.extend_from_slice(&[SOH]);
        out.extend_from_slice(format!("9={}", body.len()).as_bytes());
        out.extend_from_slice(&[SOH]);
        out.extend_from_slice(&body);

        let checksum: u32 = out.iter().map(|b| *b as u32).sum::<u32>() % 256;
        out.extend_from_slice(format!("10={:03}", checksum).as_bytes());
        out.extend_from_slice(&[SOH]);

        Ok(out.freeze())
    }

    /// Decodes one complete message from the front of `buffer`, returning
    /// the parsed message and the number of bytes consumed. Returns
    /// `Ok(None)` when the buffer holds an incomplete frame (`NEED_MORE`).
    pub fn decode(buffer: &[u8]) -> Result<Option<(FixMessage, usize)>> {
        let prefix = b"8=FIX.4.4\x019=";
        if buffer.len() < prefix.len() {
            if buffer == &prefix[..buffer.len().min(prefix.len())] {
                return Ok(None);
            }
            return Ok(None);
        }
        if !buffer.starts_with(prefix) {
            return Err(FixConnectorError::MalformedMessage(
                "message does not start with 8=FIX.4.4\\x019=".into(),
            ));
        }

        let body_len_start = prefix.len();
        let body_len_end = match memchr::memchr(SOH, &buffer[body_len_start..]) {
            Some(i) => body_len_start + i,
            None => return Ok(None),
        };
        let body_len: usize = std::str::from_utf8(&buffer[body_len_start..body_len_end])
            .map_err(|_| FixConnectorError::MalformedMessage("non-utf8 BodyLength".into()))?
            .parse()
            .map_err(|_| FixConnectorError::MalformedMessage("non-numeric BodyLength".into()))?;

        let body_start = body_len_end + 1;
        let needed = body_start + body_len + TRAILER_LEN;
        if buffer.len() < needed {
            return Ok(None);
        }

        let trailer = &buffer[body_start + body_len..needed];
        if !trailer.starts_with(b"10=") || trailer[trailer.len() - 1] != SOH {
            return Err(FixConnectorError::MalformedMessage(
                "missing 10=NNN trailer".into(),
            ));
        }
        let expected_checksum: u32 = std::str::from_utf8(&trailer[3..trailer.len() - 1])
            .map_err(|_| FixConnectorError::MalformedMessage("non-utf8 checksum".into()))?
            .parse()
            .map_err(|_| FixConnectorError::MalformedMessage("non-numeric checksum".into()))?;

        let checksum_region = &buffer[..body_start + body_len];
        let actual_checksum: u32 = checksum_region.iter().map(|b| *b as u32).sum::<u32>() % 256;
        if actual_checksum != expected_checksum {
            return Err(FixConnectorError::ChecksumMismatch {
                expected: expected_checksum,
                actual: actual_checksum,
            });
        }

        let mut msg = FixMessage::new();
        for field in checksum_region.split(|b| *b == SOH) {
            if field.is_empty() {
                continue;
            }
            let eq = field
                .iter()
                .position(|b| *b == b'=')
                .ok_or_else(|| FixConnectorError::MalformedMessage("field missing '='".into()))?;
            let tag: u32 = std::str::from_utf8(&field[..eq])
                .map_err(|_| FixConnectorError::MalformedMessage("non-utf8 tag".into()))?
                .parse()
                .map_err(|_| FixConnectorError::MalformedMessage("non-numeric tag".into()))?;
            msg.append_pair(tag, Bytes::copy_from_slice(&field[eq + 1..]));
        }

        Ok(Some((msg, needed)))
    }
}

impl fmt::Display for FixMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (tag, value) in &self.pairs {
            write!(f, "{}={}|", tag, String::from_utf8_lossy(value))?;
        }
        Ok(())
    }
}
