//! Entertainment frame encoding.
//!
//! A frame is a 16-byte header, the 36-byte entertainment configuration id,
//! and 7 bytes per channel:
//!
//! ```text
//! "HueStream" | 02 00 | seq | 00 00 | color space | 00 | config id (36) | channels…
//! channel = id:u8 | r:u16be | g:u16be | b:u16be
//! ```
//!
//! 8-bit inputs are widened by repeating the byte (`0xAB` → `0xABAB`), so
//! full scale maps to full scale.

use serde::{Deserialize, Serialize};

/// Protocol magic at the start of every frame.
pub const MAGIC: &[u8; 9] = b"HueStream";
/// Header length up to and including the reserved byte after the color space.
pub const HEADER_LEN: usize = 16;
/// Fixed width of the entertainment configuration id field.
pub const SESSION_ID_LEN: usize = 36;
/// Bytes per channel entry.
pub const CHANNEL_LEN: usize = 7;

const VERSION_MAJOR: u8 = 0x02;
const VERSION_MINOR: u8 = 0x00;
const SEQUENCE: u8 = 0x00;
const COLOR_SPACE_RGB: u8 = 0x00;

/// An 8-bit RGB triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

/// Total frame length for a given channel count.
pub const fn frame_len(channels: usize) -> usize {
    HEADER_LEN + SESSION_ID_LEN + CHANNEL_LEN * channels
}

/// Encode one frame into a freshly allocated buffer.
pub fn encode(session_id: &str, colors: &[Rgb]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame_len(colors.len()));
    write_frame(&mut out, session_id, colors);
    out
}

/// Reusable encoder that keeps one buffer alive across frames.
///
/// At streaming rates this avoids an allocation per frame once the buffer
/// has grown to the area's frame size.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    buf: Vec<u8>,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the buffer for an area with `channels` channels.
    pub fn with_channels(channels: usize) -> Self {
        Self {
            buf: Vec::with_capacity(frame_len(channels)),
        }
    }

    /// Encode a frame, returning a view into the internal buffer.
    pub fn encode(&mut self, session_id: &str, colors: &[Rgb]) -> &[u8] {
        self.buf.clear();
        write_frame(&mut self.buf, session_id, colors);
        &self.buf
    }
}

fn write_frame(out: &mut Vec<u8>, session_id: &str, colors: &[Rgb]) {
    debug_assert!(
        session_id.len() <= SESSION_ID_LEN,
        "session id longer than {SESSION_ID_LEN} bytes: {session_id}"
    );
    debug_assert!(colors.len() <= usize::from(u8::MAX) + 1, "too many channels");

    out.reserve(frame_len(colors.len()));

    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[
        VERSION_MAJOR,
        VERSION_MINOR,
        SEQUENCE,
        0x00,
        0x00,
        COLOR_SPACE_RGB,
        0x00,
    ]);

    let id = session_id.as_bytes();
    let id = &id[..id.len().min(SESSION_ID_LEN)];
    out.extend_from_slice(id);
    out.resize(out.len() + (SESSION_ID_LEN - id.len()), 0x00);

    for (index, color) in (0..=u8::MAX).zip(colors) {
        out.extend_from_slice(&[
            index, color.r, color.r, color.g, color.g, color.b, color.b,
        ]);
    }
}
