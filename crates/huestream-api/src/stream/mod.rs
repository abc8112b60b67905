pub mod codec;
pub mod dtls;

pub use codec::{FrameEncoder, Rgb};
pub use dtls::{DtlsStream, STREAM_PORT, StreamOptions};
