pub mod decode;
pub mod frame;

pub use decode::{decode_server, encode_server};
pub use frame::{FrameDecoder, FrameReader, MAX_FRAME_LENGTH};
