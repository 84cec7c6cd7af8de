//! HAN wire protocol: command frames, reply frames, line framing and
//! reading conversion.

pub mod codec;
pub mod encoder;
pub mod line_reader;
pub mod readings;
pub mod response;

pub use codec::HanCodec;
pub use encoder::{GOUT_READ_STATUS, HanRequest, encode};
pub use line_reader::{LineReader, ReadStatus, ReaderState};
pub use readings::{ChangeKey, Reading};
pub use response::ResponseFrame;
