//! Length prefixed message framing over any async byte stream.
//!
//! A frame on the wire is the body length as a big endian `u64` followed by
//! exactly that many body bytes. Bodies are produced by `Serialize` and read
//! back, borrowing from the receive buffer, by `Deserialize`.

mod deserialize;
pub mod msg;
mod protocol;
mod receiver;
mod sender;
mod serialize;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use protocol::HEADER_SIZE;
pub use receiver::{MAX_FRAME_LEN, MsgReceiver};
pub use sender::MsgSender;
pub use serialize::Serialize;

type FrameLen = u64;
const FRAME_LEN_SIZE: usize = size_of::<FrameLen>();

/// Wraps the two halves of a byte stream into framed message ends.
///
/// # Arguments
/// * `rx` - The half frames are read from.
/// * `tx` - The half frames are written to.
pub fn channel<R, W>(rx: R, tx: W) -> (MsgReceiver<R>, MsgSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (MsgReceiver::new(rx), MsgSender::new(tx))
}
