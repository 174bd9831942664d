use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Deserialize, FRAME_LEN_SIZE, FrameLen};

/// The largest body `recv_into` accepts.
pub const MAX_FRAME_LEN: usize = 1 << 30;

/// Reads whole frames from a byte stream.
pub struct MsgReceiver<R: AsyncRead + Unpin> {
    rx: R,
}

impl<R: AsyncRead + Unpin> MsgReceiver<R> {
    pub(super) fn new(rx: R) -> Self {
        Self { rx }
    }

    /// Waits for the next frame, refusing bodies longer than `MAX_FRAME_LEN`.
    ///
    /// # Arguments
    /// * `buf` - Where the body is read to, the returned value may borrow from it.
    pub async fn recv_into<'buf, T>(&mut self, buf: &'buf mut Vec<u8>) -> io::Result<T>
    where
        T: Deserialize<'buf>,
    {
        self.recv_into_bounded(buf, MAX_FRAME_LEN).await
    }

    /// Waits for the next frame whose body is at most `max_len` bytes.
    ///
    /// The length prefix is checked before anything is allocated, a longer
    /// frame fails with `io::ErrorKind::InvalidData` and leaves its body
    /// unread, so the stream can't be used afterwards.
    ///
    /// # Arguments
    /// * `buf` - Where the body is read to, the returned value may borrow from it.
    /// * `max_len` - The largest body accepted.
    pub async fn recv_into_bounded<'buf, T>(
        &mut self,
        buf: &'buf mut Vec<u8>,
        max_len: usize,
    ) -> io::Result<T>
    where
        T: Deserialize<'buf>,
    {
        let mut prefix = [0; FRAME_LEN_SIZE];
        self.rx.read_exact(&mut prefix).await?;

        let len = FrameLen::from_be_bytes(prefix);
        let len = usize::try_from(len)
            .ok()
            .filter(|&len| len <= max_len)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("frame of {len} bytes is over the limit of {max_len}"),
                )
            })?;

        buf.clear();
        buf.resize(len, 0);
        self.rx.read_exact(buf).await?;

        T::deserialize(buf)
    }
}
