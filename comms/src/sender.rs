use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{FRAME_LEN_SIZE, FrameLen, Serialize};

/// Writes whole frames to a byte stream.
///
/// The head of every frame is staged in a buffer reused across sends, a
/// borrowed tail returned by `Serialize` goes straight to the writer.
pub struct MsgSender<W: AsyncWrite + Unpin> {
    tx: W,
    head: Vec<u8>,
}

impl<W: AsyncWrite + Unpin> MsgSender<W> {
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            head: Vec::new(),
        }
    }

    /// Writes `msg` as one frame and flushes the writer.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        self.head.clear();
        self.head.extend_from_slice(&[0; FRAME_LEN_SIZE]);

        let tail = msg.serialize(&mut self.head)?.unwrap_or_default();
        let body_len = self.head.len() - FRAME_LEN_SIZE + tail.len();
        let body_len = FrameLen::try_from(body_len)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.head[..FRAME_LEN_SIZE].copy_from_slice(&body_len.to_be_bytes());

        self.tx.write_all(&self.head).await?;
        if !tail.is_empty() {
            self.tx.write_all(tail).await?;
        }

        self.tx.flush().await
    }

    /// Closes the write side, the peer then reads an end of file.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.tx.shutdown().await
    }
}
