use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN, Serialize};

/// The sending end handle of the communication.
///
/// Every frame is a big endian `u64` body length followed by the body. A message may hand back
/// a borrowed tail, which is written after the buffered part without being copied.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
    buf: Vec<u8>,
    max_frame_len: usize,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    /// Creates a new `OnoSender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self {
            tx,
            buf: Vec::new(),
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Lowers or raises the largest frame body this end sends.
    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    /// Sends `msg` through the inner sender.
    ///
    /// A frame over the limit is rejected with `InvalidInput` and nothing is written, so the
    /// peer never sees a frame it would refuse.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send<'a, T: Serialize<'a>>(&mut self, msg: &'a T) -> io::Result<()> {
        let Self {
            buf,
            tx,
            max_frame_len,
        } = self;

        buf.clear();
        buf.resize(LEN_TYPE_SIZE, 0);

        let tail = msg.serialize(buf);
        let len = buf.len() - LEN_TYPE_SIZE + tail.map_or(0, <[_]>::len);

        if len > *max_frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Frame of {len} bytes exceeds the maximum of {max_frame_len} bytes"),
            ));
        }

        buf[..LEN_TYPE_SIZE].copy_from_slice(&(len as LenType).to_be_bytes());

        match tail {
            Some(tail) if !tail.is_empty() => {
                tx.write_all(buf).await?;
                tx.write_all(tail).await?;
            }
            _ => tx.write_all(buf).await?,
        }

        tx.flush().await
    }
}
