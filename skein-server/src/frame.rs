//! Length-prefixed request and response frames

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ServerError;
use crate::Result;

const LENGTH_PREFIX_LEN: usize = 4;

/// Reads one frame payload. Returns `Ok(None)` when the peer closed the connection
/// cleanly between frames.
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: usize) -> Result<Option<BytesMut>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_PREFIX_LEN];
    let mut filled = 0;
    while filled < LENGTH_PREFIX_LEN {
        let n = reader.read(&mut len_buf[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ServerError::Framing(format!(
                "connection closed after {filled} of {LENGTH_PREFIX_LEN} length bytes"
            )));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_bytes {
        return Err(ServerError::FrameTooLarge(len));
    }

    let mut payload = BytesMut::zeroed(len);
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            ServerError::Framing(format!("connection closed inside a {len} byte frame"))
        } else {
            ServerError::Io(e)
        }
    })?;
    Ok(Some(payload))
}

/// Prefixes `payload` with its length.
pub fn encode_frame(payload: &[u8]) -> Result<BytesMut> {
    let len = u32::try_from(payload.len()).map_err(|_| ServerError::FrameTooLarge(payload.len()))?;
    let mut frame = BytesMut::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    frame.put_u32(len);
    frame.put_slice(payload);
    Ok(frame)
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
