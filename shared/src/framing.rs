//! Length-prefixed framing for stream transports.
//!
//! Each frame is a 4-byte big-endian payload length followed by the payload.
//! TCP does not keep message boundaries, so every encoded message travels as
//! exactly one frame.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest accepted payload. Snapshots of a few hundred players fit easily.
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame too large: {0} bytes (max {MAX_FRAME_SIZE})")]
    TooLarge(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Checks a payload against [`MAX_FRAME_SIZE`] before it is queued for a
/// writer, so one oversized message fails on its own.
pub fn check_frame_size(payload: &[u8]) -> Result<(), FrameError> {
    if payload.len() > MAX_FRAME_SIZE as usize {
        return Err(FrameError::TooLarge(payload.len()));
    }
    Ok(())
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    check_frame_size(payload)?;
    let len = payload.len();

    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. A clean close before the length prefix surfaces as an
/// `UnexpectedEof` I/O error.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(len as usize));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}
