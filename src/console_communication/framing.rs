use std::io::{Error, ErrorKind};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound for a single frame body.
pub(crate) const MAX_FRAME_LEN: usize = 1 << 20;

/// Reads one `u32` big endian length prefixed frame.
pub(crate) async fn read_frame<R>(socket: &mut R) -> Result<Vec<u8>, Error>
where R: AsyncRead + Unpin {
    let length = socket.read_u32().await? as usize;
    if length > MAX_FRAME_LEN {
        return Err(Error::new(ErrorKind::InvalidData, format!("frame of {length} bytes exceeds limit")));
    }
    let mut buffer = vec![0u8; length];
    socket.read_exact(&mut buffer).await?;
    Ok(buffer)
}

/// Writes `payload` as one length prefixed frame.
pub(crate) async fn write_frame<W>(socket: &mut W, payload: &[u8]) -> Result<(), Error>
where W: AsyncWrite + Unpin {
    let length = u32::try_from(payload.len())
        .ok()
        .filter(|l| *l as usize <= MAX_FRAME_LEN)
        .ok_or_else(|| Error::new(ErrorKind::InvalidInput, "frame exceeds limit"))?;
    socket.write_u32(length).await?;
    socket.write_all(payload).await
}
