use serde::de::DeserializeOwned;
use serde::Serialize;
use tether_sdk::ClientError;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Upper bound on a single frame's payload; anything larger is a protocol
/// violation, not a legitimate reply.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Encodes `value` as a msgpack map behind a u32 big-endian length prefix.
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>, ClientError> {
    let payload = rmp_serde::to_vec_named(value)
        .map_err(|err| ClientError::Parse(format!("msgpack encode: {err}")))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| ClientError::Parse("frame payload too large".into()))?;
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&payload);
    Ok(framed)
}

pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ClientError> {
    rmp_serde::from_slice(payload).map_err(|err| ClientError::Parse(format!("msgpack decode: {err}")))
}

/// Reads one frame's payload. `Ok(None)` means the peer closed the
/// connection cleanly between frames.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "oversized frame"));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}
