//! Length-prefixed framing
//!
//! Every frame is a 4-byte little-endian payload length followed by the
//! payload, which is one JSON document.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::PipeError;

/// Largest payload either side may send
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Write one frame and flush it
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), PipeError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(PipeError::FrameTooLarge { len: payload.len() });
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame; `None` when the peer closed cleanly between frames
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, PipeError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(PipeError::FrameTooLarge { len });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_layout() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, br#"{"id":1}"#).await.unwrap();

        let mut header = [0u8; 4];
        server.read_exact(&mut header).await.unwrap();
        assert_eq!(header, [8, 0, 0, 0]);

        let mut body = [0u8; 8];
        server.read_exact(&mut body).await.unwrap();
        assert_eq!(&body, br#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_clean_close_between_frames() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, b"{}").await.unwrap();
        drop(client);

        assert_eq!(read_frame(&mut server).await.unwrap(), Some(b"{}".to_vec()));
        assert_eq!(read_frame(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_truncated_payload_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&10u32.to_le_bytes()).await.unwrap();
        client.write_all(b"{}").await.unwrap();
        drop(client);

        assert!(matches!(read_frame(&mut server).await, Err(PipeError::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_header_rejected() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let len = (MAX_FRAME_LEN + 1) as u32;
        client.write_all(&len.to_le_bytes()).await.unwrap();

        match read_frame(&mut server).await {
            Err(PipeError::FrameTooLarge { len: got }) => assert_eq!(got, MAX_FRAME_LEN + 1),
            other => panic!("expected oversized frame error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_payload_never_written() {
        let (mut client, _server) = tokio::io::duplex(16);
        let payload = vec![b' '; MAX_FRAME_LEN + 1];

        assert!(matches!(
            write_frame(&mut client, &payload).await,
            Err(PipeError::FrameTooLarge { .. })
        ));
    }
}
