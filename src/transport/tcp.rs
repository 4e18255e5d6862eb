//! TCP client connection and line framing.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::net::TcpStream;

use crate::error::{HarnessError, Result};

/// Connect to `host:port`, giving up after `timeout`.
///
/// Refusal and timeout are both fatal; there is no reconnect.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = format!("{}:{}", host, port);
    tracing::info!("Connecting to {}", addr);

    let stream = connect_within(&addr, TcpStream::connect(&addr), timeout).await?;
    stream.set_nodelay(true)?;

    tracing::info!("Connected to {}", addr);
    Ok(stream)
}

/// Await a pending connect for at most `timeout`, mapping its failures.
pub async fn connect_within<F, T>(addr: &str, connecting: F, timeout: Duration) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match tokio::time::timeout(timeout, connecting).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(HarnessError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(HarnessError::ConnectTimeout(timeout)),
    }
}

/// Splits a byte stream into lines of at most `max_len` bytes.
///
/// Partial data is kept in an internal buffer between calls, so dropping a
/// pending [`LineReader::next_line`] future loses nothing.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    max_len: usize,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    /// Wrap a buffered reader
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(max_len),
            max_len: max_len.max(1),
        }
    }

    /// Next line, terminator included.
    ///
    /// A line longer than `max_len` is returned in pieces. A trailing
    /// unterminated fragment is returned before end of stream, which is
    /// reported as `None`.
    pub async fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if self.buf.last() == Some(&b'\n') || self.buf.len() >= self.max_len {
                return Ok(Some(std::mem::take(&mut self.buf)));
            }

            let room = (self.max_len - self.buf.len()) as u64;
            let n = (&mut self.inner).take(room).read_until(b'\n', &mut self.buf).await?;
            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.buf)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_lines_and_eof() {
        let data: &[u8] = b"hello\r\nworld\npartial";
        let mut reader = LineReader::new(BufReader::new(data), 1024);
        assert_eq!(reader.next_line().await.unwrap().unwrap(), b"hello\r\n");
        assert_eq!(reader.next_line().await.unwrap().unwrap(), b"world\n");
        assert_eq!(reader.next_line().await.unwrap().unwrap(), b"partial");
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_long_line_split() {
        let data: &[u8] = b"abcdefghij\n";
        let mut reader = LineReader::new(BufReader::new(data), 4);
        assert_eq!(reader.next_line().await.unwrap().unwrap(), b"abcd");
        assert_eq!(reader.next_line().await.unwrap().unwrap(), b"efgh");
        assert_eq!(reader.next_line().await.unwrap().unwrap(), b"ij\n");
        assert!(reader.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_line_assembled_across_writes() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut reader = LineReader::new(BufReader::new(client), 1024);

        server.write_all(b"OK par").await.unwrap();
        let pending = tokio::time::timeout(Duration::from_millis(20), reader.next_line()).await;
        assert!(pending.is_err());

        server.write_all(b"tial\r\n").await.unwrap();
        assert_eq!(reader.next_line().await.unwrap().unwrap(), b"OK partial\r\n");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = connect("127.0.0.1", port, Duration::from_secs(5)).await;
        assert!(matches!(result, Err(HarnessError::Connect { .. })));
        assert!(result.unwrap_err().is_setup_failure());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_is_setup_failure() {
        let started = tokio::time::Instant::now();
        let result = connect_within(
            "10.255.255.1:15000",
            std::future::pending::<io::Result<()>>(),
            Duration::from_secs(30),
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, HarnessError::ConnectTimeout(d) if d == Duration::from_secs(30)));
        assert!(err.is_setup_failure());
        assert!(started.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_connect_within_maps_refusal() {
        let refused = async { Err::<(), _>(io::Error::from(io::ErrorKind::ConnectionRefused)) };
        let err = connect_within("127.0.0.1:1", refused, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Connect { ref addr, .. } if addr == "127.0.0.1:1"));
    }

    #[tokio::test]
    async fn test_connect_success() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (stream, accepted) = tokio::join!(
            connect("127.0.0.1", port, Duration::from_secs(5)),
            listener.accept()
        );
        assert!(stream.is_ok());
        assert!(accepted.is_ok());
    }
}
