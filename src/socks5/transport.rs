use std::io;

use tokio::time::timeout;

use super::*;

/// Byte transport a handshake runs over.
///
/// `receive` yields exactly `n` bytes or fails; nothing is retried.
#[async_trait]
pub trait Transport: Send {
    async fn receive(&mut self, n: usize) -> Result<Vec<u8>>;

    async fn receive_byte(&mut self) -> Result<u8> {
        let buf = self.receive(1).await?;
        buf.first()
            .copied()
            .ok_or_else(|| Error::Receive(io::ErrorKind::UnexpectedEof.into()))
    }

    async fn send(&mut self, data: &[u8]) -> Result<()>;

    fn set_timeout(&mut self, timeout: Duration);

    async fn close(&mut self) -> Result<()>;
}

/// A tokio stream whose every read and write is bounded by one timeout.
pub struct TimedStream<S> {
    stream: S,
    timeout: Duration,
}

impl<S> TimedStream<S> {
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self { stream, timeout }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait]
impl<S: AsyncRead + AsyncWrite + Send + Unpin> Transport for TimedStream<S> {
    async fn receive(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; n];
        match timeout(self.timeout, self.stream.read_exact(&mut buf)).await {
            Ok(Ok(_)) => Ok(buf),
            Ok(Err(e)) => Err(Error::Receive(e)),
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = &mut self.stream;
        let write = async move {
            stream.write_all(data).await?;
            stream.flush().await
        };
        match timeout(self.timeout, write).await {
            Ok(r) => r.map_err(Error::Send),
            Err(_) => Err(Error::Send(io::ErrorKind::TimedOut.into())),
        }
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    async fn close(&mut self) -> Result<()> {
        match timeout(self.timeout, self.stream.shutdown()).await {
            Ok(r) => Ok(r?),
            Err(_) => Err(Error::Timeout),
        }
    }
}
