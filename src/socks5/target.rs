use super::*;

/// Where the client asked to be connected, as `host:port`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedTarget {
    pub host: String,
    pub port: u16,
}

impl ResolvedTarget {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

impl Display for ResolvedTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[async_trait]
pub trait TargetConnector: Send {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin;

    async fn connect(&mut self, target: &ResolvedTarget) -> Result<Self::Stream>;
}

/// Dials the target straight from this host, resolving names with tokio.
pub struct DirectConnector;

#[async_trait]
impl TargetConnector for DirectConnector {
    type Stream = TcpStream;

    async fn connect(&mut self, target: &ResolvedTarget) -> Result<Self::Stream> {
        let stream = TcpStream::connect(target.to_string()).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
