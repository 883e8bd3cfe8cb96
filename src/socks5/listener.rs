use std::io;

use tokio::time::sleep;
use tokio_stream::Stream;

use super::*;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Socks5Listener {
    listener: TcpListener,
    policy: Arc<ServerPolicy>,
    timeout: Duration,
}

impl Socks5Listener {
    pub async fn listen<A: ToSocketAddrs>(
        addr: A,
        policy: ServerPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            policy: Arc::new(policy),
            timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn handle_incoming(self) -> Result<()> {
        let Self {
            listener,
            policy,
            timeout,
        } = self;

        accept_loop(TcpListenerStream::new(listener), policy, timeout).await
    }
}

async fn accept_loop<I>(
    mut incoming: I,
    policy: Arc<ServerPolicy>,
    timeout: Duration,
) -> Result<()>
where
    I: Stream<Item = io::Result<TcpStream>> + Unpin,
{
    while let Some(accepted) = incoming.next().await {
        let stream = match accepted {
            Ok(stream) => stream,
            Err(e) => {
                error!("accept failed: {}", e);
                // EMFILE and friends: give in-flight connections time to finish
                if !matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset
                ) {
                    sleep(ACCEPT_BACKOFF).await;
                }
                continue;
            }
        };
        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => {
                warn!("dropping connection without peer address: {}", e);
                continue;
            }
        };
        info!("accepted connection from {}", peer);

        let policy = policy.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(stream, policy, timeout, DirectConnector).await {
                if e.is_fatal() {
                    error!("{} => {}", peer, e)
                } else {
                    warn!("{} => {}", peer, e)
                }
            }
        });
    }

    Ok(())
}

/// Runs one connection: handshake, dial, then relay until either side closes.
pub async fn serve<S, C>(
    stream: S,
    policy: Arc<ServerPolicy>,
    timeout: Duration,
    mut connector: C,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
    C: TargetConnector,
{
    let mut handshake = Handshake::new(TimedStream::new(stream, timeout), policy);
    let target = match handshake.run().await? {
        Outcome::Connect(target) => target,
        Outcome::NotSocks5 { .. } => return Ok(()),
    };

    info!("connect {}", target);
    let upstream = connector.connect(&target).await?;
    link_stream(handshake.into_inner().into_inner(), upstream).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accept_errors_do_not_stop_serving() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let incoming = tokio_stream::iter(vec![
            Err(io::Error::from(io::ErrorKind::ConnectionAborted)),
            Err(io::Error::new(io::ErrorKind::Other, "too many open files")),
            Ok(stream),
        ]);
        accept_loop(
            incoming,
            Arc::new(ServerPolicy::default()),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        let mut buf = [0; 2];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x05, 0x00]);
    }
}
