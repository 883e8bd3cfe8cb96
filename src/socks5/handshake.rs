use super::*;

/// Read-only settings shared by every connection.
#[derive(Clone, Debug, Default)]
pub struct ServerPolicy {
    /// When set, USERNAME/PASSWORD is mandatory; otherwise NO-AUTH.
    pub credentials: Option<Credentials>,
    /// Refuse clients that did not offer the method the server selects.
    pub strict_methods: bool,
}

impl ServerPolicy {
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            strict_methods: false,
        }
    }

    /// The server picks from its own configuration, not from the client's offer.
    pub fn method(&self) -> AuthMethod {
        match self.credentials {
            Some(_) => AuthMethod::UsernamePassword,
            None => AuthMethod::NoAuth,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Start,
    MethodsReceived,
    MethodSent,
    AuthReceived,
    AuthReplied,
    RequestReceived,
    Replied,
    Done,
    Aborted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The client was told CONNECT succeeded; the caller dials the target.
    Connect(ResolvedTarget),
    /// Not a SOCKS5 client. Closed without a reply.
    NotSocks5 { version: u8 },
}

/// Server side of one SOCKS5 handshake.
pub struct Handshake<T> {
    transport: T,
    policy: Arc<ServerPolicy>,
    state: State,
    offered: Vec<AuthMethod>,
}

impl<T: Transport> Handshake<T> {
    pub fn new(transport: T, policy: Arc<ServerPolicy>) -> Self {
        Self {
            transport,
            policy,
            state: State::Start,
            offered: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Methods the client advertised. Recorded only, see [`ServerPolicy::method`].
    pub fn offered_methods(&self) -> &[AuthMethod] {
        &self.offered
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Drives the handshake to completion.
    ///
    /// Unless the outcome is [`Outcome::Connect`], the transport has been
    /// closed when this returns and nothing more may be written to it.
    pub async fn run(&mut self) -> Result<Outcome> {
        let result = self.negotiate().await;
        self.transition(match result {
            Ok(_) => State::Done,
            Err(_) => State::Aborted,
        });

        if !matches!(result, Ok(Outcome::Connect(_))) {
            if let Err(e) = self.transport.close().await {
                debug!("close after handshake: {}", e);
            }
        }
        result
    }

    async fn negotiate(&mut self) -> Result<Outcome> {
        let greeting = Greeting::decode(&mut self.transport).await?;
        if greeting.version != SOCKS_VERSION {
            debug!("not a socks5 greeting, version {}", greeting.version);
            return Ok(Outcome::NotSocks5 {
                version: greeting.version,
            });
        }
        debug!("client offers {:?}", greeting.methods);
        self.offered = greeting.methods;
        self.transition(State::MethodsReceived);

        let policy = Arc::clone(&self.policy);
        let method = policy.method();
        if policy.strict_methods && !self.offered.contains(&method) {
            let usable = self
                .offered
                .iter()
                .filter(|m| m.is_supported())
                .collect::<Vec<_>>();
            warn!("client did not offer {:?}, usable offers {:?}", method, usable);
            self.transport
                .send(&MethodSelection::new(AuthMethod::NoAcceptable).encode())
                .await?;
            return Err(Error::NoAcceptableMethod);
        }
        self.transport
            .send(&MethodSelection::new(method).encode())
            .await?;
        self.transition(State::MethodSent);

        if let Some(credentials) = &policy.credentials {
            self.authenticate(credentials).await?;
        }

        self.accept_command().await
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<()> {
        let request = AuthRequest::decode(&mut self.transport).await?;
        if request.version != AUTH_VERSION {
            return Err(Error::UnexpectedVersion {
                protocol: "sub-negotiation",
                version: request.version,
            });
        }
        self.transition(State::AuthReceived);

        let status = credentials.verify(&request.username, &request.password);
        self.transport
            .send(&AuthReply::new(status).encode())
            .await?;
        self.transition(State::AuthReplied);

        match status {
            AuthStatus::Succeeded => {
                debug!(
                    "user {} authenticated",
                    String::from_utf8_lossy(&request.username)
                );
                Ok(())
            }
            AuthStatus::Failure => Err(Error::AuthenticationFailed),
        }
    }

    async fn accept_command(&mut self) -> Result<Outcome> {
        let request = ConnectionRequest::decode(&mut self.transport).await?;
        if request.version != SOCKS_VERSION {
            return Err(Error::UnexpectedVersion {
                protocol: "request",
                version: request.version,
            });
        }
        self.transition(State::RequestReceived);

        if request.command != Command::Connect {
            self.transport
                .send(&ConnectionReply::new(ReplyCode::CommandNotSupported).encode()?)
                .await?;
            self.transition(State::Replied);
            return Err(Error::UnsupportedCommand(request.command));
        }

        let target = request.target();
        self.transport
            .send(&ConnectionReply::new(ReplyCode::Succeeded).encode()?)
            .await?;
        self.transition(State::Replied);
        Ok(Outcome::Connect(target))
    }

    fn transition(&mut self, next: State) {
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
