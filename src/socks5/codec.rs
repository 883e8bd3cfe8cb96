use super::*;

// +----+----------+----------+
// |VER | NMETHODS | METHODS  |
// +----+----------+----------+
// | 1  |    1     | 1 to 255 |
// +----+----------+----------+
//
// +----+------+----------+------+----------+
// |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
// +----+------+----------+------+----------+
// | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
// +----+------+----------+------+----------+
//
// +----+-----+-------+------+----------+----------+
// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
// +----+-----+-------+------+----------+----------+
// | 1  |  1  | X'00' |  1   | Variable |    2     |
// +----+-----+-------+------+----------+----------+

pub const SOCKS_VERSION: u8 = 0x05;
pub const AUTH_VERSION: u8 = 0x01;
const RESERVED: u8 = 0x00;

/// Methods this server is able to select. A client offering none of them
/// cannot be served under `strict_methods`.
pub static SUPPORTED_METHODS: &[AuthMethod] = &[AuthMethod::NoAuth, AuthMethod::UsernamePassword];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    NoAuth,
    Gssapi,
    UsernamePassword,
    NoAcceptable,
    Other(u8),
}

impl AuthMethod {
    pub fn is_supported(self) -> bool {
        SUPPORTED_METHODS.contains(&self)
    }
}

impl From<u8> for AuthMethod {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::NoAuth,
            0x01 => Self::Gssapi,
            0x02 => Self::UsernamePassword,
            0xff => Self::NoAcceptable,
            x => Self::Other(x),
        }
    }
}

impl From<AuthMethod> for u8 {
    fn from(method: AuthMethod) -> Self {
        match method {
            AuthMethod::NoAuth => 0x00,
            AuthMethod::Gssapi => 0x01,
            AuthMethod::UsernamePassword => 0x02,
            AuthMethod::NoAcceptable => 0xff,
            AuthMethod::Other(x) => x,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Connect,
    Bind,
    UdpAssociate,
    Unknown(u8),
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Self::Connect,
            0x02 => Self::Bind,
            0x03 => Self::UdpAssociate,
            x => Self::Unknown(x),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        match command {
            Command::Connect => 0x01,
            Command::Bind => 0x02,
            Command::UdpAssociate => 0x03,
            Command::Unknown(x) => x,
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => f.write_str("CONNECT"),
            Self::Bind => f.write_str("BIND"),
            Self::UdpAssociate => f.write_str("UDP ASSOCIATE"),
            Self::Unknown(x) => write!(f, "{:#04x}", x),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressType {
    Ipv4,
    DomainName,
    Ipv6,
}

impl TryFrom<u8> for AddressType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Ipv4),
            0x03 => Ok(Self::DomainName),
            0x04 => Ok(Self::Ipv6),
            x => Err(Error::UnknownAddressType(x)),
        }
    }
}

impl AddressType {
    /// Address bytes on the wire, `None` for the length-prefixed domain.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Self::Ipv4 => Some(4),
            Self::Ipv6 => Some(16),
            Self::DomainName => None,
        }
    }
}

impl From<AddressType> for u8 {
    fn from(address_type: AddressType) -> Self {
        match address_type {
            AddressType::Ipv4 => 0x01,
            AddressType::DomainName => 0x03,
            AddressType::Ipv6 => 0x04,
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReplyCode {
    Succeeded = 0x00,
    GeneralFailure = 0x01,
    RulesetDenied = 0x02,
    NetworkUnreachable = 0x03,
    HostUnreachable = 0x04,
    ConnectionRefused = 0x05,
    TtlExpired = 0x06,
    CommandNotSupported = 0x07,
    AddressTypeNotSupported = 0x08,
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthStatus {
    Succeeded = 0x00,
    Failure = 0x01,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Greeting {
    pub version: u8,
    pub methods: Vec<AuthMethod>,
}

impl Greeting {
    /// The method list is only framed for version 5, any other version
    /// is returned with an empty list so the caller can bail out at once.
    pub async fn decode<T: Transport + ?Sized>(transport: &mut T) -> Result<Self> {
        let header = transport.receive(2).await?;
        let version = header[0];
        if version != SOCKS_VERSION {
            return Ok(Self {
                version,
                methods: Vec::new(),
            });
        }

        let methods = transport.receive(header[1] as usize).await?;
        Ok(Self {
            version,
            methods: methods.into_iter().map(AuthMethod::from).collect(),
        })
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(2 + self.methods.len());
        buf.push(self.version);
        buf.push(length_byte("method list", self.methods.len())?);
        buf.extend(self.methods.iter().map(|&m| u8::from(m)));
        Ok(buf)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MethodSelection {
    pub version: u8,
    pub method: AuthMethod,
}

impl MethodSelection {
    pub fn new(method: AuthMethod) -> Self {
        Self {
            version: SOCKS_VERSION,
            method,
        }
    }

    pub fn encode(&self) -> [u8; 2] {
        [self.version, self.method.into()]
    }
}

impl From<[u8; 2]> for MethodSelection {
    fn from(buf: [u8; 2]) -> Self {
        Self {
            version: buf[0],
            method: buf[1].into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub version: u8,
    pub username: Vec<u8>,
    pub password: Vec<u8>,
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("version", &self.version)
            .field("username", &String::from_utf8_lossy(&self.username))
            .finish_non_exhaustive()
    }
}

impl AuthRequest {
    pub fn new<U: Into<Vec<u8>>, P: Into<Vec<u8>>>(username: U, password: P) -> Self {
        Self {
            version: AUTH_VERSION,
            username: username.into(),
            password: password.into(),
        }
    }

    pub async fn decode<T: Transport + ?Sized>(transport: &mut T) -> Result<Self> {
        let header = transport.receive(2).await?;
        let username = transport.receive(header[1] as usize).await?;
        let password_len = transport.receive_byte().await?;
        let password = transport.receive(password_len as usize).await?;

        Ok(Self {
            version: header[0],
            username,
            password,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(3 + self.username.len() + self.password.len());
        buf.push(self.version);
        buf.push(length_byte("username", self.username.len())?);
        buf.extend_from_slice(&self.username);
        buf.push(length_byte("password", self.password.len())?);
        buf.extend_from_slice(&self.password);
        Ok(buf)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AuthReply {
    pub version: u8,
    pub status: AuthStatus,
}

impl AuthReply {
    pub fn new(status: AuthStatus) -> Self {
        Self {
            version: AUTH_VERSION,
            status,
        }
    }

    pub fn encode(&self) -> [u8; 2] {
        [self.version, self.status as u8]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionRequest {
    pub version: u8,
    pub command: Command,
    pub reserved: u8,
    pub address_type: AddressType,
    pub address: Vec<u8>,
    pub port: u16,
}

impl ConnectionRequest {
    pub fn new(command: Command, address_type: AddressType, address: Vec<u8>, port: u16) -> Self {
        Self {
            version: SOCKS_VERSION,
            command,
            reserved: RESERVED,
            address_type,
            address,
            port,
        }
    }

    pub async fn decode<T: Transport + ?Sized>(transport: &mut T) -> Result<Self> {
        let header = transport.receive(4).await?;
        let address_type = AddressType::try_from(header[3])?;
        let address = match address_type {
            AddressType::Ipv4 => transport.receive(4).await?,
            AddressType::Ipv6 => transport.receive(16).await?,
            AddressType::DomainName => {
                let len = transport.receive_byte().await?;
                transport.receive(len as usize).await?
            }
        };
        let port = transport.receive(2).await?;

        Ok(Self {
            version: header[0],
            command: header[1].into(),
            reserved: header[2],
            address_type,
            address,
            port: u16::from_be_bytes([port[0], port[1]]),
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![
            self.version,
            self.command.into(),
            self.reserved,
            self.address_type.into(),
        ];
        encode_tail(&mut buf, self.address_type, &self.address, self.port)?;
        Ok(buf)
    }

    pub fn target(&self) -> ResolvedTarget {
        ResolvedTarget::new(format_host(self.address_type, &self.address), self.port)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionReply {
    pub version: u8,
    pub code: ReplyCode,
    pub reserved: u8,
    pub address_type: AddressType,
    pub address: Vec<u8>,
    pub port: u16,
}

impl ConnectionReply {
    /// A reply without a known bound address: `0.0.0.0:0`.
    pub fn new(code: ReplyCode) -> Self {
        Self::with_address(code, AddressType::Ipv4, vec![0; 4], 0)
    }

    pub fn bound(code: ReplyCode, addr: SocketAddr) -> Self {
        let (address_type, address, port) = encode_address(addr);
        Self::with_address(code, address_type, address, port)
    }

    pub fn with_address(
        code: ReplyCode,
        address_type: AddressType,
        address: Vec<u8>,
        port: u16,
    ) -> Self {
        Self {
            version: SOCKS_VERSION,
            code,
            reserved: RESERVED,
            address_type,
            address,
            port,
        }
    }

    /// Fails when the address does not fit its type: 4 or 16 bytes, or a
    /// domain of at most 255 bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = vec![
            self.version,
            self.code as u8,
            self.reserved,
            self.address_type.into(),
        ];
        encode_tail(&mut buf, self.address_type, &self.address, self.port)?;
        Ok(buf)
    }
}

fn length_byte(field: &'static str, len: usize) -> Result<u8> {
    u8::try_from(len).map_err(|_| Error::InvalidLength { field, len })
}

fn encode_tail(
    buf: &mut Vec<u8>,
    address_type: AddressType,
    address: &[u8],
    port: u16,
) -> Result<()> {
    match address_type.fixed_len() {
        Some(len) if len != address.len() => {
            return Err(Error::InvalidLength {
                field: "address",
                len: address.len(),
            })
        }
        Some(_) => {}
        None => buf.push(length_byte("address", address.len())?),
    }
    buf.extend_from_slice(address);
    buf.extend_from_slice(&port.to_be_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, DuplexStream};

    use super::*;

    async fn transport(input: &[u8]) -> TimedStream<DuplexStream> {
        let (mut client, server) = duplex(1024);
        client.write_all(input).await.unwrap();
        TimedStream::new(server, Duration::from_millis(200))
    }

    #[test]
    fn method_selection_bytes() {
        let selection = MethodSelection::new(AuthMethod::UsernamePassword);
        let bytes = selection.encode();
        assert_eq!(bytes, [0x05, 0x02]);
        assert_eq!(MethodSelection::from(bytes), selection);
        assert_eq!(MethodSelection::new(AuthMethod::NoAuth).encode(), [0x05, 0x00]);
    }

    #[test]
    fn auth_reply_bytes() {
        assert_eq!(AuthReply::new(AuthStatus::Succeeded).encode(), [0x01, 0x00]);
        assert_eq!(AuthReply::new(AuthStatus::Failure).encode(), [0x01, 0x01]);
    }

    #[test]
    fn default_reply_is_zero_ipv4() {
        assert_eq!(
            ConnectionReply::new(ReplyCode::Succeeded).encode().unwrap(),
            [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            ConnectionReply::new(ReplyCode::CommandNotSupported).encode().unwrap(),
            [0x05, 0x07, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn reply_codes() {
        let codes = [
            ReplyCode::Succeeded,
            ReplyCode::GeneralFailure,
            ReplyCode::RulesetDenied,
            ReplyCode::NetworkUnreachable,
            ReplyCode::HostUnreachable,
            ReplyCode::ConnectionRefused,
            ReplyCode::TtlExpired,
            ReplyCode::CommandNotSupported,
            ReplyCode::AddressTypeNotSupported,
        ];
        for (i, code) in codes.iter().enumerate() {
            assert_eq!(ConnectionReply::new(*code).encode().unwrap()[1], i as u8);
        }
    }

    #[test]
    fn bound_reply_carries_address() {
        let reply = ConnectionReply::bound(ReplyCode::Succeeded, "10.0.0.1:1080".parse().unwrap());
        assert_eq!(reply.encode().unwrap(), [0x05, 0x00, 0x00, 0x01, 10, 0, 0, 1, 0x04, 0x38]);

        let reply = ConnectionReply::bound(ReplyCode::GeneralFailure, "[::1]:80".parse().unwrap());
        let bytes = reply.encode().unwrap();
        assert_eq!(bytes.len(), 4 + 16 + 2);
        assert_eq!(&bytes[..4], &[0x05, 0x01, 0x00, 0x04]);
        assert_eq!(bytes[19], 1);
        assert_eq!(&bytes[20..], &[0x00, 0x50]);
    }

    #[test]
    fn port_is_big_endian_on_encode() {
        let request = ConnectionRequest::new(Command::Connect, AddressType::Ipv4, vec![0; 4], 80);
        assert_eq!(&request.encode().unwrap()[8..], &[0x00, 0x50]);
    }

    #[test]
    fn method_table() {
        assert!(AuthMethod::NoAuth.is_supported());
        assert!(AuthMethod::UsernamePassword.is_supported());
        assert!(!AuthMethod::Gssapi.is_supported());
        assert_eq!(AuthMethod::from(0x80), AuthMethod::Other(0x80));
        assert_eq!(u8::from(AuthMethod::NoAcceptable), 0xff);
    }

    #[tokio::test]
    async fn decode_greeting() {
        let mut t = transport(&[0x05, 0x02, 0x00, 0x02]).await;
        let greeting = Greeting::decode(&mut t).await.unwrap();
        assert_eq!(greeting.version, 5);
        assert_eq!(greeting.method_count(), 2);
        assert_eq!(
            greeting.methods,
            vec![AuthMethod::NoAuth, AuthMethod::UsernamePassword]
        );
        assert_eq!(greeting.encode().unwrap(), vec![0x05, 0x02, 0x00, 0x02]);
    }

    #[tokio::test]
    async fn decode_greeting_short_read() {
        let mut t = transport(&[0x05, 0x03, 0x00]).await;
        match Greeting::decode(&mut t).await {
            Err(Error::Receive(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn decode_greeting_other_version_stops_after_header() {
        let mut t = transport(&[0x04, 0x01]).await;
        let greeting = Greeting::decode(&mut t).await.unwrap();
        assert_eq!(greeting.version, 4);
        assert!(greeting.methods.is_empty());
    }

    #[tokio::test]
    async fn decode_auth_request() {
        let bytes = AuthRequest::new("alice", "secret").encode().unwrap();
        assert_eq!(bytes[..2], [0x01, 5]);
        let mut t = transport(&bytes).await;
        let request = AuthRequest::decode(&mut t).await.unwrap();
        assert_eq!(request.version, AUTH_VERSION);
        assert_eq!(request.username, b"alice");
        assert_eq!(request.password, b"secret");
    }

    #[tokio::test]
    async fn decode_auth_request_missing_password() {
        let mut t = transport(&[0x01, 0x05, b'a', b'l', b'i', b'c', b'e', 0x06, b's']).await;
        assert!(matches!(
            AuthRequest::decode(&mut t).await,
            Err(Error::Receive(_))
        ));
    }

    #[tokio::test]
    async fn decode_ipv4_request() {
        let mut t = transport(&[0x05, 0x01, 0x00, 0x01, 93, 184, 216, 34, 0x00, 0x50]).await;
        let request = ConnectionRequest::decode(&mut t).await.unwrap();
        assert_eq!(request.version, 5);
        assert_eq!(request.command, Command::Connect);
        assert_eq!(request.reserved, 0);
        assert_eq!(request.address_type, AddressType::Ipv4);
        assert_eq!(request.port, 80);
        assert_eq!(request.target().to_string(), "93.184.216.34:80");
    }

    #[tokio::test]
    async fn decode_domain_request() {
        let request = ConnectionRequest::new(
            Command::Connect,
            AddressType::DomainName,
            b"example.com".to_vec(),
            443,
        );
        let bytes = request.encode().unwrap();
        assert_eq!(bytes[4], 11);
        let mut t = transport(&bytes).await;
        let decoded = ConnectionRequest::decode(&mut t).await.unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.target().to_string(), "example.com:443");
    }

    #[tokio::test]
    async fn decode_empty_and_long_domain() {
        for len in [0usize, 255] {
            let request = ConnectionRequest::new(
                Command::Connect,
                AddressType::DomainName,
                vec![b'a'; len],
                8080,
            );
            let mut t = transport(&request.encode().unwrap()).await;
            let decoded = ConnectionRequest::decode(&mut t).await.unwrap();
            assert_eq!(decoded.address.len(), len);
            assert_eq!(decoded.port, 8080);
        }
    }

    #[tokio::test]
    async fn decode_ipv6_request() {
        let mut address = vec![0; 16];
        address[15] = 1;
        let request = ConnectionRequest::new(Command::Bind, AddressType::Ipv6, address, 0x1f90);
        let mut t = transport(&request.encode().unwrap()).await;
        let decoded = ConnectionRequest::decode(&mut t).await.unwrap();
        assert_eq!(decoded.command, Command::Bind);
        assert_eq!(decoded.port, 8080);
        assert_eq!(
            decoded.target().to_string(),
            "[0000:0000:0000:0000:0000:0000:0000:0001]:8080"
        );
    }

    #[tokio::test]
    async fn decode_unknown_address_type() {
        let mut t = transport(&[0x05, 0x01, 0x00, 0x05, 1, 2, 3, 4, 0, 80]).await;
        assert!(matches!(
            ConnectionRequest::decode(&mut t).await,
            Err(Error::UnknownAddressType(0x05))
        ));
    }

    #[tokio::test]
    async fn decode_truncated_port() {
        let mut t = transport(&[0x05, 0x01, 0x00, 0x01, 127, 0, 0, 1, 0x00]).await;
        assert!(matches!(
            ConnectionRequest::decode(&mut t).await,
            Err(Error::Receive(_))
        ));
    }

    #[test]
    fn oversized_domain_is_not_encoded() {
        let request = ConnectionRequest::new(
            Command::Connect,
            AddressType::DomainName,
            vec![b'a'; 256],
            80,
        );
        assert!(matches!(
            request.encode(),
            Err(Error::InvalidLength { len: 256, .. })
        ));

        let reply = ConnectionReply::with_address(
            ReplyCode::Succeeded,
            AddressType::DomainName,
            vec![b'a'; 255],
            80,
        );
        let bytes = reply.encode().unwrap();
        assert_eq!(bytes[4], 255);
        assert_eq!(bytes.len(), 4 + 1 + 255 + 2);
    }

    #[test]
    fn address_must_match_its_type() {
        let reply =
            ConnectionReply::with_address(ReplyCode::Succeeded, AddressType::Ipv4, vec![1, 2], 80);
        assert!(matches!(
            reply.encode(),
            Err(Error::InvalidLength { len: 2, .. })
        ));

        let request =
            ConnectionRequest::new(Command::Connect, AddressType::Ipv6, vec![0; 4], 80);
        assert!(matches!(
            request.encode(),
            Err(Error::InvalidLength { len: 4, .. })
        ));
    }

    #[test]
    fn oversized_credentials_are_not_encoded() {
        let request = AuthRequest::new(vec![b'u'; 300], "secret");
        assert!(matches!(
            request.encode(),
            Err(Error::InvalidLength { len: 300, .. })
        ));

        let greeting = Greeting {
            version: SOCKS_VERSION,
            methods: vec![AuthMethod::NoAuth; 256],
        };
        assert!(greeting.encode().is_err());
    }
}
