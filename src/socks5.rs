use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, trace, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_stream::{wrappers::TcpListenerStream, StreamExt};

use crate::error::{Error, Result};
use crate::util::link_stream;

pub use self::{
    address::{encode_address, format_host},
    auth::{verify, Credentials},
    codec::{
        AddressType, AuthMethod, AuthReply, AuthRequest, AuthStatus, Command, ConnectionReply,
        ConnectionRequest, Greeting, MethodSelection, ReplyCode, AUTH_VERSION, SOCKS_VERSION,
        SUPPORTED_METHODS,
    },
    handshake::{Handshake, Outcome, ServerPolicy, State},
    listener::{serve, Socks5Listener},
    target::{DirectConnector, ResolvedTarget, TargetConnector},
    transport::{TimedStream, Transport},
};

mod address;
mod auth;
mod codec;
mod handshake;
mod listener;
mod target;
mod transport;
