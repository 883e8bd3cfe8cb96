pub mod config;
pub mod error;
pub mod socks5;
pub mod util;
