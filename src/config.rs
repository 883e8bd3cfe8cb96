use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::socks5::{Credentials, ServerPolicy};

pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    local_addr: String,
    local_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strict_methods: Option<bool>,
    log_level: u8,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_level > 5 {
            return Err(Error::Config(format!(
                "log_level {} is out of range 0..=5",
                self.log_level
            )));
        }
        self.credentials().map(drop)
    }

    pub fn local(&self) -> (&str, u16) {
        (&self.local_addr, self.local_port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    pub fn log_level(&self) -> LevelFilter {
        match self.log_level {
            0 => LevelFilter::Trace,
            1 => LevelFilter::Debug,
            2 => LevelFilter::Info,
            3 => LevelFilter::Warn,
            4 => LevelFilter::Error,
            _ => LevelFilter::Off,
        }
    }

    pub fn credentials(&self) -> Result<Option<Credentials>> {
        match (&self.username, &self.password) {
            (None, None) => Ok(None),
            (Some(username), Some(password)) => {
                Credentials::new(username.as_bytes(), password.as_bytes()).map(Some)
            }
            _ => Err(Error::Config(
                "username and password must be set together".into(),
            )),
        }
    }

    pub fn policy(&self) -> Result<ServerPolicy> {
        Ok(ServerPolicy {
            credentials: self.credentials()?,
            strict_methods: self.strict_methods.unwrap_or(false),
        })
    }
}
