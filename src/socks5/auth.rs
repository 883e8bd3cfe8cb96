use subtle::ConstantTimeEq;

use super::*;

/// Username/password pair the server demands (RFC 1929).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: Vec<u8>,
    password: Vec<u8>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &String::from_utf8_lossy(&self.username))
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn new<U: Into<Vec<u8>>, P: Into<Vec<u8>>>(username: U, password: P) -> Result<Self> {
        let username = username.into();
        let password = password.into();
        for (name, field) in [("username", &username), ("password", &password)] {
            if field.is_empty() || field.len() > 255 {
                return Err(Error::Config(format!("{} must be 1 to 255 bytes", name)));
            }
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &[u8] {
        &self.username
    }

    pub fn verify(&self, username: &[u8], password: &[u8]) -> AuthStatus {
        verify(username, password, &self.username, &self.password)
    }
}

/// Both fields are always compared, in constant time for equal lengths.
pub fn verify(
    candidate_username: &[u8],
    candidate_password: &[u8],
    configured_username: &[u8],
    configured_password: &[u8],
) -> AuthStatus {
    let username = candidate_username.ct_eq(configured_username);
    let password = candidate_password.ct_eq(configured_password);
    if bool::from(username & password) {
        AuthStatus::Succeeded
    } else {
        AuthStatus::Failure
    }
}
