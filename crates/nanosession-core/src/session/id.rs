use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::SessionError;

/// Random bytes per identifier (256 bits).
const ID_BYTES: usize = 32;

/// Length of the base64url (unpadded) encoding of `ID_BYTES`.
pub const ID_LEN: usize = 43;

/// Opaque session identifier carried in the session cookie.
///
/// Always minted from the operating system's CSPRNG. Values taken from a
/// request only become a `SessionId` after passing [`SessionId::parse`], and
/// are only ever used to look up an existing record.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Validate an identifier presented by a client.
    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        if raw.len() != ID_LEN {
            return Err(SessionError::InvalidIdentifier(format!(
                "expected {} characters, got {}",
                ID_LEN,
                raw.len()
            )));
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(SessionError::InvalidIdentifier(
                "unexpected character".to_string(),
            ));
        }
        match URL_SAFE_NO_PAD.decode(raw) {
            Ok(bytes) if bytes.len() == ID_BYTES => Ok(Self(raw.to_string())),
            _ => Err(SessionError::InvalidIdentifier(
                "not a canonical encoding".to_string(),
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines; never log the full identifier.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionId({}…)", self.short())
    }
}
