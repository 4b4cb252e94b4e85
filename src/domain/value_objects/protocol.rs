use std::fmt;

use crate::common::error::SyncError;
use crate::common::result::SyncResult;

/// Transport used to talk to a git host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ssh,
    /// HTTPS with token based basic auth
    Tls,
}

impl Protocol {
    /// Parse the protocol declared in configuration.
    ///
    /// An unset or empty value means HTTPS. Anything that is neither SSH nor
    /// TLS is rejected instead of falling back to a default.
    pub fn parse(value: Option<&str>) -> SyncResult<Self> {
        match value.map(|v| v.trim().to_lowercase()) {
            None => Ok(Protocol::Tls),
            Some(v) if v.is_empty() => Ok(Protocol::Tls),
            Some(v) => match v.as_str() {
                "ssh" => Ok(Protocol::Ssh),
                "tls" | "https" => Ok(Protocol::Tls),
                other => Err(SyncError::authentication(format!(
                    "unknown protocol '{}', expected 'ssh' or 'tls'",
                    other
                ))),
            },
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Ssh => "ssh",
            Protocol::Tls => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Ssh => write!(f, "ssh"),
            Protocol::Tls => write!(f, "tls"),
        }
    }
}
