//! Credential resolution for git transports.

use git2::{Cred, CredentialType, RemoteCallbacks};
use std::fmt;
use tracing::debug;

use crate::common::result::SyncResult;
use crate::domain::entities::sync_config::AuthConfig;
use crate::domain::value_objects::protocol::Protocol;

/// User presented to SSH servers; every major host expects `git`.
pub const SSH_USER: &str = "git";

/// Placeholder user for token based HTTPS auth. Hosts only check the token.
pub const TOKEN_USER: &str = "oauth2";

/// A concrete credential handed to the library engine per call.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMethod {
    SshAgent { user: String },
    BasicAuth { username: String, password: String },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::SshAgent { user } => f.debug_struct("SshAgent").field("user", user).finish(),
            AuthMethod::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

impl AuthMethod {
    pub fn is_ssh(&self) -> bool {
        matches!(self, AuthMethod::SshAgent { .. })
    }

    /// Remote callbacks answering credential requests with this method.
    ///
    /// libgit2 asks again after a rejected credential; the second request
    /// fails so a bad token surfaces as an error instead of a loop.
    pub fn remote_callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        let mut attempts = 0u32;

        callbacks.credentials(move |url, username_from_url, allowed_types| {
            // A username request precedes the key request on SSH.
            if allowed_types != CredentialType::USERNAME {
                attempts += 1;
            }
            if attempts > 1 {
                return Err(git2::Error::from_str(&format!(
                    "authentication rejected for {}",
                    url
                )));
            }

            match self {
                AuthMethod::SshAgent { user } => {
                    let user = username_from_url.unwrap_or(user);
                    if allowed_types.contains(CredentialType::USERNAME) {
                        Cred::username(user)
                    } else if allowed_types.contains(CredentialType::SSH_KEY) {
                        Cred::ssh_key_from_agent(user)
                    } else {
                        Err(git2::Error::from_str("remote does not accept SSH keys"))
                    }
                }
                AuthMethod::BasicAuth { username, password } => {
                    if !allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
                        return Err(git2::Error::from_str("remote does not accept basic auth"));
                    }
                    if password.is_empty() {
                        return Err(git2::Error::from_str("no token configured"));
                    }
                    Cred::userpass_plaintext(username, password)
                }
            }
        });

        callbacks
    }
}

/// Turns a declared protocol into an [`AuthMethod`].
pub struct AuthResolver;

impl AuthResolver {
    /// SSH uses the agent, TLS (or nothing) uses the token as basic auth
    /// password. Any other protocol is a configuration error.
    pub fn get_auth_method(protocol: Option<&str>, http: &AuthConfig) -> SyncResult<AuthMethod> {
        let method = match Protocol::parse(protocol)? {
            Protocol::Ssh => AuthMethod::SshAgent {
                user: SSH_USER.to_string(),
            },
            Protocol::Tls => AuthMethod::BasicAuth {
                username: TOKEN_USER.to_string(),
                password: http.resolve_token().unwrap_or_default(),
            },
        };
        debug!(method = ?method, "Resolved authentication method");
        Ok(method)
    }

    pub fn from_config(auth: &AuthConfig) -> SyncResult<AuthMethod> {
        Self::get_auth_method(auth.protocol.as_deref(), auth)
    }
}
