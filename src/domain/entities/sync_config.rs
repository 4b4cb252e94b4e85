use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use validator::Validate;

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::value_objects::protocol::Protocol;
use crate::domain::value_objects::provider_type::ProviderType;

/// Default per-invocation timeout of the binary engine.
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 180;

/// Git execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitEngine {
    /// In-process libgit2
    #[default]
    Library,
    /// External `git` executable
    Binary,
}

impl fmt::Display for GitEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitEngine::Library => write!(f, "library"),
            GitEngine::Binary => write!(f, "binary"),
        }
    }
}

/// Whether `owner` names a user or an organisation/group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    #[default]
    User,
    Group,
}

/// Credentials for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// `ssh` or `tls`; unset means `tls`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub token_env: Option<String>,
}

impl AuthConfig {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            protocol: None,
            token: Some(token.into()),
            token_env: None,
        }
    }

    pub fn ssh() -> Self {
        Self {
            protocol: Some("ssh".to_string()),
            token: None,
            token_env: None,
        }
    }

    pub fn protocol(&self) -> SyncResult<Protocol> {
        Protocol::parse(self.protocol.as_deref())
    }

    /// Token from the configuration, falling back to `token_env`.
    pub fn resolve_token(&self) -> Option<String> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Some(token.clone());
        }
        self.token_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|t| !t.is_empty())
    }
}

/// Where projects live on one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,

    /// Host name, e.g. `github.com`. Unused by local targets.
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub owner_type: OwnerType,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Root directory for directory and archive targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Only projects whose name matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// Projects whose name matches are skipped, even when included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType, domain: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            provider_type,
            domain: domain.into(),
            owner: owner.into(),
            owner_type: OwnerType::User,
            auth: AuthConfig::default(),
            directory: None,
            include: None,
            exclude: None,
        }
    }

    pub fn local(provider_type: ProviderType, directory: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(provider_type, "", "");
        config.directory = Some(directory.into());
        config
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_owner_type(mut self, owner_type: OwnerType) -> Self {
        self.owner_type = owner_type;
        self
    }

    fn check(&self, context: &str) -> SyncResult<()> {
        self.validate().map_err(|e| {
            SyncError::config_error(format!("{}: {}", context, e))
        })?;
        self.auth.validate().map_err(|e| {
            SyncError::config_error(format!("{}: auth: {}", context, e))
        })?;
        self.auth.protocol()?;

        if self.provider_type.is_local() {
            if self.directory.is_none() {
                return Err(SyncError::config_error(format!(
                    "{}: '{}' targets need a directory",
                    context, self.provider_type
                )));
            }
        } else {
            if self.domain.trim().is_empty() {
                return Err(SyncError::config_error(format!("{}: domain is required", context)));
            }
            if self.owner.trim().is_empty() {
                return Err(SyncError::config_error(format!("{}: owner is required", context)));
            }
        }

        for pattern in [&self.include, &self.exclude].into_iter().flatten() {
            regex::Regex::new(pattern).map_err(|e| {
                SyncError::config_error(format!("{}: invalid filter '{}': {}", context, pattern, e))
            })?;
        }
        Ok(())
    }
}

/// Per-target write policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MirrorSettings {
    #[serde(default)]
    pub force_push: bool,

    /// Skip and record invalid names instead of aborting the run
    #[serde(default)]
    pub ignore_invalid_name: bool,

    #[serde(default)]
    pub ascii_name: bool,

    /// Lift branch protection while writing and restore it afterwards
    #[serde(default)]
    pub disable_protection: bool,

    /// Replaces the generated project description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_prefix: Option<String>,

    /// Overrides visibility mapping for created projects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub visibility: Option<String>,
}

/// One mirror target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub settings: MirrorSettings,
}

impl MirrorConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            settings: MirrorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: MirrorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn provider_type(&self) -> ProviderType {
        self.provider.provider_type
    }
}

/// A source and the targets it is mirrored to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: ProviderConfig,
    #[serde(default)]
    pub mirrors: BTreeMap<String, MirrorConfig>,
}

/// Git execution settings shared by every source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct GitConfig {
    #[serde(default)]
    pub engine: GitEngine,

    /// Stage clones without a working tree
    #[serde(default = "default_bare_clone")]
    pub bare_clone: bool,

    /// Value for `GIT_SSH_COMMAND`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub ssh_command: Option<String>,

    /// URL prefix rewritten by `url.<to>.insteadOf=<from>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_url_rewrite_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_url_rewrite_to: Option<String>,

    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

fn default_bare_clone() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_GIT_TIMEOUT_SECS
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            engine: GitEngine::Library,
            bare_clone: true,
            ssh_command: None,
            ssh_url_rewrite_from: None,
            ssh_url_rewrite_to: None,
            timeout_secs: DEFAULT_GIT_TIMEOUT_SECS,
        }
    }
}

impl GitConfig {
    /// The configured `insteadOf` rewrite, when both halves are present.
    pub fn url_rewrite(&self) -> Option<(&str, &str)> {
        match (&self.ssh_url_rewrite_from, &self.ssh_url_rewrite_to) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() => {
                Some((from.as_str(), to.as_str()))
            }
            _ => None,
        }
    }
}

/// Root of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub configurations: Vec<SyncConfig>,
}

impl AppConfig {
    /// Check every section; the first problem is reported.
    pub fn validate_all(&self) -> SyncResult<()> {
        self.git
            .validate()
            .map_err(|e| SyncError::config_error(format!("git: {}", e)))?;

        if self.git.ssh_url_rewrite_from.is_some() != self.git.ssh_url_rewrite_to.is_some() {
            return Err(SyncError::config_error(
                "git: ssh_url_rewrite_from and ssh_url_rewrite_to must be set together",
            ));
        }

        if self.configurations.is_empty() {
            return Err(SyncError::config_error("no configurations defined"));
        }

        for (index, sync) in self.configurations.iter().enumerate() {
            let context = format!("configurations[{}].source", index);
            if sync.source.provider_type.is_local() {
                return Err(SyncError::config_error(format!(
                    "{}: '{}' cannot be used as a source",
                    context, sync.source.provider_type
                )));
            }
            sync.source.check(&context)?;

            if sync.mirrors.is_empty() {
                return Err(SyncError::config_error(format!(
                    "configurations[{}]: no mirrors defined",
                    index
                )));
            }

            for (name, mirror) in &sync.mirrors {
                let context = format!("configurations[{}].mirrors.{}", index, name);
                mirror.provider.check(&context)?;
                mirror
                    .settings
                    .validate()
                    .map_err(|e| SyncError::config_error(format!("{}: settings: {}", context, e)))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
git:
  engine: binary
  ssh_command: "ssh -i ~/.ssh/mirror"
configurations:
  - source:
      provider_type: gitlab
      domain: gitlab.com
      owner: acme
      owner_type: group
      auth:
        token: glpat-xyz
      exclude: "^archived-"
    mirrors:
      backup:
        provider_type: archive
        directory: /var/backups/git
      github:
        provider_type: github
        domain: github.com
        owner: acme-mirror
        auth:
          protocol: ssh
        settings:
          force_push: true
          ascii_name: true
"#;

    #[test]
    fn test_parse_sample_configuration() {
        let config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.git.engine, GitEngine::Binary);
        assert!(config.git.bare_clone);
        assert_eq!(config.git.timeout_secs, DEFAULT_GIT_TIMEOUT_SECS);

        let sync = &config.configurations[0];
        assert_eq!(sync.source.owner_type, OwnerType::Group);
        assert_eq!(sync.mirrors.len(), 2);

        let github = &sync.mirrors["github"];
        assert_eq!(github.provider_type(), ProviderType::GitHub);
        assert!(github.settings.force_push);
        assert!(github.settings.ascii_name);
        assert!(!github.settings.disable_protection);

        config.validate_all().unwrap();
    }

    #[test]
    fn test_local_mirror_requires_directory() {
        let mut config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.configurations[0]
            .mirrors
            .get_mut("backup")
            .unwrap()
            .provider
            .directory = None;
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_local_source_is_rejected() {
        let mut config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.configurations[0].source = ProviderConfig::local(ProviderType::Directory, "/tmp");
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let mut config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.configurations[0].source.include = Some("([".to_string());
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        let mut config: AppConfig = serde_yaml::from_str(SAMPLE).unwrap();
        config.configurations[0].source.auth.protocol = Some("ftp".to_string());
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_resolve_token_prefers_inline_value() {
        let auth = AuthConfig {
            protocol: None,
            token: Some("inline".to_string()),
            token_env: Some("GPS_TEST_TOKEN_UNUSED".to_string()),
        };
        assert_eq!(auth.resolve_token().as_deref(), Some("inline"));
    }

    #[test]
    fn test_resolve_token_from_environment() {
        std::env::set_var("GPS_TEST_TOKEN_FROM_ENV", "from-env");
        let auth = AuthConfig {
            protocol: None,
            token: None,
            token_env: Some("GPS_TEST_TOKEN_FROM_ENV".to_string()),
        };
        assert_eq!(auth.resolve_token().as_deref(), Some("from-env"));
    }

    #[test]
    fn test_url_rewrite_pair() {
        let mut git = GitConfig::default();
        assert!(git.url_rewrite().is_none());
        git.ssh_url_rewrite_from = Some("https://github.com/".to_string());
        git.ssh_url_rewrite_to = Some("git@github.com:".to_string());
        assert_eq!(git.url_rewrite(), Some(("https://github.com/", "git@github.com:")));
    }
}
