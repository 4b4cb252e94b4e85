//! Visibility translation between hosting providers.
//!
//! GitLab knows `public`, `internal` and `private`; GitHub knows `public`,
//! `private` and (enterprise only) `internal`; Gitea repositories are either
//! `public` or `private`. When mirroring across providers the richer
//! vocabulary collapses onto the simpler one. Unknown pairs or values are
//! errors: a visibility is never guessed.

use crate::common::error::SyncError;
use crate::common::result::SyncResult;
use crate::domain::value_objects::provider_type::ProviderType;

pub const PUBLIC: &str = "public";
pub const PRIVATE: &str = "private";
pub const INTERNAL: &str = "internal";

/// (from, to, [(source visibility, target visibility)])
type VisibilityTable = [(ProviderType, ProviderType, &'static [(&'static str, &'static str)]); 6];

const MAPPINGS: VisibilityTable = [
    (
        ProviderType::GitLab,
        ProviderType::GitHub,
        &[(PUBLIC, PUBLIC), (INTERNAL, PRIVATE), (PRIVATE, PRIVATE)],
    ),
    (
        ProviderType::GitHub,
        ProviderType::GitLab,
        &[(PUBLIC, PUBLIC), (INTERNAL, INTERNAL), (PRIVATE, PRIVATE)],
    ),
    (
        ProviderType::GitLab,
        ProviderType::Gitea,
        &[(PUBLIC, PUBLIC), (INTERNAL, PRIVATE), (PRIVATE, PRIVATE)],
    ),
    (
        ProviderType::Gitea,
        ProviderType::GitLab,
        &[(PUBLIC, PUBLIC), (PRIVATE, PRIVATE)],
    ),
    (
        ProviderType::GitHub,
        ProviderType::Gitea,
        &[(PUBLIC, PUBLIC), (INTERNAL, PRIVATE), (PRIVATE, PRIVATE)],
    ),
    (
        ProviderType::Gitea,
        ProviderType::GitHub,
        &[(PUBLIC, PUBLIC), (PRIVATE, PRIVATE)],
    ),
];

/// Map `visibility` reported by `from` onto the vocabulary of `to`.
pub fn map_visibility(from: ProviderType, to: ProviderType, visibility: &str) -> SyncResult<String> {
    if from == to {
        return Ok(visibility.to_string());
    }

    let normalized = visibility.trim().to_lowercase();

    let (_, _, table) = MAPPINGS
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .ok_or_else(|| {
            SyncError::config_error(format!(
                "no visibility mapping from {} to {}",
                from, to
            ))
        })?;

    table
        .iter()
        .find(|(source, _)| *source == normalized)
        .map(|(_, target)| target.to_string())
        .ok_or_else(|| {
            SyncError::config_error(format!(
                "unknown visibility '{}' when mapping from {} to {}",
                visibility, from, to
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ProviderType; 5] = [
        ProviderType::GitHub,
        ProviderType::GitLab,
        ProviderType::Gitea,
        ProviderType::Directory,
        ProviderType::Archive,
    ];

    #[test]
    fn test_identity_for_same_provider() {
        for provider in ALL {
            for visibility in [PUBLIC, PRIVATE, INTERNAL, "something-else"] {
                assert_eq!(map_visibility(provider, provider, visibility).unwrap(), visibility);
            }
        }
    }

    #[test]
    fn test_gitlab_internal_to_github_is_private() {
        assert_eq!(
            map_visibility(ProviderType::GitLab, ProviderType::GitHub, "internal").unwrap(),
            "private"
        );
    }

    #[test]
    fn test_pairs_are_bidirectional() {
        let remote = [ProviderType::GitHub, ProviderType::GitLab, ProviderType::Gitea];
        for from in remote {
            for to in remote {
                if from != to {
                    assert_eq!(map_visibility(from, to, PUBLIC).unwrap(), PUBLIC);
                    assert_eq!(map_visibility(from, to, PRIVATE).unwrap(), PRIVATE);
                }
            }
        }
    }

    #[test]
    fn test_unknown_pair_is_error() {
        assert!(map_visibility(ProviderType::GitHub, ProviderType::Directory, PUBLIC).is_err());
        assert!(map_visibility(ProviderType::Archive, ProviderType::GitLab, PUBLIC).is_err());
    }

    #[test]
    fn test_unknown_visibility_is_error() {
        assert!(map_visibility(ProviderType::GitLab, ProviderType::GitHub, "secret").is_err());
        assert!(map_visibility(ProviderType::Gitea, ProviderType::GitHub, INTERNAL).is_err());
    }
}
