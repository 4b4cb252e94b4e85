use regex::Regex;
use std::sync::OnceLock;

use crate::domain::value_objects::provider_type::ProviderType;

fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9-]").expect("valid regex"))
}

fn repeated_hyphens() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-{2,}").expect("valid regex"))
}

fn github_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("valid regex"))
}

fn gitlab_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\- ]{0,254}$").expect("valid regex"))
}

/// Reduce a repository name to `[A-Za-z0-9-]`.
///
/// Whitespace becomes a hyphen, every other character outside the allowed
/// set is dropped, runs of hyphens collapse to one and leading/trailing
/// hyphens are trimmed: `"Repo One!"` becomes `"Repo-One"`.
pub fn sanitize_ascii_name(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    let stripped = disallowed_chars().replace_all(&spaced, "");
    let collapsed = repeated_hyphens().replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Whether `name` is acceptable as a repository name on `provider`.
///
/// Local targets only need a name that is a single, non-special path
/// component.
pub fn is_valid_name_for(provider: ProviderType, name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }

    match provider {
        ProviderType::GitHub => github_name().is_match(name),
        ProviderType::GitLab => gitlab_name().is_match(name) && !name.ends_with(".git"),
        ProviderType::Gitea => {
            github_name().is_match(name) && !name.ends_with(".git") && !name.ends_with(".wiki")
        }
        ProviderType::Directory | ProviderType::Archive => {
            !name.contains('/') && !name.contains('\\') && !name.contains('\0')
        }
    }
}
