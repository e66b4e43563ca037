use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::GithubHandle;

#[derive(Debug, Clone, Default)]
pub struct CommitAuthor {
    pub login: Option<GithubHandle>,
    pub email: Option<String>,
}

/// One commit as reported by the platform. Counts stay signed until the
/// aggregation step validates them.
#[derive(Debug, Clone)]
pub struct CommitRecord {
    pub additions: i64,
    pub deletions: i64,
    pub committed_at: DateTime<Utc>,
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

#[derive(Debug, Clone)]
pub struct PullRequestRecord {
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author: GithubHandle,
    pub state: PrState,
}

/// A repository whose history is fetched. In repositories owned by the
/// target user every commit counts; organization repositories only count
/// commits the user authored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySource {
    pub owner: String,
    pub name: String,
    pub owned_by_user: bool,
}

impl RepositorySource {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Monthly targets, each validated positive at configuration time.
#[derive(Debug, Clone, Copy)]
pub struct Goals {
    pub code_changes: u32,
    pub prs_created: u32,
    pub prs_merged: u32,
}

/// How commit authorship is attributed to the target user.
///
/// `Login` compares the platform identity attached to the commit.
/// `EmailContains` reproduces the older email-substring heuristic: it misses
/// commits whose email does not contain the username and over-matches when
/// the username appears in someone else's address. Kept selectable rather
/// than silently picking one behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityMatch {
    #[default]
    Login,
    EmailContains,
}

impl IdentityMatch {
    pub fn matches(&self, author: &CommitAuthor, user: &str) -> bool {
        match self {
            IdentityMatch::Login => author
                .login
                .as_deref()
                .is_some_and(|login| login.eq_ignore_ascii_case(user)),
            IdentityMatch::EmailContains => author
                .email
                .as_deref()
                .is_some_and(|email| email.contains(user)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(login: Option<&str>, email: Option<&str>) -> CommitAuthor {
        CommitAuthor {
            login: login.map(str::to_string),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn login_match_ignores_case_and_requires_an_identity() {
        let matcher = IdentityMatch::Login;
        assert!(matcher.matches(&author(Some("Octocat"), None), "octocat"));
        assert!(!matcher.matches(&author(None, Some("octocat@github.com")), "octocat"));
        assert!(!matcher.matches(&author(Some("someone"), None), "octocat"));
    }

    #[test]
    fn email_match_is_a_substring_heuristic() {
        let matcher = IdentityMatch::EmailContains;
        assert!(matcher.matches(&author(None, Some("octocat@github.com")), "octocat"));
        // Known over-match: the username inside an unrelated address.
        assert!(matcher.matches(&author(None, Some("not-octocat@example.com")), "octocat"));
        assert!(!matcher.matches(&author(Some("octocat"), None), "octocat"));
    }

    #[test]
    fn full_name_joins_owner_and_repo() {
        let source = RepositorySource {
            owner: "octo-org".into(),
            name: "tools".into(),
            owned_by_user: false,
        };
        assert_eq!(source.full_name(), "octo-org/tools");
    }
}
