use std::collections::HashSet;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

use shared::{
    CommitRecord, GithubHandle, IdentityMatch, PullRequestRecord, RepositorySource, TimeWindow,
};

use crate::aggregate::{Activity, SourceCommits};
use crate::config::SourceMode;

pub mod types;

use types::*;

/// Fixed page size for every collection. Items beyond the 100 most recent
/// in a window are silently undercounted; this boundary is accepted, not
/// paginated further.
const PAGE_SIZE: u32 = 100;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct GithubClient {
    octocrab: octocrab::Octocrab,
    pub username: GithubHandle,
    identity: IdentityMatch,
}

impl GithubClient {
    pub fn new(
        token: String,
        username: GithubHandle,
        identity: IdentityMatch,
    ) -> anyhow::Result<Self> {
        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token)
            .set_connect_timeout(Some(CONNECT_TIMEOUT))
            .set_read_timeout(Some(READ_TIMEOUT))
            .build()?;
        Ok(Self {
            octocrab,
            username,
            identity,
        })
    }

    /// Fetches every source the configured mode asks for. Per-repository
    /// failures have already been degraded to empty histories by the time
    /// this returns.
    pub async fn collect(
        &self,
        mode: SourceMode,
        repo_owner: &str,
        window: &TimeWindow,
    ) -> Activity {
        let personal_sources = self.contribution_sources(window).await;
        let personal = self.histories(&personal_sources, window, true).await;

        let owned = if mode == SourceMode::Personal {
            Vec::new()
        } else {
            let owned_sources = self.owned_sources(repo_owner).await;
            self.histories(&owned_sources, window, false).await
        };

        let org = if mode == SourceMode::PersonalOwnedOrg {
            let mut sources = Vec::new();
            for org in self.organizations().await {
                sources.extend(self.org_sources(&org).await);
            }
            self.histories(&sources, window, true).await
        } else {
            Vec::new()
        };

        // One PR listing per distinct repository across all views.
        let mut seen = HashSet::new();
        let pr_sources: Vec<&RepositorySource> = personal
            .iter()
            .chain(owned.iter())
            .chain(org.iter())
            .map(|sc| &sc.source)
            .filter(|source| seen.insert(source.full_name()))
            .collect();
        let pull_requests = join_all(pr_sources.iter().map(|source| self.pull_requests(source)))
            .await
            .into_iter()
            .flatten()
            .collect();

        Activity {
            personal,
            owned,
            org,
            pull_requests,
        }
    }

    async fn histories(
        &self,
        sources: &[RepositorySource],
        window: &TimeWindow,
        only_own: bool,
    ) -> Vec<SourceCommits> {
        join_all(sources.iter().map(|source| async move {
            SourceCommits {
                commits: self.commit_history(source, window, only_own).await,
                source: source.clone(),
            }
        }))
        .await
    }

    /// Repositories the user committed to inside the window, per the
    /// platform's contributions view.
    #[instrument(skip(self, window))]
    pub async fn contribution_sources(&self, window: &TimeWindow) -> Vec<RepositorySource> {
        const QUERY: &str = r#"
            query($login: String!, $since: DateTime!, $until: DateTime!, $first: Int!) {
                user(login: $login) {
                    contributionsCollection(from: $since, to: $until) {
                        commitContributionsByRepository(maxRepositories: $first) {
                            repository { name owner { login } }
                        }
                    }
                }
            }"#;
        let variables = json!({
            "login": self.username,
            "since": window.since.to_rfc3339(),
            "until": window.until.to_rfc3339(),
            "first": PAGE_SIZE,
        });

        let Some(data) = self
            .query::<UserContributions>("contributions view", QUERY, variables)
            .await
        else {
            return Vec::new();
        };

        data.user
            .and_then(|user| user.contributions_collection)
            .map(|collection| collection.commit_contributions_by_repository)
            .unwrap_or_default()
            .into_iter()
            .map(|contribution| self.source_from_node(contribution.repository))
            .collect()
    }

    /// Non-fork repositories with OWNER affiliation, first page only.
    #[instrument(skip(self))]
    pub async fn owned_sources(&self, owner: &str) -> Vec<RepositorySource> {
        const QUERY: &str = r#"
            query($login: String!, $first: Int!) {
                user(login: $login) {
                    repositories(ownerAffiliations: OWNER, isFork: false, first: $first) {
                        nodes { name owner { login } }
                    }
                }
            }"#;
        let variables = json!({ "login": owner, "first": PAGE_SIZE });

        let Some(data) = self
            .query::<UserRepositories>("owned repositories", QUERY, variables)
            .await
        else {
            return Vec::new();
        };

        data.user
            .map(|user| user.repositories.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(|node| self.source_from_node(node))
            .collect()
    }

    /// Organizations the user belongs to, first page only.
    #[instrument(skip(self))]
    pub async fn organizations(&self) -> Vec<String> {
        const QUERY: &str = r#"
            query($login: String!, $first: Int!) {
                user(login: $login) {
                    organizations(first: $first) {
                        nodes { login }
                    }
                }
            }"#;
        let variables = json!({ "login": self.username, "first": PAGE_SIZE });

        let Some(data) = self
            .query::<UserOrganizations>("organization memberships", QUERY, variables)
            .await
        else {
            return Vec::new();
        };

        data.user
            .map(|user| user.organizations.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(|node| node.login)
            .collect()
    }

    /// Non-fork repositories owned by an organization, first page only.
    #[instrument(skip(self))]
    pub async fn org_sources(&self, org: &str) -> Vec<RepositorySource> {
        const QUERY: &str = r#"
            query($login: String!, $first: Int!) {
                organization(login: $login) {
                    repositories(isFork: false, first: $first) {
                        nodes { name owner { login } }
                    }
                }
            }"#;
        let variables = json!({ "login": org, "first": PAGE_SIZE });

        let Some(data) = self
            .query::<OrgRepositories>(&format!("repositories of {org}"), QUERY, variables)
            .await
        else {
            return Vec::new();
        };

        data.organization
            .map(|org| org.repositories.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(|node| self.source_from_node(node))
            .collect()
    }

    /// Up to 100 default-branch commits since the window start. With
    /// `only_own`, keeps only commits attributed to the target user by the
    /// configured identity matcher.
    #[instrument(skip(self, window), fields(repo = %source.full_name()))]
    pub async fn commit_history(
        &self,
        source: &RepositorySource,
        window: &TimeWindow,
        only_own: bool,
    ) -> Vec<CommitRecord> {
        const QUERY: &str = r#"
            query($owner: String!, $name: String!, $since: GitTimestamp!, $first: Int!) {
                repository(owner: $owner, name: $name) {
                    defaultBranchRef {
                        target {
                            ... on Commit {
                                history(first: $first, since: $since) {
                                    nodes {
                                        additions
                                        deletions
                                        committedDate
                                        author { email user { login } }
                                    }
                                }
                            }
                        }
                    }
                }
            }"#;
        let variables = json!({
            "owner": source.owner,
            "name": source.name,
            "since": window.since.to_rfc3339(),
            "first": PAGE_SIZE,
        });

        let scope = format!("commit history of {}", source.full_name());
        let Some(data) = self.query::<RepositoryHistory>(&scope, QUERY, variables).await else {
            return Vec::new();
        };

        let Some(history) = data
            .repository
            .and_then(|repo| repo.default_branch_ref)
            .and_then(|branch| branch.target)
            .and_then(|target| target.history)
        else {
            // Empty repositories have no default branch; anything else odd
            // also counts as zero.
            debug!("No default-branch history for {}", source.full_name());
            return Vec::new();
        };

        let mut commits: Vec<CommitRecord> =
            history.into_vec().into_iter().map(Into::into).collect();
        if only_own {
            commits.retain(|commit| self.identity.matches(&commit.author, &self.username));
        }
        commits
    }

    /// Up to 100 pull requests, newest first, in any state. The caller
    /// filters by window and author.
    #[instrument(skip(self), fields(repo = %source.full_name()))]
    pub async fn pull_requests(&self, source: &RepositorySource) -> Vec<PullRequestRecord> {
        const QUERY: &str = r#"
            query($owner: String!, $name: String!, $first: Int!) {
                repository(owner: $owner, name: $name) {
                    pullRequests(states: [OPEN, CLOSED, MERGED], first: $first,
                                 orderBy: {field: CREATED_AT, direction: DESC}) {
                        nodes { createdAt mergedAt state author { login } }
                    }
                }
            }"#;
        let variables = json!({
            "owner": source.owner,
            "name": source.name,
            "first": PAGE_SIZE,
        });

        let scope = format!("pull requests of {}", source.full_name());
        let Some(data) = self.query::<RepositoryPulls>(&scope, QUERY, variables).await else {
            return Vec::new();
        };

        data.repository
            .map(|repo| repo.pull_requests.into_vec())
            .unwrap_or_default()
            .into_iter()
            .map(Into::into)
            .collect()
    }

    /// Issues one GraphQL request and degrades every failure to `None` with
    /// a warning: a broken repository must contribute zero, never abort the
    /// run.
    async fn query<T: DeserializeOwned>(
        &self,
        scope: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Option<T> {
        let payload = json!({ "query": query, "variables": variables });
        let raw: serde_json::Value = match self.octocrab.graphql(&payload).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to fetch {scope}, counting it as zero: {e}");
                return None;
            }
        };
        debug!("Response for {scope}: {raw}");

        let parsed = match GraphQlResponse::<T>::parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unexpected response shape for {scope}, counting it as zero: {e}");
                return None;
            }
        };

        if !parsed.errors.is_empty() {
            if parsed.errors.iter().any(GraphQlError::is_permission_denied) {
                warn!("No permission to read {scope}, counting it as zero");
            } else {
                let messages: Vec<&str> = parsed
                    .errors
                    .iter()
                    .filter_map(|e| e.message.as_deref())
                    .collect();
                warn!("Errors reported for {scope}: {messages:?}");
            }
        }

        // Partial data may still be usable alongside errors.
        parsed.data
    }

    fn source_from_node(&self, node: RepositoryNode) -> RepositorySource {
        let owned_by_user = node.owner.login.eq_ignore_ascii_case(&self.username);
        RepositorySource {
            owner: node.owner.login,
            name: node.name,
            owned_by_user,
        }
    }
}
