use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use shared::{CommitAuthor, CommitRecord, PrState, PullRequestRecord};

/// Envelope of a GraphQL response. GitHub returns HTTP 200 with an `errors`
/// array (and possibly partial `data`) for per-object failures such as
/// missing permissions.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl<T: DeserializeOwned> GraphQlResponse<T> {
    pub fn parse(raw: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(raw)
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl GraphQlError {
    pub fn is_permission_denied(&self) -> bool {
        self.kind.as_deref() == Some("FORBIDDEN")
    }
}

#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    pub nodes: Option<Vec<Option<T>>>,
}

impl<T> Nodes<T> {
    pub fn into_vec(self) -> Vec<T> {
        self.nodes.unwrap_or_default().into_iter().flatten().collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct OwnerNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryNode {
    pub name: String,
    pub owner: OwnerNode,
}

#[derive(Debug, Deserialize)]
pub struct UserRepositories {
    pub user: Option<RepositoryList>,
}

#[derive(Debug, Deserialize)]
pub struct OrgRepositories {
    pub organization: Option<RepositoryList>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryList {
    pub repositories: Nodes<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
pub struct UserOrganizations {
    pub user: Option<OrganizationList>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationList {
    pub organizations: Nodes<OwnerNode>,
}

#[derive(Debug, Deserialize)]
pub struct UserContributions {
    pub user: Option<ContributionsUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsUser {
    pub contributions_collection: Option<ContributionsCollection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection {
    #[serde(default)]
    pub commit_contributions_by_repository: Vec<RepositoryContribution>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryContribution {
    pub repository: RepositoryNode,
}

#[derive(Debug, Deserialize)]
pub struct RepositoryHistory {
    pub repository: Option<HistoryRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRepository {
    pub default_branch_ref: Option<BranchRef>,
}

#[derive(Debug, Deserialize)]
pub struct BranchRef {
    pub target: Option<BranchTarget>,
}

#[derive(Debug, Deserialize)]
pub struct BranchTarget {
    pub history: Option<Nodes<HistoryNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryNode {
    pub additions: Option<i64>,
    pub deletions: Option<i64>,
    pub committed_date: DateTime<Utc>,
    pub author: Option<HistoryAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryAuthor {
    pub email: Option<String>,
    pub user: Option<OwnerNode>,
}

impl From<HistoryNode> for CommitRecord {
    fn from(node: HistoryNode) -> Self {
        let author = node
            .author
            .map(|author| CommitAuthor {
                login: author.user.map(|user| user.login),
                email: author.email,
            })
            .unwrap_or_default();
        Self {
            additions: node.additions.unwrap_or_default(),
            deletions: node.deletions.unwrap_or_default(),
            committed_at: node.committed_date,
            author,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RepositoryPulls {
    pub repository: Option<PullRequestList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestList {
    pub pull_requests: Nodes<PullRequestNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestNode {
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub author: Option<OwnerNode>,
    pub state: PrState,
}

impl From<PullRequestNode> for PullRequestRecord {
    fn from(node: PullRequestNode) -> Self {
        Self {
            created_at: node.created_at,
            merged_at: node.merged_at,
            author: node.author.map(|a| a.login).unwrap_or_default(),
            state: node.state,
        }
    }
}
