use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use shared::{CommitRecord, PullRequestRecord, RepositorySource, TimeWindow};

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("commit reports a negative {field} count: {value}")]
    NegativeCount { field: &'static str, value: i64 },
}

/// Commit history of one repository, tagged with where it came from.
#[derive(Debug, Clone)]
pub struct SourceCommits {
    pub source: RepositorySource,
    pub commits: Vec<CommitRecord>,
}

/// Everything one run fetched, grouped by view. Built once per run and
/// discarded with it.
#[derive(Debug, Clone, Default)]
pub struct Activity {
    /// Contributions view: repositories the user committed to, histories
    /// already filtered to the user.
    pub personal: Vec<SourceCommits>,
    /// Owned-repository view: all commits in the user's own repositories.
    pub owned: Vec<SourceCommits>,
    /// Organization repositories, histories filtered to the user.
    pub org: Vec<SourceCommits>,
    pub pull_requests: Vec<PullRequestRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowTotals {
    pub lines_changed: u64,
    pub prs_created: u64,
    pub prs_merged: u64,
}

#[derive(Debug, Clone, Copy)]
pub enum PrCount {
    Created,
    Merged,
}

/// Sum of `additions + deletions` over the records inside the window.
/// Zero for the empty set. Each count is validated non-negative before the
/// sum; a bad input stops the run rather than producing a wrong total.
pub fn sum_line_changes(
    records: &[CommitRecord],
    window: &TimeWindow,
) -> Result<u64, AggregationError> {
    let mut total = 0u64;
    for record in records.iter().filter(|r| window.contains(r.committed_at)) {
        total += validated(record.additions, "additions")?;
        total += validated(record.deletions, "deletions")?;
    }
    Ok(total)
}

fn validated(value: i64, field: &'static str) -> Result<u64, AggregationError> {
    u64::try_from(value).map_err(|_| AggregationError::NegativeCount { field, value })
}

pub fn count_prs(records: &[PullRequestRecord], window: &TimeWindow, mode: PrCount) -> u64 {
    records
        .iter()
        .filter(|pr| match mode {
            PrCount::Created => window.contains(pr.created_at),
            PrCount::Merged => pr.merged_at.is_some_and(|t| window.contains(t)),
        })
        .count() as u64
}

/// `personal + owned - overlap`, clamped at zero. An underflow means the
/// overlap estimate overshot the combined views; never surface a negative
/// count.
pub fn combined_total(personal: u64, owned: u64, overlap: u64) -> u64 {
    match (personal + owned).checked_sub(overlap) {
        Some(total) => total,
        None => {
            warn!(
                "Overlap ({overlap}) exceeds personal ({personal}) + owned ({owned}); \
                 clamping combined total to 0"
            );
            0
        }
    }
}

/// Reduces one run's fetched activity into per-window totals. The same
/// interface serves every source mode: views that were not fetched are
/// empty and the de-duplication degenerates to a plain sum.
pub struct Aggregator<'a> {
    activity: &'a Activity,
    own_prs: Vec<PullRequestRecord>,
}

impl<'a> Aggregator<'a> {
    pub fn new(activity: &'a Activity, username: &str) -> Self {
        let own_prs = activity
            .pull_requests
            .iter()
            .filter(|pr| pr.author.eq_ignore_ascii_case(username))
            .cloned()
            .collect();
        Self { activity, own_prs }
    }

    pub fn totals(&self, window: &TimeWindow) -> Result<WindowTotals, AggregationError> {
        let personal = self.sum_view(&self.activity.personal, window)?;
        let owned = self.sum_view(&self.activity.owned, window)?;
        let overlap = self.overlap(window)?;
        debug!("Window sums: personal={personal} owned={owned} overlap={overlap}");

        let mut lines_changed = combined_total(personal, owned, overlap);

        // Per-organization subtotals live only for this run.
        let mut per_org: HashMap<&str, u64> = HashMap::new();
        for sc in &self.activity.org {
            *per_org.entry(sc.source.owner.as_str()).or_default() +=
                sum_line_changes(&sc.commits, window)?;
        }
        for (org, subtotal) in &per_org {
            debug!("Organization {org} contributed {subtotal} changed lines");
        }
        lines_changed += per_org.values().sum::<u64>();

        Ok(WindowTotals {
            lines_changed,
            prs_created: count_prs(&self.own_prs, window, PrCount::Created),
            prs_merged: count_prs(&self.own_prs, window, PrCount::Merged),
        })
    }

    fn sum_view(
        &self,
        view: &[SourceCommits],
        window: &TimeWindow,
    ) -> Result<u64, AggregationError> {
        let mut total = 0;
        for sc in view {
            total += sum_line_changes(&sc.commits, window)?;
        }
        Ok(total)
    }

    /// Lines from the contributions view that another fetched view also
    /// counted: commits inside an owned repository, and the user's commits
    /// inside a scanned organization repository. Counted once per extra
    /// view, so subtracted once. Views that were not fetched contribute no
    /// overlap.
    fn overlap(&self, window: &TimeWindow) -> Result<u64, AggregationError> {
        let mut total = 0;

        if !self.activity.owned.is_empty() {
            for sc in self
                .activity
                .personal
                .iter()
                .filter(|sc| sc.source.owned_by_user)
            {
                total += sum_line_changes(&sc.commits, window)?;
            }
        }

        if !self.activity.org.is_empty() {
            let org_repos: HashSet<String> = self
                .activity
                .org
                .iter()
                .map(|sc| sc.source.full_name())
                .collect();
            for sc in self.activity.personal.iter().filter(|sc| {
                !sc.source.owned_by_user && org_repos.contains(&sc.source.full_name())
            }) {
                total += sum_line_changes(&sc.commits, window)?;
            }
        }

        Ok(total)
    }
}
