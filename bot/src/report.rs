use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use shared::{webhook::Message, Goals};

use crate::aggregate::WindowTotals;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("goal must be positive, got {0}")]
    NonPositiveGoal(u32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub current: u64,
    pub goal: u32,
    pub percent: f64,
}

impl Progress {
    pub fn rendered(&self) -> String {
        format!("{}/{} ({:.2}%)", self.current, self.goal, self.percent)
    }
}

/// Percent of goal reached, rounded to two decimal places. A zero goal is
/// rejected before the division.
pub fn compute_progress(current: u64, goal: u32) -> Result<Progress, DomainError> {
    if goal == 0 {
        return Err(DomainError::NonPositiveGoal(goal));
    }
    let percent = (current as f64 * 100.0 / goal as f64 * 100.0).round() / 100.0;
    Ok(Progress {
        current,
        goal,
        percent,
    })
}

/// Days left in the month, inclusive of today.
pub fn remaining_days_in_month(today: NaiveDate) -> u32 {
    days_in_month(today) - today.day() + 1
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

pub fn render(
    today: NaiveDate,
    daily: &WindowTotals,
    monthly: &WindowTotals,
    goals: &Goals,
) -> Result<Message, DomainError> {
    let code = compute_progress(monthly.lines_changed, goals.code_changes)?;
    let created = compute_progress(monthly.prs_created, goals.prs_created)?;
    let merged = compute_progress(monthly.prs_merged, goals.prs_merged)?;

    let mut text = String::from("GitHub activity report\n");
    text.push_str(&format!(
        "Today: {} lines changed, {} PRs created, {} PRs merged\n",
        daily.lines_changed, daily.prs_created, daily.prs_merged
    ));
    text.push_str("This month:\n");
    text.push_str(&format!("- Code changes: {}\n", code.rendered()));
    text.push_str(&format!("- PRs created: {}\n", created.rendered()));
    text.push_str(&format!("- PRs merged: {}\n", merged.rendered()));
    text.push_str(&format!(
        "{} days left in the month\n",
        remaining_days_in_month(today)
    ));

    Ok(Message { text })
}
