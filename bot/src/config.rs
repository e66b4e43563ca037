use serde::Deserialize;
use thiserror::Error;

use shared::{Goals, IdentityMatch};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
    #[error("{var} must be a positive integer, got {value}")]
    NonPositiveGoal { var: &'static str, value: u32 },
    #[error("WEBHOOK_URL is not a valid URL: {0}")]
    InvalidWebhookUrl(url::ParseError),
}

/// Which views of the user's activity are fetched. The de-duplication step
/// only runs when both the contributions view and the owned-repository view
/// are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMode {
    /// Contributions view only; the combined total is a plain sum.
    Personal,
    /// Contributions view plus owned repositories, overlap subtracted.
    #[default]
    PersonalOwned,
    /// Also scans organization repositories, author-filtered.
    PersonalOwnedOrg,
}

#[derive(Deserialize)]
struct Env {
    github_token: String,
    github_username: String,
    repo_owner: Option<String>,
    monthly_code_goal: u32,
    monthly_pr_create_goal: u32,
    monthly_pr_merge_goal: u32,
    webhook_url: String,
    #[serde(default)]
    source_mode: SourceMode,
    #[serde(default)]
    identity_match: IdentityMatch,
    #[serde(default)]
    debug: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub github_token: String,
    pub username: String,
    pub repo_owner: String,
    pub goals: Goals,
    pub webhook_url: String,
    pub source_mode: SourceMode,
    pub identity_match: IdentityMatch,
    pub debug: bool,
}

impl Config {
    /// Reads and validates the environment. Called before any network
    /// request; a missing or malformed value stops the run here.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_parsed(envy::from_env::<Env>()?)
    }

    fn from_parsed(env: Env) -> Result<Self, ConfigError> {
        let goals = Goals {
            code_changes: positive("MONTHLY_CODE_GOAL", env.monthly_code_goal)?,
            prs_created: positive("MONTHLY_PR_CREATE_GOAL", env.monthly_pr_create_goal)?,
            prs_merged: positive("MONTHLY_PR_MERGE_GOAL", env.monthly_pr_merge_goal)?,
        };
        url::Url::parse(&env.webhook_url).map_err(ConfigError::InvalidWebhookUrl)?;

        Ok(Self {
            github_token: env.github_token,
            repo_owner: env
                .repo_owner
                .unwrap_or_else(|| env.github_username.clone()),
            username: env.github_username,
            goals,
            webhook_url: env.webhook_url,
            source_mode: env.source_mode,
            identity_match: env.identity_match,
            debug: env.debug,
        })
    }
}

fn positive(var: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        Err(ConfigError::NonPositiveGoal { var, value })
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> Vec<(String, String)> {
        [
            ("GITHUB_TOKEN", "token"),
            ("GITHUB_USERNAME", "octocat"),
            ("MONTHLY_CODE_GOAL", "1000"),
            ("MONTHLY_PR_CREATE_GOAL", "10"),
            ("MONTHLY_PR_MERGE_GOAL", "5"),
            ("WEBHOOK_URL", "https://hooks.example.com/services/T000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn parse(vars: Vec<(String, String)>) -> Result<Config, ConfigError> {
        Config::from_parsed(envy::from_iter::<_, Env>(vars)?)
    }

    #[test]
    fn full_configuration_applies_defaults() {
        let config = parse(base_vars()).unwrap();
        assert_eq!(config.username, "octocat");
        assert_eq!(config.repo_owner, "octocat");
        assert_eq!(config.goals.code_changes, 1000);
        assert_eq!(config.source_mode, SourceMode::PersonalOwned);
        assert_eq!(config.identity_match, IdentityMatch::Login);
        assert!(!config.debug);
    }

    #[test]
    fn missing_variable_is_rejected() {
        let vars = base_vars()
            .into_iter()
            .filter(|(k, _)| k != "GITHUB_USERNAME")
            .collect();
        assert!(matches!(parse(vars), Err(ConfigError::Env(_))));
    }

    #[test]
    fn zero_goal_names_the_variable() {
        let vars = base_vars()
            .into_iter()
            .map(|(k, v)| {
                if k == "MONTHLY_PR_MERGE_GOAL" {
                    (k, "0".to_string())
                } else {
                    (k, v)
                }
            })
            .collect();
        let err = parse(vars).unwrap_err();
        assert_eq!(
            err.to_string(),
            "MONTHLY_PR_MERGE_GOAL must be a positive integer, got 0"
        );
    }

    #[test]
    fn malformed_goal_is_rejected() {
        let vars = base_vars()
            .into_iter()
            .map(|(k, v)| {
                if k == "MONTHLY_CODE_GOAL" {
                    (k, "lots".to_string())
                } else {
                    (k, v)
                }
            })
            .collect();
        assert!(matches!(parse(vars), Err(ConfigError::Env(_))));
    }

    #[test]
    fn invalid_webhook_url_is_rejected() {
        let vars = base_vars()
            .into_iter()
            .map(|(k, v)| {
                if k == "WEBHOOK_URL" {
                    (k, "not a url".to_string())
                } else {
                    (k, v)
                }
            })
            .collect();
        assert!(matches!(parse(vars), Err(ConfigError::InvalidWebhookUrl(_))));
    }

    #[test]
    fn overrides_are_honored() {
        let mut vars = base_vars();
        vars.push(("REPO_OWNER".to_string(), "octo-org".to_string()));
        vars.push(("SOURCE_MODE".to_string(), "personal-owned-org".to_string()));
        vars.push(("IDENTITY_MATCH".to_string(), "email-contains".to_string()));
        vars.push(("DEBUG".to_string(), "true".to_string()));
        let config = parse(vars).unwrap();
        assert_eq!(config.repo_owner, "octo-org");
        assert_eq!(config.source_mode, SourceMode::PersonalOwnedOrg);
        assert_eq!(config.identity_match, IdentityMatch::EmailContains);
        assert!(config.debug);
    }
}
