use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use commit_goals_bot::{aggregate::Aggregator, api::GithubClient, config::Config, report};
use shared::{webhook::WebhookClient, TimeWindow};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    // Configuration is validated before any network call.
    let config = Config::from_env()?;

    let default_filter = if config.debug { "debug" } else { "info" };
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    let github = GithubClient::new(
        config.github_token.clone(),
        config.username.clone(),
        config.identity_match,
    )?;
    let webhook = WebhookClient::new(config.webhook_url.clone(), WEBHOOK_TIMEOUT)?;

    let now = Utc::now();
    let daily = TimeWindow::trailing_day(now);
    let monthly = TimeWindow::month_to_date(now);
    let horizon = daily.union(&monthly);

    info!(
        "Collecting activity for {} since {}",
        config.username, horizon.since
    );
    let activity = github
        .collect(config.source_mode, &config.repo_owner, &horizon)
        .await;
    debug!(
        "Fetched {} personal, {} owned and {} organization repository histories, {} pull requests",
        activity.personal.len(),
        activity.owned.len(),
        activity.org.len(),
        activity.pull_requests.len()
    );

    let aggregator = Aggregator::new(&activity, &config.username);
    let today_totals = aggregator.totals(&daily)?;
    let month_totals = aggregator.totals(&monthly)?;

    let message = report::render(
        now.date_naive(),
        &today_totals,
        &month_totals,
        &config.goals,
    )?;
    info!("Delivering report:\n{}", message.text);
    webhook.deliver(&message).await?;
    info!("Report delivered");

    Ok(())
}
