mod bootstrap_helpers;
mod cli_args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use redbot_runtime::{run_slack_bridge, TrackerClient};

use crate::bootstrap_helpers::init_tracing;
use crate::cli_args::Cli;

async fn run_cli(cli: Cli) -> Result<()> {
    let bot_config = Arc::new(cli.bot_config());
    let tracker: Arc<dyn TrackerClient> = Arc::new(cli.redmine_client()?);
    tracing::info!(
        tracker = cli.redmine_host.as_str(),
        statuses = bot_config.statuses.keyword_list().as_str(),
        "starting redbot"
    );
    run_slack_bridge(cli.slack_bridge_config(), bot_config, tracker).await
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}
