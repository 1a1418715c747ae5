//! Loyalty Admin - command-line entry point

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use loyalty_cache::{CacheConfig, QueryCache};
use loyalty_core::{AdjustmentRequest, Profile, Rank};
use loyalty_networking::api::{adjust_points_mutation, fetch_profiles, fetch_ranks};
use loyalty_networking::{ClientConfig, LoyaltyApi, LoyaltyClient};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loyalty=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let api = build_api(&cli)?;

    match cli.command {
        Commands::Ranks => {
            let ranks = fetch_ranks(&api).await.context("failed to load ranks")?;
            print_ranks(&ranks, cli.json)?;
        }
        Commands::Profiles => {
            let profiles = fetch_profiles(&api).await.context("failed to load profiles")?;
            print_profiles(&profiles, cli.json)?;
        }
        Commands::Adjust { id, delta, reason, reference } => {
            // warm the profile list so the refetch after the adjustment is visible
            fetch_profiles(&api).await.context("failed to load profiles")?;

            let mut request = AdjustmentRequest::new(id, delta, reason);
            request.reference = reference;

            tracing::info!(profile_id = id, delta, "submitting point adjustment");
            let mutation = adjust_points_mutation(&api);
            let response = mutation
                .mutate(request)
                .await
                .with_context(|| format!("adjustment of profile {} failed", id))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&response.0)?);
            } else {
                println!("Adjusted profile {} by {} points", id, delta);
            }

            let profiles = fetch_profiles(&api).await.context("failed to reload profiles")?;
            print_profiles(&profiles, cli.json)?;
        }
    }

    Ok(())
}

fn build_api(cli: &Cli) -> anyhow::Result<LoyaltyApi> {
    let mut client_config = ClientConfig::from_env().context("invalid client configuration")?;
    if let Some(url) = &cli.base_url {
        client_config.base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        client_config.api_token = Some(token.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        client_config.timeout = Duration::from_secs(secs);
    }

    let mut cache_config = CacheConfig::from_env().context("invalid cache configuration")?;
    if let Some(secs) = cli.stale_secs {
        cache_config.stale_time = Duration::from_secs(secs);
    }

    let client = LoyaltyClient::new(&client_config).context("failed to create HTTP client")?;
    tracing::debug!(base_url = client.base_url(), "loyalty client ready");

    Ok(LoyaltyApi::new(
        Arc::new(client),
        Arc::new(QueryCache::new(cache_config)),
    ))
}

fn print_ranks(ranks: &[Rank], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(ranks)?);
        return Ok(());
    }
    for rank in ranks {
        let id = rank.id.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        println!("{:>6}  {}", id, rank.name.as_deref().unwrap_or("(unnamed)"));
    }
    Ok(())
}

fn print_profiles(profiles: &[Profile], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profiles)?);
        return Ok(());
    }
    for profile in profiles {
        let id = profile.id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        let points = profile.points.map(|v| v.to_string()).unwrap_or_else(|| "?".to_string());
        println!("{:>6}  {:>10} pts", id, points);
    }
    Ok(())
}
