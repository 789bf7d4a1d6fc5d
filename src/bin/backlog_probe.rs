use clap::Parser;
use sprint_metrics::domain::ports::ScrumBackend;
use sprint_metrics::utils::logger;
use sprint_metrics::{MetricsConfig, RestBackend};

#[derive(Parser)]
#[command(name = "backlog-probe")]
#[command(about = "Call every backend endpoint for a sprint and summarize what comes back")]
struct Args {
    /// Sprint identifier
    #[arg(long)]
    sprint_id: String,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Backend base URL (overrides the config file)
    #[arg(long)]
    api_base: Option<String>,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(long = "header")]
    headers: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> sprint_metrics::Result<MetricsConfig> {
    let mut config = match (&args.config, &args.api_base) {
        (Some(path), _) => MetricsConfig::from_file(path)?,
        (None, Some(base)) => MetricsConfig::with_base_url(base.clone()),
        (None, None) => {
            return Err(sprint_metrics::MetricsError::MissingConfigError {
                field: "--config or --api-base".to_string(),
            })
        }
    };
    if let Some(base) = &args.api_base {
        config.source.base_url = base.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose, None);

    let config = load_config(&args)?;
    let mut backend = RestBackend::from_config(&config.source)?;
    for header in &args.headers {
        match header.split_once(':') {
            Some((name, value)) => backend = backend.with_header(name.trim(), value.trim()),
            None => anyhow::bail!("invalid header '{}', expected 'Name: value'", header),
        }
    }

    println!("🔎 Probing {} for sprint {}", config.source.base_url, args.sprint_id);

    match backend.fetch_sprint(&args.sprint_id).await {
        Ok(sprint) => println!(
            "  ✅ sprint: '{}' {:?} ({:?} → {:?})",
            sprint.name, sprint.status, sprint.start_date, sprint.end_date
        ),
        Err(e) => println!("  ❌ sprint: {}", e),
    }

    match backend.fetch_sprint_items(&args.sprint_id).await {
        Ok(items) => {
            let assigned = items.iter().filter(|i| i.assigned_to.is_some()).count();
            let points: f64 = items.iter().map(|i| i.story_points).sum();
            println!(
                "  ✅ backlog: {} items ({} assigned), {} story points",
                items.len(),
                assigned,
                points
            );
        }
        Err(e) => println!("  ❌ backlog: {}", e),
    }

    match backend.fetch_team_members().await {
        Ok(team) => println!("  ✅ team: {} members", team.len()),
        Err(e) => println!("  ❌ team: {}", e),
    }

    match backend.fetch_burndown(&args.sprint_id).await {
        Ok(points) if points.is_empty() => println!("  ➖ burndown: none recorded"),
        Ok(points) => println!("  ✅ burndown: {} daily snapshots", points.len()),
        Err(e) => println!("  ❌ burndown: {}", e),
    }

    match backend.fetch_bug_stats(&args.sprint_id).await {
        Ok(Some(stats)) => println!(
            "  ✅ bugs: {} total, {} open, {} resolved",
            stats.total, stats.open, stats.resolved
        ),
        Ok(None) => println!("  ➖ bugs: no statistics"),
        Err(e) => println!("  ❌ bugs: {}", e),
    }

    Ok(())
}
