use clap::Parser;
use sprint_metrics::core::cache::MetricsCache;
use sprint_metrics::core::report::render_json;
use sprint_metrics::domain::ports::{ConfigProvider, Pipeline};
use sprint_metrics::utils::{logger, validation::Validate};
use sprint_metrics::{
    CliArgs, FixedClock, LocalStorage, MetricsEngine, MetricsError, RestBackend,
    SprintMetricsPipeline,
};

fn fail(e: &MetricsError) -> ! {
    tracing::error!(
        "❌ Sprint metrics run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 設定檔要先讀，才知道日誌格式
    let config = args.resolve_config();
    let (level, json_logs) = match &config {
        Ok(config) => (config.log_level().map(String::from), config.json_logs()),
        Err(_) => (None, false),
    };
    if json_logs {
        logger::init_json_logger(level.as_deref());
    } else {
        logger::init_cli_logger(args.verbose, level.as_deref());
    }

    tracing::info!("🚀 Starting sprint-metrics for sprint {}", args.sprint_id);
    let config = match config {
        Ok(config) => config,
        Err(e) => fail(&e),
    };
    if args.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        fail(&e);
    }

    let clock = match args.now.as_deref() {
        Some(raw) => match FixedClock::parse(raw) {
            Some(clock) => Some(clock),
            None => fail(&MetricsError::InvalidConfigValueError {
                field: "--now".to_string(),
                value: raw.to_string(),
                reason: "Expected RFC 3339 or YYYY-MM-DD".to_string(),
            }),
        },
        None => None,
    };

    let backend = match RestBackend::from_config(&config.source) {
        Ok(backend) => backend,
        Err(e) => fail(&e),
    };
    let monitor_enabled = args.monitor_enabled(&config);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let cache = match (config.cache_enabled(), config.cache_capacity()) {
        (true, Some(capacity)) => Some(MetricsCache::new(capacity)),
        _ => None,
    };

    let storage = LocalStorage::new(config.output_path().to_string());
    let mut pipeline = SprintMetricsPipeline::new(backend, storage, config, args.sprint_id.clone());
    if let Some(clock) = clock {
        tracing::info!("🕒 Using frozen clock: {}", clock.0);
        pipeline = pipeline.with_clock(clock);
    }
    if let Some(cache) = cache {
        pipeline = pipeline.with_cache(cache);
    }

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be written");
        let snapshot = match pipeline.extract().await {
            Ok(snapshot) => snapshot,
            Err(e) => fail(&e),
        };
        let metrics = match pipeline.transform(snapshot).await {
            Ok(metrics) => metrics,
            Err(e) => fail(&e),
        };
        let rendered = render_json(&metrics)?;
        println!("{}", String::from_utf8_lossy(&rendered));
        return Ok(());
    }

    let engine = MetricsEngine::new_with_monitoring(pipeline, monitor_enabled);
    match engine.run().await {
        Ok(outcome) => {
            tracing::info!("✅ Sprint metrics completed successfully!");
            println!("✅ Sprint metrics completed successfully!");
            println!(
                "📊 {}/{} items done ({}%), velocity {} points, {} days remaining",
                outcome.metrics.completed,
                outcome.metrics.planned,
                outcome.metrics.completion_percentage,
                outcome.metrics.velocity,
                outcome.metrics.days_remaining
            );
            println!("📁 Output saved to: {}", outcome.output_path);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
