use clap::Parser;
use std::time::Duration;
use tenant_optimizer::core::report;
use tenant_optimizer::domain::model::ScanKind;
use tenant_optimizer::domain::ports::{Classifier, ResourceManager};
use tenant_optimizer::utils::monitor::SystemMonitor;
use tenant_optimizer::utils::validation::{self, Validate};
use tenant_optimizer::utils::{error::ErrorSeverity, logger};
use tenant_optimizer::{
    ArmClient, CliConfig, Command, DeleteBatch, LocalStorage, OpenAiClient, ResourceGraphClient,
    Scanner, TomlConfig, UpgradeOrchestrator,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting tenant-optimizer CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 查詢指引不需要 Azure 權杖
    if let Command::Guidance { resource_type } = &cli.command {
        print_guidance(resource_type);
        return Ok(());
    }

    let config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load {}: {}", cli.config, e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(3);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(3);
    }

    let monitor = SystemMonitor::new(cli.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    if let Err(e) = run(cli.command, &config, &monitor).await {
        // 記錄詳細錯誤信息
        tracing::error!(
            "❌ Operation failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,      // 警告,但成功
            ErrorSeverity::Medium => 2,   // 重試錯誤
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    monitor.log_final_stats();
    Ok(())
}

async fn run(
    command: Command,
    config: &TomlConfig,
    monitor: &SystemMonitor,
) -> tenant_optimizer::Result<()> {
    let arm = ArmClient::with_options(
        config.management_endpoint(),
        &config.azure.token,
        config.request_timeout(),
        config.retry_policy(),
    )?;

    match command {
        Command::Scan {
            kind,
            subscriptions,
            no_ai,
        } => {
            let kind: ScanKind = kind.into();
            let subscriptions = resolve_subscriptions(subscriptions, config, &arm).await?;

            let graph = ResourceGraphClient::with_options(
                config.management_endpoint(),
                &config.azure.token,
                config.request_timeout(),
                config.retry_policy(),
            )?;

            let mut scanner = Scanner::new(graph).with_limit(config.scan_limit());
            if let Some(classifier) = build_classifier(config, no_ai)? {
                scanner = scanner.with_classifier(classifier);
            }

            let scan_report = scanner.scan(kind, &subscriptions).await?;
            monitor.log_stats("scan");

            let storage = LocalStorage::new(config.output_path().to_string());
            let path = report::timestamped_path("", &format!("{}_scan", kind.as_str()));
            report::write_json_report(&storage, &path, &scan_report).await?;

            println!(
                "✅ Scan complete: {} {} finding(s) ({})",
                scan_report.total,
                kind.as_str(),
                scan_report.message
            );
            for finding in &scan_report.findings {
                let cost = finding
                    .estimated_monthly_cost
                    .map(|c| format!(" (~${:.2}/month)", c))
                    .unwrap_or_default();
                println!(
                    "  [{:?}] {} — {}{}",
                    finding.priority, finding.resource.id, finding.issue, cost
                );
            }
            println!("📁 Report saved to {}/{}", config.output_path(), path);
        }

        Command::Delete { ids } => {
            let batch = DeleteBatch::new(&arm).with_throttle(config.throttle_delay());
            let delete_report = batch.delete_resources(&ids).await;
            monitor.log_stats("delete");

            let storage = LocalStorage::new(config.output_path().to_string());
            let path = report::timestamped_path("", "delete");
            report::write_json_report(&storage, &path, &delete_report).await?;

            println!(
                "🗑️ Deleted {} of {} resource(s)",
                delete_report.succeeded,
                delete_report.deleted.len()
            );
            for outcome in delete_report.deleted.iter().filter(|o| !o.success) {
                println!(
                    "  ❌ {}: {}",
                    outcome.id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            if delete_report.failed > 0 {
                std::process::exit(1);
            }
        }

        Command::Upgrade { ids } => {
            let orchestrator =
                UpgradeOrchestrator::new(&arm).with_throttle(config.throttle_delay());
            let upgrade_report = orchestrator.upgrade_resources(&ids).await;
            monitor.log_stats("upgrade");

            let storage = LocalStorage::new(config.output_path().to_string());
            let path = report::timestamped_path("", "upgrade");
            report::write_json_report(&storage, &path, &upgrade_report).await?;

            println!(
                "🔧 Upgrades: {} ok, {} skipped, {} failed",
                upgrade_report.successful_upgrades,
                upgrade_report.skipped_upgrades,
                upgrade_report.failed_upgrades
            );
            for outcome in &upgrade_report.individual_results {
                if let Some(error) = &outcome.error {
                    println!("  ❌ {}: {}", outcome.resource_id, error);
                }
                for warning in &outcome.warnings {
                    println!("  ⚠️ {}: {}", outcome.resource_id, warning);
                }
            }
            if !upgrade_report.success {
                std::process::exit(1);
            }
        }

        // 已於設定載入前處理,不會進到這裡
        Command::Guidance { .. } => {}

        Command::Subscriptions => {
            let subscriptions = arm.list_subscriptions().await?;
            println!("📋 {} subscription(s) visible:", subscriptions.len());
            for subscription in subscriptions {
                println!(
                    "  {} — {} ({})",
                    subscription.subscription_id, subscription.display_name, subscription.state
                );
            }
        }
    }

    Ok(())
}

/// CLI override wins, then the config file, then every subscription the
/// token can see.
async fn resolve_subscriptions(
    from_cli: Vec<String>,
    config: &TomlConfig,
    arm: &ArmClient,
) -> tenant_optimizer::Result<Vec<String>> {
    if !from_cli.is_empty() {
        return Ok(from_cli);
    }
    if !config.subscriptions().is_empty() {
        return Ok(config.subscriptions().to_vec());
    }

    tracing::info!("No subscriptions configured, discovering via ARM");
    let discovered = arm.list_subscriptions().await?;
    Ok(discovered
        .into_iter()
        .map(|s| s.subscription_id)
        .collect())
}

fn print_guidance(resource_type: &str) {
    let guidance = tenant_optimizer::KnowledgeBase::new().upgrade_guidance(resource_type);
    println!("📖 {}", guidance.title);
    println!("   Urgency: {}", guidance.urgency);
    println!("   Steps:");
    for (index, step) in guidance.steps.iter().enumerate() {
        println!("     {}. {}", index + 1, step);
    }
    println!("   Considerations:");
    for consideration in &guidance.considerations {
        println!("     - {}", consideration);
    }
    println!("   Docs: {}", guidance.documentation);
}

fn build_classifier(
    config: &TomlConfig,
    no_ai: bool,
) -> tenant_optimizer::Result<Option<Box<dyn Classifier>>> {
    if no_ai || !config.ai_enabled() {
        return Ok(None);
    }

    let ai = validation::validate_required_field("ai", &config.ai)?;
    let endpoint = validation::validate_required_field("ai.endpoint", &ai.endpoint)?;
    let api_key = validation::validate_required_field("ai.api_key", &ai.api_key)?;

    let client = OpenAiClient::with_options(
        endpoint,
        api_key,
        config.ai_model(),
        ai.max_tokens.unwrap_or(2000),
        Duration::from_secs(120),
    )?;
    Ok(Some(Box::new(client)))
}
