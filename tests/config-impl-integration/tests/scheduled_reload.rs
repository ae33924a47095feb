//! 调度重载端到端测试

use config_abstractions::{ConfigLoaderStrategy, ConfigManagerOptions, LoadState};
use config_impl::{CapabilityRegistry, ConfigModule, ModuleOptions, TokioCronScheduler};
use infrastructure_common::ConfigError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_file_changes_are_picked_up_by_schedule() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feature.json");
    std::fs::write(&path, r#"{"flags": {"checkout": false}}"#).unwrap();

    let registry = CapabilityRegistry::new();
    let options = ConfigManagerOptions::new().with_strategy(
        ConfigLoaderStrategy::new(registry.resolve_loader("file"))
            .with_identifier("FLAGS")
            .with_options(json!({ "path": path }))
            .with_reloadable(true)
            .with_schedule("* * * * * *")
            .with_schedule_timezone("UTC"),
    );

    let scheduler = Arc::new(TokioCronScheduler::new());
    let module = ConfigModule::for_root(ModuleOptions::new(options), scheduler.clone())
        .await
        .unwrap();
    let manager = module.manager();
    let flags = manager.get_proxy_of("flags", None);

    assert_eq!(flags.get("checkout"), Some(json!(false)));
    assert_eq!(scheduler.active_tasks(), 1);

    std::fs::write(&path, r#"{"flags": {"checkout": true}}"#).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while flags.get("checkout") != Some(json!(true)) {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("scheduled reload should pick up the new file content");

    assert_eq!(manager.state(), LoadState::Loaded);
    scheduler.shutdown();
    assert_eq!(scheduler.active_tasks(), 0);
}

#[tokio::test]
async fn test_invalid_cron_rejects_bootstrap() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feature.toml");
    std::fs::write(&path, "enabled = true\n").unwrap();

    let options = ConfigManagerOptions::new().with_strategy(
        ConfigLoaderStrategy::new(CapabilityRegistry::new().resolve_loader("file"))
            .with_options(json!({ "path": path }))
            .with_reloadable(true)
            .with_schedule("bad-cron"),
    );

    let scheduler = Arc::new(TokioCronScheduler::new());
    let result = ConfigModule::for_root(ModuleOptions::new(options).with_preload(true), scheduler.clone()).await;

    assert!(matches!(result, Err(ConfigError::InvalidSchedule { identifier: None })));
    assert_eq!(scheduler.active_tasks(), 0);
}

#[tokio::test]
async fn test_unknown_timezone_rejects_bootstrap() {
    let options = ConfigManagerOptions::new().with_strategy(
        ConfigLoaderStrategy::new(CapabilityRegistry::new().resolve_loader("env"))
            .with_options(json!({ "prefix": "NO_SUCH_PREFIX_" }))
            .with_reloadable(true)
            .with_schedule("0 0 * * *")
            .with_schedule_timezone("Mars/Olympus"),
    );

    let result = ConfigModule::for_root(ModuleOptions::new(options), Arc::new(TokioCronScheduler::new())).await;
    assert!(matches!(result, Err(ConfigError::InvalidTimezone { .. })));
}

#[tokio::test]
async fn test_iana_timezone_bootstraps() {
    let options = ConfigManagerOptions::new().with_strategy(
        ConfigLoaderStrategy::new(CapabilityRegistry::new().resolve_loader("env"))
            .with_identifier("ENV")
            .with_options(json!({ "prefix": "NO_SUCH_PREFIX_" }))
            .with_reloadable(true)
            .with_schedule("0 0 * * *")
            .with_schedule_timezone("America/Sao_Paulo"),
    );

    let scheduler = Arc::new(TokioCronScheduler::new());
    let module = ConfigModule::for_root(ModuleOptions::new(options), scheduler.clone())
        .await
        .unwrap();

    assert!(module.manager().is_loaded());
    assert_eq!(scheduler.active_tasks(), 1);
    scheduler.shutdown();
}
