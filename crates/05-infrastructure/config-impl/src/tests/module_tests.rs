//! 配置模块启动测试

use super::*;
use crate::module::{ConfigModule, ModuleOptions};
use config_abstractions::{ConfigLoaderStrategy, ConfigManagerOptions, LoadState};

fn options_with(calls: &Arc<AtomicUsize>) -> ConfigManagerOptions {
    ConfigManagerOptions::new().with_strategy(ConfigLoaderStrategy::new(counting_loader(calls, "COUNT")))
}

/// 测试预加载模式在创建模块时完成加载
#[tokio::test]
async fn test_for_root_with_preload() {
    let calls = Arc::new(AtomicUsize::new(0));
    let module = ConfigModule::for_root(
        ModuleOptions::new(options_with(&calls)).with_preload(true),
        strict_scheduler(),
    )
    .await
    .unwrap();

    assert_eq!(module.manager().state(), LoadState::Loaded);
    assert_eq!(module.manager().get("COUNT"), Some(json!(1)));

    module.on_module_init().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1, "初始化钩子不应重复加载");
}

/// 测试未预加载时由初始化钩子加载
#[tokio::test]
async fn test_for_root_without_preload() {
    let calls = Arc::new(AtomicUsize::new(0));
    let module = ConfigModule::for_root(ModuleOptions::new(options_with(&calls)), strict_scheduler())
        .await
        .unwrap();

    let manager = module.into_manager();
    assert!(manager.is_loaded());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// 测试预加载失败时模块创建失败
#[tokio::test]
async fn test_for_root_propagates_preload_errors() {
    let options = ConfigManagerOptions::new()
        .with_strategy(ConfigLoaderStrategy::new(failing_loader("missing credentials")));

    let result = ConfigModule::for_root(ModuleOptions::new(options).with_preload(true), strict_scheduler()).await;
    assert!(matches!(result, Err(ConfigError::LoadingFailed { .. })));
}

/// 测试异步工厂提供选项
#[tokio::test]
async fn test_for_root_async_uses_factory_options() {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = Arc::clone(&calls);

    let module = ConfigModule::for_root_async(
        move || async move { Ok(options_with(&factory_calls).with_debug(true)) },
        strict_scheduler(),
    )
    .await
    .unwrap();

    assert!(module.manager().is_loaded());
    assert_eq!(module.manager().get("COUNT"), Some(json!(1)));
}

/// 测试异步工厂的错误原样返回
#[tokio::test]
async fn test_for_root_async_factory_error() {
    let result = ConfigModule::for_root_async(
        || async { Err(ConfigError::SchedulerUnavailable { message: "no runtime".to_string() }) },
        strict_scheduler(),
    )
    .await;

    assert!(matches!(result, Err(ConfigError::SchedulerUnavailable { .. })));
}
