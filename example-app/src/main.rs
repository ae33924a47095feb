//! # 示例应用程序
//!
//! 演示如何通过声明式策略加载配置、读取变量以及按调度重载

use anyhow::Context;
use clap::Parser;
use config_abstractions::{ConfigManagerOptions, ConfigLoaderStrategy, Loader, Validator, VariableBag};
use config_impl::{
    CapabilityRegistry, ConfigDefinition, ConfigModule, ModuleOptions, StrategyConfigManager,
    TokioCronScheduler,
};
use infrastructure_common::init_tracing;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "example-app")]
#[command(about = "Lorn ADSP 策略配置示例应用")]
struct Args {
    /// 策略定义文件路径（TOML / JSON / YAML）
    #[arg(short, long, default_value = "example-app/config/strategies.toml")]
    definition: PathBuf,

    /// 需要输出的变量路径，可重复
    #[arg(short, long = "get")]
    keys: Vec<String>,

    /// 加载后重载指定标识的策略
    #[arg(long)]
    reload: Option<String>,

    /// 保持运行以便调度任务继续重载，Ctrl+C 退出
    #[arg(long)]
    keep_running: bool,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// 应用配置
#[derive(Debug, Deserialize)]
struct AppConfig {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("启动 Lorn ADSP 示例应用");

    let scheduler = Arc::new(TokioCronScheduler::new());
    let module = ConfigModule::for_root(build_options(&args)?, scheduler.clone())
        .await
        .context("配置模块启动失败")?;
    let manager = module.manager();

    print_variables(manager, &args.keys);

    match manager.get_as::<AppConfig>("app") {
        Ok(Some(config)) => info!(
            "应用配置: {} {} (debug: {})",
            config.name,
            config.version.as_deref().unwrap_or("-"),
            config.debug
        ),
        Ok(None) => info!("未加载应用配置"),
        Err(e) => warn!("应用配置格式不正确: {}", e),
    }

    if let Some(identifier) = args.reload.as_deref() {
        manager.reload(Some(&identifier.into())).await?;
        info!("已重载策略: {}", identifier);
        print_variables(manager, &args.keys);
    }

    if args.keep_running {
        info!("等待调度任务运行，按 Ctrl+C 退出");
        tokio::signal::ctrl_c().await?;
        info!("收到退出信号，正在关闭应用");
    }

    scheduler.shutdown();
    info!("应用已关闭");
    Ok(())
}

/// 读取策略定义文件，文件不存在时只加载进程环境变量
fn build_options(args: &Args) -> anyhow::Result<ModuleOptions> {
    let registry = build_registry();

    if args.definition.exists() {
        let definition = ConfigDefinition::from_file(&args.definition)
            .with_context(|| format!("无法读取策略定义: {}", args.definition.display()))?;
        info!("使用策略定义: {}", args.definition.display());
        return Ok(definition.into_module_options(&registry));
    }

    warn!(
        "策略定义文件不存在，只加载进程环境变量: {}",
        args.definition.display()
    );
    let options = ConfigManagerOptions::new().with_strategy(
        ConfigLoaderStrategy::new(registry.resolve_loader("env")).with_identifier("ENV"),
    );
    Ok(ModuleOptions::new(options))
}

fn build_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_validator(
            "has_name",
            Validator::from_sync_fn(|variables: &VariableBag| {
                Ok(variables.is_empty() || variables.contains_key("name"))
            }),
        )
        .register_loader(
            "build_info",
            Loader::from_sync_fn(|_| {
                let mut variables = VariableBag::new();
                variables.insert("BUILD_PROFILE".to_string(), build_profile().into());
                Ok(variables)
            }),
        );
    registry
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn print_variables(manager: &StrategyConfigManager, keys: &[String]) {
    for key in keys {
        match manager.get(key) {
            Some(value) => info!("{} = {}", key, value),
            None => warn!("{} 未定义", key),
        }
    }
}
