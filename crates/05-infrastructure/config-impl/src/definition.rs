//! 声明式策略定义
//!
//! 策略可以写在 TOML / JSON / YAML 文件中，加载器、验证器、转换器以名称引用，
//! 通过 [`CapabilityRegistry`] 解析。找不到的名称解析为未解析能力，
//! 流水线执行到该步骤时报告对应的 `Invalid*` 错误。

use crate::loaders::{DotEnvLoader, EnvironmentLoader, FileFormat, FileLoader};
use crate::module::ModuleOptions;
use config_abstractions::{
    Capability, ConfigLoaderStrategy, ConfigManagerOptions, Loader, Transformer, Validator,
};
use infrastructure_common::{ConfigError, ConfigResult, StrategyIdentifier};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// 单个策略的声明
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyDefinition {
    /// 加载器名称
    pub loader: String,
    /// 策略标识
    #[serde(default)]
    pub identifier: Option<StrategyIdentifier>,
    /// 禁用后既不加载也不重载
    #[serde(default)]
    pub disable: bool,
    /// 传给加载器的选项
    #[serde(default)]
    pub options: Option<Value>,
    /// 是否参与重载
    #[serde(default)]
    pub reloadable: bool,
    /// cron 表达式
    #[serde(default)]
    pub schedule: Option<String>,
    /// 调度时区
    #[serde(default, alias = "scheduleTimezone")]
    pub schedule_timezone: Option<String>,
    /// 整体存放变量的键
    #[serde(default, alias = "registerAs")]
    pub register_as: Option<String>,
    /// 验证器名称
    #[serde(default)]
    pub validator: Option<String>,
    /// 转换器名称
    #[serde(default)]
    pub transformer: Option<String>,
}

impl StrategyDefinition {
    /// 解析能力名称，得到可执行的策略
    pub fn into_strategy(self, registry: &CapabilityRegistry) -> ConfigLoaderStrategy {
        ConfigLoaderStrategy {
            loader: registry.resolve_loader(&self.loader),
            identifier: self.identifier,
            disable: self.disable,
            options: self.options,
            reloadable: self.reloadable,
            schedule: self.schedule,
            schedule_timezone: self.schedule_timezone,
            register_as: self.register_as,
            transformer: self
                .transformer
                .as_deref()
                .map(|name| registry.resolve_transformer(name)),
            validator: self
                .validator
                .as_deref()
                .map(|name| registry.resolve_validator(name)),
        }
    }
}

fn default_cache() -> bool {
    true
}

/// 配置文件中的完整声明
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDefinition {
    /// 写入缓存而不是进程环境变量
    #[serde(default = "default_cache")]
    pub cache: bool,
    /// 输出调试追踪
    #[serde(default)]
    pub debug: bool,
    /// 是否预加载
    #[serde(default)]
    pub preload: bool,
    /// 按声明顺序执行的策略
    #[serde(default, rename = "strategy", alias = "strategies")]
    pub strategies: Vec<StrategyDefinition>,
}

impl ConfigDefinition {
    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(ConfigError::parse)
    }

    /// 从 JSON 文本解析
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// 从 YAML 文本解析
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        serde_yaml::from_str(content).map_err(ConfigError::parse)
    }

    /// 从文件解析，格式由扩展名决定
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let format = FileFormat::from_path(path).ok_or_else(|| {
            ConfigError::parse(format!("无法识别的配置文件格式: {}", path.display()))
        })?;

        debug!("读取策略定义文件: {}", path.display());
        let content = std::fs::read_to_string(path)?;

        match format {
            FileFormat::Toml => Self::from_toml_str(&content),
            FileFormat::Json => Self::from_json_str(&content),
            FileFormat::Yaml => Self::from_yaml_str(&content),
        }
    }

    /// 转换为配置管理器选项
    pub fn into_options(self, registry: &CapabilityRegistry) -> ConfigManagerOptions {
        ConfigManagerOptions::new()
            .with_cache(self.cache)
            .with_debug(self.debug)
            .with_strategies(
                self.strategies
                    .into_iter()
                    .map(|definition| definition.into_strategy(registry)),
            )
    }

    /// 转换为模块选项
    pub fn into_module_options(self, registry: &CapabilityRegistry) -> ModuleOptions {
        let preload = self.preload;
        ModuleOptions::new(self.into_options(registry)).with_preload(preload)
    }
}

/// 能力注册表
///
/// 按名称保存加载器、验证器和转换器。[`CapabilityRegistry::new`] 预先注册了
/// `dotenv`、`env` 和 `file` 三个内置加载器。
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    loaders: HashMap<String, Loader>,
    validators: HashMap<String, Validator>,
    transformers: HashMap<String, Transformer>,
}

impl CapabilityRegistry {
    /// 创建带内置加载器的注册表
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry
            .register_loader("dotenv", Loader::from_object(DotEnvLoader::new()))
            .register_loader("env", Loader::from_object(EnvironmentLoader::new()))
            .register_loader("file", Loader::from_object(FileLoader::new()));
        registry
    }

    /// 创建空注册表
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
            validators: HashMap::new(),
            transformers: HashMap::new(),
        }
    }

    /// 注册加载器，同名时覆盖
    pub fn register_loader(&mut self, name: impl Into<String>, loader: Loader) -> &mut Self {
        self.loaders.insert(name.into(), loader);
        self
    }

    /// 注册验证器，同名时覆盖
    pub fn register_validator(&mut self, name: impl Into<String>, validator: Validator) -> &mut Self {
        self.validators.insert(name.into(), validator);
        self
    }

    /// 注册转换器，同名时覆盖
    pub fn register_transformer(
        &mut self,
        name: impl Into<String>,
        transformer: Transformer,
    ) -> &mut Self {
        self.transformers.insert(name.into(), transformer);
        self
    }

    /// 按名称查找加载器，未注册时返回 `Unresolved`
    pub fn resolve_loader(&self, name: &str) -> Loader {
        resolve(&self.loaders, name, "加载器")
    }

    /// 按名称查找验证器
    pub fn resolve_validator(&self, name: &str) -> Validator {
        resolve(&self.validators, name, "验证器")
    }

    /// 按名称查找转换器
    pub fn resolve_transformer(&self, name: &str) -> Transformer {
        resolve(&self.transformers, name, "转换器")
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve<F: ?Sized, O: ?Sized>(
    entries: &HashMap<String, Capability<F, O>>,
    name: &str,
    kind: &str,
) -> Capability<F, O> {
    match entries.get(name) {
        Some(capability) => capability.clone(),
        None => {
            warn!("未注册的{}: {}", kind, name);
            Capability::Unresolved(name.to_string())
        }
    }
}
