//! 策略加载端到端测试

use async_trait::async_trait;
use config_abstractions::{
    ConfigLoader, ConfigLoaderStrategy, ConfigManagerOptions, Loader, Transformer, Validator,
    VariableBag, VariablesTransformer, VariablesValidator,
};
use config_impl::{
    CapabilityRegistry, ConfigDefinition, ConfigModule, ModuleOptions, StrategyConfigManager,
    TokioCronScheduler,
};
use infrastructure_common::{BoxError, ConfigError, StrategyIdentifier};
use serde::Deserialize;
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// 模拟远程配置中心的加载器
struct RemoteLoader {
    version: AtomicUsize,
}

#[async_trait]
impl ConfigLoader for RemoteLoader {
    async fn load(&self, options: Option<&Value>) -> Result<VariableBag, BoxError> {
        let service = options
            .and_then(|options| options.get("service"))
            .and_then(Value::as_str)
            .ok_or("service option is required")?;

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let mut variables = VariableBag::new();
        variables.insert("service".to_string(), json!(service));
        variables.insert("version".to_string(), json!(version));
        Ok(variables)
    }
}

struct RequiredKeys(&'static [&'static str]);

#[async_trait]
impl VariablesValidator for RequiredKeys {
    async fn validate(&self, variables: &VariableBag) -> Result<bool, BoxError> {
        Ok(self.0.iter().all(|key| variables.contains_key(*key)))
    }
}

struct LowercaseKeys;

#[async_trait]
impl VariablesTransformer for LowercaseKeys {
    async fn transform(&self, variables: VariableBag) -> Result<VariableBag, BoxError> {
        Ok(variables
            .into_iter()
            .map(|(key, value)| (key.to_lowercase(), value))
            .collect())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Database {
    host: String,
    port: u16,
}

fn scheduler() -> Arc<TokioCronScheduler> {
    Arc::new(TokioCronScheduler::new())
}

#[tokio::test]
async fn test_definition_file_with_bundled_loaders() {
    let dir = TempDir::new().unwrap();
    let dotenv = dir.path().join(".env");
    let settings = dir.path().join("settings.yaml");
    std::fs::write(&dotenv, "APP_NAME=adsp\nAPP_URL=http://${APP_NAME}.local\n").unwrap();
    std::fs::write(&settings, "database:\n  host: db.local\n  port: 5432\n").unwrap();

    let definition = format!(
        r#"
preload = true

[[strategy]]
identifier = "DOTENV"
loader = "dotenv"
options = {{ path = {dotenv:?}, expand_variables = true }}

[[strategy]]
identifier = "SETTINGS"
loader = "file"
register_as = "settings"
options = {{ path = {settings:?} }}
"#,
        dotenv = dotenv.display().to_string(),
        settings = settings.display().to_string(),
    );

    let options = ConfigDefinition::from_toml_str(&definition)
        .unwrap()
        .into_module_options(&CapabilityRegistry::new());
    let module = ConfigModule::for_root(options, scheduler()).await.unwrap();
    let manager = module.manager();

    assert_eq!(manager.get("APP_URL"), Some(json!("http://adsp.local")));
    assert_eq!(
        manager.get_as::<Database>("settings.database").unwrap(),
        Some(Database {
            host: "db.local".to_string(),
            port: 5432
        })
    );
    assert!(!manager.has("database"));
}

#[tokio::test]
async fn test_object_capabilities_end_to_end() {
    let strategy = ConfigLoaderStrategy::new(Loader::from_object(RemoteLoader {
        version: AtomicUsize::new(0),
    }))
    .with_identifier("REMOTE")
    .with_options(json!({"service": "billing"}))
    .with_reloadable(true)
    .with_register_as("remote")
    .with_validator(Validator::from_object(RequiredKeys(&["service", "version"])))
    .with_transformer(Transformer::from_object(LowercaseKeys));

    let manager = StrategyConfigManager::new(ConfigManagerOptions::new().with_strategy(strategy), scheduler());
    manager.load(true).await.unwrap();

    let remote = manager.get_proxy_of("remote", None);
    assert_eq!(remote.get("service"), Some(json!("billing")));
    assert_eq!(remote.get("version"), Some(json!(1)));

    manager.reload(Some(&StrategyIdentifier::from("REMOTE"))).await.unwrap();
    assert_eq!(remote.get("version"), Some(json!(2)));
}

#[tokio::test]
async fn test_loader_option_errors_are_wrapped_with_identifier() {
    let strategy = ConfigLoaderStrategy::new(Loader::from_object(RemoteLoader {
        version: AtomicUsize::new(0),
    }))
    .with_identifier("REMOTE");

    let manager = StrategyConfigManager::new(ConfigManagerOptions::new().with_strategy(strategy), scheduler());
    let error = manager.load(false).await.unwrap_err();

    assert!(matches!(error, ConfigError::LoadingFailed { .. }));
    assert!(error.to_string().contains("REMOTE"));
    assert!(std::error::Error::source(&error).is_some());
}

#[tokio::test]
async fn test_unregistered_names_surface_invalid_errors() {
    let definition = r#"{
        "strategies": [
            { "identifier": "ENV", "loader": "env", "validator": "schema_v2" }
        ]
    }"#;

    let options = ConfigDefinition::from_json_str(definition)
        .unwrap()
        .into_options(&CapabilityRegistry::new());
    let manager = StrategyConfigManager::new(options, scheduler());

    let error = manager.load(false).await.unwrap_err();
    assert!(matches!(error, ConfigError::InvalidValidator { .. }));
    assert!(!manager.is_loaded());
}

#[tokio::test]
#[serial]
async fn test_environment_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let dotenv = dir.path().join("service.env");
    std::fs::write(&dotenv, "INTEGRATION_SERVICE_PORT=9000\n").unwrap();

    let options = ConfigManagerOptions::new()
        .with_cache(false)
        .with_strategy(
            ConfigLoaderStrategy::new(CapabilityRegistry::new().resolve_loader("dotenv"))
                .with_options(json!({ "path": dotenv })),
        )
        .with_strategy(
            ConfigLoaderStrategy::new(Loader::from_sync_fn(|_| {
                let mut variables = VariableBag::new();
                variables.insert("host".to_string(), json!("cache.local"));
                variables.insert("ttl".to_string(), json!(30));
                Ok(variables)
            }))
            .with_register_as("INTEGRATION_SERVICE_CACHE"),
        );

    let module = ConfigModule::for_root(ModuleOptions::new(options), scheduler())
        .await
        .unwrap();
    let manager = module.manager();

    assert_eq!(std::env::var("INTEGRATION_SERVICE_PORT").unwrap(), "9000");
    assert_eq!(manager.get("INTEGRATION_SERVICE_CACHE.ttl"), Some(json!(30)));

    let raw = std::env::var("INTEGRATION_SERVICE_CACHE").unwrap();
    let parsed: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, json!({"host": "cache.local", "ttl": 30}));

    std::env::remove_var("INTEGRATION_SERVICE_PORT");
    std::env::remove_var("INTEGRATION_SERVICE_CACHE");
}

#[tokio::test]
async fn test_for_root_async_with_definition_factory() -> anyhow::Result<()> {
    let module = ConfigModule::for_root_async(
        || async {
            let mut registry = CapabilityRegistry::empty();
            registry.register_loader(
                "static",
                Loader::from_sync_fn(|_| {
                    let mut variables = VariableBag::new();
                    variables.insert("MODE".to_string(), json!("async"));
                    Ok(variables)
                }),
            );
            let definition = ConfigDefinition::from_toml_str("[[strategy]]\nloader = \"static\"\n")?;
            Ok(definition.into_options(&registry))
        },
        scheduler(),
    )
    .await?;

    assert_eq!(module.manager().get("MODE"), Some(json!("async")));
    Ok(())
}
