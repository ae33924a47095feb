//! 策略执行流水线
//!
//! 固定顺序：加载 -> 验证 -> 转换。验证作用于加载得到的原始变量，
//! 只有验证通过后才会转换。

use crate::tracer::{
    DebugTracer, INVALID_VARIABLES, LOADING_VARIABLES, TRANSFORMING_VARIABLES,
    VALIDATING_VARIABLES,
};
use config_abstractions::{Capability, ConfigLoaderStrategy, VariableBag};
use infrastructure_common::{BoxError, ConfigError, ConfigResult, StrategyIdentifier};

/// 执行策略的完整流水线，返回最终变量
pub async fn retrieve_variables(
    strategy: &ConfigLoaderStrategy,
    tracer: DebugTracer,
) -> ConfigResult<VariableBag> {
    let variables = load_variables(strategy, tracer).await?;
    validate_variables(strategy, &variables, tracer).await?;
    transform_variables(strategy, variables, tracer).await
}

/// 加载步骤
pub async fn load_variables(
    strategy: &ConfigLoaderStrategy,
    tracer: DebugTracer,
) -> ConfigResult<VariableBag> {
    let identifier = strategy.identifier.as_ref();
    tracer.trace(LOADING_VARIABLES, identifier);

    let loaded = match &strategy.loader {
        Capability::Function(load) => load(strategy.options.clone()).await,
        Capability::Object(loader) => loader.load(strategy.options.as_ref()).await,
        Capability::Unresolved(_) => return Err(invalid_loader(identifier)),
    };

    loaded.map_err(|reason| {
        unwrap_or_wrap(
            reason,
            |error| matches!(error, ConfigError::InvalidLoader { .. }),
            |reason| ConfigError::loading(identifier.cloned(), reason),
        )
    })
}

/// 验证步骤，未配置验证器时直接通过
pub async fn validate_variables(
    strategy: &ConfigLoaderStrategy,
    variables: &VariableBag,
    tracer: DebugTracer,
) -> ConfigResult<()> {
    let Some(validator) = &strategy.validator else {
        return Ok(());
    };

    let identifier = strategy.identifier.as_ref();
    tracer.trace(VALIDATING_VARIABLES, identifier);

    let outcome = match validator {
        Capability::Function(validate) => validate(variables.clone()).await,
        Capability::Object(validator) => validator.validate(variables).await,
        Capability::Unresolved(_) => {
            return Err(ConfigError::InvalidValidator {
                identifier: identifier.cloned(),
            })
        }
    };

    let is_valid = outcome.map_err(|reason| {
        unwrap_or_wrap(
            reason,
            |error| matches!(error, ConfigError::InvalidValidator { .. }),
            |reason| ConfigError::validation(identifier.cloned(), reason),
        )
    })?;

    if is_valid {
        Ok(())
    } else {
        Err(ConfigError::validation(identifier.cloned(), INVALID_VARIABLES))
    }
}

/// 转换步骤，未配置转换器时原样返回
pub async fn transform_variables(
    strategy: &ConfigLoaderStrategy,
    variables: VariableBag,
    tracer: DebugTracer,
) -> ConfigResult<VariableBag> {
    let Some(transformer) = &strategy.transformer else {
        return Ok(variables);
    };

    let identifier = strategy.identifier.as_ref();
    tracer.trace(TRANSFORMING_VARIABLES, identifier);

    let transformed = match transformer {
        Capability::Function(transform) => transform(variables).await,
        Capability::Object(transformer) => transformer.transform(variables).await,
        Capability::Unresolved(_) => {
            return Err(ConfigError::InvalidTransformer {
                identifier: identifier.cloned(),
            })
        }
    };

    transformed.map_err(|reason| {
        unwrap_or_wrap(
            reason,
            |error| matches!(error, ConfigError::InvalidTransformer { .. }),
            |reason| ConfigError::transformation(identifier.cloned(), reason),
        )
    })
}

fn invalid_loader(identifier: Option<&StrategyIdentifier>) -> ConfigError {
    ConfigError::InvalidLoader {
        identifier: identifier.cloned(),
    }
}

/// `Invalid*` 错误原样传播，其余错误包装
fn unwrap_or_wrap(
    reason: BoxError,
    propagate: impl FnOnce(&ConfigError) -> bool,
    wrap: impl FnOnce(BoxError) -> ConfigError,
) -> ConfigError {
    match reason.downcast::<ConfigError>() {
        Ok(error) if propagate(&error) => *error,
        Ok(error) => {
            let reason: BoxError = error;
            wrap(reason)
        }
        Err(reason) => wrap(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use config_abstractions::{
        ConfigLoader, Loader, Transformer, Validator, VariablesTransformer, VariablesValidator,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn bag(value: Value) -> VariableBag {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn strategy_with(loader: Loader) -> ConfigLoaderStrategy {
        ConfigLoaderStrategy::new(loader).with_identifier("TEST")
    }

    struct OptionsEcho;

    #[async_trait]
    impl ConfigLoader for OptionsEcho {
        async fn load(&self, options: Option<&Value>) -> Result<VariableBag, BoxError> {
            Ok(bag(json!({ "echo": options.cloned().unwrap_or(Value::Null) })))
        }
    }

    struct RequiresPort;

    #[async_trait]
    impl VariablesValidator for RequiresPort {
        async fn validate(&self, variables: &VariableBag) -> Result<bool, BoxError> {
            Ok(variables.contains_key("PORT"))
        }
    }

    struct Uppercase;

    #[async_trait]
    impl VariablesTransformer for Uppercase {
        async fn transform(&self, variables: VariableBag) -> Result<VariableBag, BoxError> {
            Ok(variables
                .into_iter()
                .map(|(key, value)| (key.to_uppercase(), value))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_object_loader_receives_options() {
        let strategy = strategy_with(Loader::from_object(OptionsEcho)).with_options(json!({"path": ".env"}));

        let variables = retrieve_variables(&strategy, DebugTracer::default()).await.unwrap();
        assert_eq!(variables, bag(json!({"echo": {"path": ".env"}})));
    }

    #[tokio::test]
    async fn test_steps_run_in_order_on_raw_then_transformed_data() {
        let strategy = strategy_with(Loader::from_sync_fn(|_| Ok(bag(json!({"port": 80})))))
            .with_validator(Validator::from_sync_fn(|variables| Ok(variables.contains_key("port"))))
            .with_transformer(Transformer::from_object(Uppercase));

        let variables = retrieve_variables(&strategy, DebugTracer::new(true)).await.unwrap();
        assert_eq!(variables, bag(json!({"PORT": 80})));
    }

    #[tokio::test]
    async fn test_missing_validator_and_transformer_pass_through() {
        let strategy = strategy_with(Loader::from_fn(|_| async { Ok::<_, BoxError>(bag(json!({"a": 1}))) }));

        let variables = retrieve_variables(&strategy, DebugTracer::default()).await.unwrap();
        assert_eq!(variables, bag(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_loader_errors_are_wrapped() {
        let strategy = strategy_with(Loader::from_sync_fn(|_| Err("connection refused".into())));

        let error = retrieve_variables(&strategy, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::LoadingFailed { .. }));
        assert!(error.to_string().contains("connection refused"));
        assert_eq!(error.identifier(), Some(&StrategyIdentifier::from("TEST")));
    }

    #[tokio::test]
    async fn test_invalid_capabilities_propagate_unwrapped() {
        let unresolved = strategy_with(Loader::Unresolved("vault".to_string()));
        let error = retrieve_variables(&unresolved, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::InvalidLoader { .. }));

        let nested = strategy_with(Loader::from_sync_fn(|_| {
            Err(Box::new(ConfigError::InvalidLoader { identifier: None }) as BoxError)
        }));
        let error = retrieve_variables(&nested, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::InvalidLoader { identifier: None }));

        let validator = strategy_with(Loader::from_sync_fn(|_| Ok(VariableBag::new())))
            .with_validator(Validator::Unresolved("schema".to_string()));
        let error = retrieve_variables(&validator, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValidator { .. }));

        let transformer = strategy_with(Loader::from_sync_fn(|_| Ok(VariableBag::new())))
            .with_transformer(Transformer::Unresolved("camel".to_string()));
        let error = retrieve_variables(&transformer, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::InvalidTransformer { .. }));
    }

    #[tokio::test]
    async fn test_validator_rejection_and_failure() {
        let rejected = strategy_with(Loader::from_sync_fn(|_| Ok(bag(json!({"HOST": "x"})))))
            .with_validator(Validator::from_object(RequiresPort));
        let error = retrieve_variables(&rejected, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::ValidationFailed { .. }));
        assert!(error.to_string().contains(INVALID_VARIABLES));

        let failing = strategy_with(Loader::from_sync_fn(|_| Ok(VariableBag::new())))
            .with_validator(Validator::from_fn(|_| async { Err::<bool, BoxError>("schema unavailable".into()) }));
        let error = retrieve_variables(&failing, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::ValidationFailed { .. }));
        assert!(error.to_string().contains("schema unavailable"));
    }

    #[tokio::test]
    async fn test_transformer_skipped_when_validation_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let strategy = strategy_with(Loader::from_sync_fn(|_| Ok(VariableBag::new())))
            .with_validator(Validator::from_sync_fn(|_| Ok(false)))
            .with_transformer(Transformer::from_sync_fn(move |variables| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(variables)
            }));

        assert!(retrieve_variables(&strategy, DebugTracer::default()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transformer_errors_are_wrapped() {
        let strategy = strategy_with(Loader::from_sync_fn(|_| Ok(VariableBag::new())))
            .with_transformer(Transformer::from_sync_fn(|_| Err("bad mapping".into())));

        let error = retrieve_variables(&strategy, DebugTracer::default()).await.unwrap_err();
        assert!(matches!(error, ConfigError::TransformationFailed { .. }));
    }
}
