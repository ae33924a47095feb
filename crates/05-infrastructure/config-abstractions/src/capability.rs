//! 加载器、验证器、转换器能力抽象
//!
//! 每种能力都有两种可调度的形式：函数形式（闭包）和对象形式（实现对应 trait 的对象）。
//! 通过数据声明的策略在注册表中找不到对应名称时，得到 [`Capability::Unresolved`]，
//! 流水线执行到该步骤时报告对应的 `Invalid*` 错误。

use async_trait::async_trait;
use futures::future::BoxFuture;
use infrastructure_common::BoxError;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// 一个策略产出的变量集合
pub type VariableBag = Map<String, Value>;

/// 加载函数
pub type LoaderFn =
    dyn Fn(Option<Value>) -> BoxFuture<'static, Result<VariableBag, BoxError>> + Send + Sync;

/// 验证函数
pub type ValidatorFn =
    dyn Fn(VariableBag) -> BoxFuture<'static, Result<bool, BoxError>> + Send + Sync;

/// 转换函数
pub type TransformerFn =
    dyn Fn(VariableBag) -> BoxFuture<'static, Result<VariableBag, BoxError>> + Send + Sync;

/// 加载器对象
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 使用策略选项加载变量
    async fn load(&self, options: Option<&Value>) -> Result<VariableBag, BoxError>;
}

/// 验证器对象
#[async_trait]
pub trait VariablesValidator: Send + Sync {
    /// 验证加载得到的原始变量
    async fn validate(&self, variables: &VariableBag) -> Result<bool, BoxError>;
}

/// 转换器对象
#[async_trait]
pub trait VariablesTransformer: Send + Sync {
    /// 转换已验证的变量
    async fn transform(&self, variables: VariableBag) -> Result<VariableBag, BoxError>;
}

/// 能力：函数形式或对象形式
pub enum Capability<F: ?Sized, O: ?Sized> {
    /// 函数形式
    Function(Arc<F>),
    /// 对象形式
    Object(Arc<O>),
    /// 按名称声明但未能解析的能力
    Unresolved(String),
}

/// 加载器能力
pub type Loader = Capability<LoaderFn, dyn ConfigLoader>;

/// 验证器能力
pub type Validator = Capability<ValidatorFn, dyn VariablesValidator>;

/// 转换器能力
pub type Transformer = Capability<TransformerFn, dyn VariablesTransformer>;

impl<F: ?Sized, O: ?Sized> Capability<F, O> {
    /// 能力形式的名称，用于日志
    pub fn kind(&self) -> &str {
        match self {
            Self::Function(_) => "function",
            Self::Object(_) => "object",
            Self::Unresolved(name) => name,
        }
    }
}

impl<F: ?Sized, O: ?Sized> Clone for Capability<F, O> {
    fn clone(&self) -> Self {
        match self {
            Self::Function(function) => Self::Function(Arc::clone(function)),
            Self::Object(object) => Self::Object(Arc::clone(object)),
            Self::Unresolved(name) => Self::Unresolved(name.clone()),
        }
    }
}

impl<F: ?Sized, O: ?Sized> fmt::Debug for Capability<F, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Capability::Function"),
            Self::Object(_) => f.write_str("Capability::Object"),
            Self::Unresolved(name) => f.debug_tuple("Capability::Unresolved").field(name).finish(),
        }
    }
}

impl Loader {
    /// 从异步闭包创建加载器
    pub fn from_fn<F, Fut>(loader: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<VariableBag, BoxError>> + Send + 'static,
    {
        Self::Function(Arc::new(
            move |options: Option<Value>| -> BoxFuture<'static, Result<VariableBag, BoxError>> {
                Box::pin(loader(options))
            },
        ))
    }

    /// 从同步闭包创建加载器
    pub fn from_sync_fn<F>(loader: F) -> Self
    where
        F: Fn(Option<Value>) -> Result<VariableBag, BoxError> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(
            move |options: Option<Value>| -> BoxFuture<'static, Result<VariableBag, BoxError>> {
                Box::pin(futures::future::ready(loader(options)))
            },
        ))
    }

    /// 从加载器对象创建
    pub fn from_object<L: ConfigLoader + 'static>(loader: L) -> Self {
        Self::Object(Arc::new(loader))
    }
}

impl Validator {
    /// 从异步闭包创建验证器
    pub fn from_fn<F, Fut>(validator: F) -> Self
    where
        F: Fn(VariableBag) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, BoxError>> + Send + 'static,
    {
        Self::Function(Arc::new(
            move |variables: VariableBag| -> BoxFuture<'static, Result<bool, BoxError>> {
                Box::pin(validator(variables))
            },
        ))
    }

    /// 从同步闭包创建验证器
    pub fn from_sync_fn<F>(validator: F) -> Self
    where
        F: Fn(&VariableBag) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(
            move |variables: VariableBag| -> BoxFuture<'static, Result<bool, BoxError>> {
                Box::pin(futures::future::ready(validator(&variables)))
            },
        ))
    }

    /// 从验证器对象创建
    pub fn from_object<V: VariablesValidator + 'static>(validator: V) -> Self {
        Self::Object(Arc::new(validator))
    }
}

impl Transformer {
    /// 从异步闭包创建转换器
    pub fn from_fn<F, Fut>(transformer: F) -> Self
    where
        F: Fn(VariableBag) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<VariableBag, BoxError>> + Send + 'static,
    {
        Self::Function(Arc::new(
            move |variables: VariableBag| -> BoxFuture<'static, Result<VariableBag, BoxError>> {
                Box::pin(transformer(variables))
            },
        ))
    }

    /// 从同步闭包创建转换器
    pub fn from_sync_fn<F>(transformer: F) -> Self
    where
        F: Fn(VariableBag) -> Result<VariableBag, BoxError> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(
            move |variables: VariableBag| -> BoxFuture<'static, Result<VariableBag, BoxError>> {
                Box::pin(futures::future::ready(transformer(variables)))
            },
        ))
    }

    /// 从转换器对象创建
    pub fn from_object<T: VariablesTransformer + 'static>(transformer: T) -> Self {
        Self::Object(Arc::new(transformer))
    }
}
