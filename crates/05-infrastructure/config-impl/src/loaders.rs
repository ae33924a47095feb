//! 内置加载器实现

use async_trait::async_trait;
use config_abstractions::{ConfigLoader, VariableBag};
use infrastructure_common::BoxError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 加载器错误
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("加载器选项无效: {source}")]
    InvalidOptions {
        #[from]
        source: serde_json::Error,
    },

    #[error("读取文件失败: {path}, 原因: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("配置文件不存在: {path}")]
    Missing { path: String },

    #[error("无法识别的配置文件格式: {path}")]
    UnknownFormat { path: String },

    #[error("解析配置文件失败: {path}, 原因: {message}")]
    Parse { path: String, message: String },

    #[error("配置文件顶层不是表: {path}")]
    NotATable { path: String },
}

fn parse_options<T: DeserializeOwned + Default>(options: Option<&Value>) -> Result<T, LoaderError> {
    match options {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => Ok(serde_json::from_value(value.clone())?),
    }
}

/// 单个或多个路径
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathList {
    /// 单个路径
    Single(PathBuf),
    /// 多个路径
    Many(Vec<PathBuf>),
}

impl PathList {
    fn into_vec(self) -> Vec<PathBuf> {
        match self {
            Self::Single(path) => vec![path],
            Self::Many(paths) => paths,
        }
    }
}

/// `.env` 加载器选项
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DotEnvLoaderOptions {
    /// 文件路径，默认为工作目录下的 `.env`
    pub path: Option<PathList>,
    /// 是否展开 `${VAR}` / `$VAR` 引用
    #[serde(alias = "expandVariables")]
    pub expand_variables: bool,
}

/// `.env` 文件加载器
///
/// 不存在的文件会被跳过；多个文件中出现同一个键时，先列出的文件优先。
#[derive(Debug, Clone, Copy, Default)]
pub struct DotEnvLoader;

static DOTENV_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([\w.\-]+)\s*=\s*(.*?)\s*$").expect("valid pattern")
});

static VARIABLE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\\)?\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("valid pattern")
});

impl DotEnvLoader {
    /// 创建 `.env` 加载器
    pub fn new() -> Self {
        Self
    }

    /// 解析 `.env` 文本，保持出现顺序，后出现的同名键覆盖先出现的
    pub fn parse(content: &str) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some(captures) = DOTENV_LINE.captures(line) else {
                continue;
            };

            let key = captures[1].to_string();
            let value = Self::unquote(captures.get(2).map_or("", |m| m.as_str()));

            match entries.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = value,
                None => entries.push((key, value)),
            }
        }

        entries
    }

    fn unquote(raw: &str) -> String {
        let bytes = raw.as_bytes();
        if bytes.len() >= 2 {
            let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
            if first == b'"' && last == b'"' {
                return raw[1..raw.len() - 1].replace("\\n", "\n");
            }
            if first == b'\'' && last == b'\'' {
                return raw[1..raw.len() - 1].to_string();
            }
        }

        match raw.find(" #") {
            Some(index) => raw[..index].trim_end().to_string(),
            None => raw.to_string(),
        }
    }

    /// 展开变量引用，先查找已解析的变量，再查找进程环境变量
    pub fn expand(variables: &mut VariableBag) {
        let keys: Vec<String> = variables.keys().cloned().collect();
        let snapshot = variables.clone();

        for key in keys {
            let mut visiting = HashSet::new();
            let expanded = Self::expand_key(&key, &snapshot, &mut visiting);
            variables.insert(key, Value::String(expanded));
        }
    }

    fn expand_key(key: &str, variables: &VariableBag, visiting: &mut HashSet<String>) -> String {
        let raw = match variables.get(key) {
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => other.to_string(),
            None => return std::env::var(key).unwrap_or_default(),
        };

        if !visiting.insert(key.to_string()) {
            return raw;
        }

        let expanded = VARIABLE_REFERENCE
            .replace_all(&raw, |captures: &Captures<'_>| {
                let name = captures
                    .get(2)
                    .or_else(|| captures.get(3))
                    .map_or("", |m| m.as_str());

                if captures.get(1).is_some() {
                    return captures[0][1..].to_string();
                }

                if variables.contains_key(name) {
                    Self::expand_key(name, variables, visiting)
                } else {
                    std::env::var(name).unwrap_or_default()
                }
            })
            .into_owned();

        visiting.remove(key);
        expanded
    }
}

#[async_trait]
impl ConfigLoader for DotEnvLoader {
    async fn load(&self, options: Option<&Value>) -> Result<VariableBag, BoxError> {
        let options: DotEnvLoaderOptions = parse_options(options)?;
        let paths = match options.path {
            Some(paths) => paths.into_vec(),
            None => vec![std::env::current_dir()?.join(".env")],
        };

        let mut variables = VariableBag::new();
        for path in paths {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                debug!("跳过不存在的 .env 文件: {}", path.display());
                continue;
            }

            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| LoaderError::Read {
                    path: path.display().to_string(),
                    source,
                })?;

            let entries = Self::parse(&content);
            debug!("从 {} 解析了 {} 个变量", path.display(), entries.len());
            for (key, value) in entries {
                variables.entry(key).or_insert(Value::String(value));
            }
        }

        if options.expand_variables {
            Self::expand(&mut variables);
        }

        Ok(variables)
    }
}

/// 环境变量加载器选项
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnvironmentLoaderOptions {
    /// 只加载带此前缀的变量
    pub prefix: Option<String>,
    /// 是否去掉前缀
    #[serde(alias = "stripPrefix")]
    pub strip_prefix: bool,
    /// 是否把值解析为布尔、整数或浮点数
    #[serde(alias = "parseValues")]
    pub parse_values: bool,
}

/// 进程环境变量加载器
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentLoader;

impl EnvironmentLoader {
    /// 创建环境变量加载器
    pub fn new() -> Self {
        Self
    }

    /// 解析为最贴近的 JSON 类型
    pub fn parse_value(value: &str) -> Value {
        if let Ok(bool_val) = value.parse::<bool>() {
            Value::Bool(bool_val)
        } else if let Ok(int_val) = value.parse::<i64>() {
            Value::Number(serde_json::Number::from(int_val))
        } else if let Some(number) = value
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            Value::Number(number)
        } else {
            Value::String(value.to_string())
        }
    }
}

#[async_trait]
impl ConfigLoader for EnvironmentLoader {
    async fn load(&self, options: Option<&Value>) -> Result<VariableBag, BoxError> {
        let options: EnvironmentLoaderOptions = parse_options(options)?;
        let prefix = options.prefix.as_deref().unwrap_or("");

        let variables: VariableBag = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| {
                let key = if options.strip_prefix {
                    key[prefix.len()..].trim_start_matches('_').to_string()
                } else {
                    key
                };
                let value = if options.parse_values {
                    Self::parse_value(&value)
                } else {
                    Value::String(value)
                };
                (key, value)
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();

        debug!("加载了 {} 个环境变量，前缀: {}", variables.len(), prefix);
        Ok(variables)
    }
}

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// TOML
    Toml,
    /// JSON
    Json,
    /// YAML
    #[serde(alias = "yml")]
    Yaml,
}

impl FileFormat {
    /// 根据扩展名推断格式
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// 文件加载器选项
#[derive(Debug, Clone, Deserialize)]
pub struct FileLoaderOptions {
    /// 文件路径
    pub path: PathBuf,
    /// 文件格式，缺省时按扩展名推断
    #[serde(default)]
    pub format: Option<FileFormat>,
    /// 文件不存在时是否报错
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// TOML / JSON / YAML 文件加载器
///
/// 文件顶层的表作为变量集合。
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl FileLoader {
    /// 创建文件加载器
    pub fn new() -> Self {
        Self
    }

    /// 解析文件内容
    pub fn parse(content: &str, format: FileFormat, path: &Path) -> Result<VariableBag, LoaderError> {
        let parse_error = |message: String| LoaderError::Parse {
            path: path.display().to_string(),
            message,
        };

        let value = match format {
            FileFormat::Toml => {
                let table: toml::Value = toml::from_str(content).map_err(|e| parse_error(e.to_string()))?;
                toml_to_json(&table)
            }
            FileFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?,
            FileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        };

        match value {
            Value::Object(variables) => Ok(variables),
            Value::Null => Ok(VariableBag::new()),
            _ => Err(LoaderError::NotATable {
                path: path.display().to_string(),
            }),
        }
    }
}

#[async_trait]
impl ConfigLoader for FileLoader {
    async fn load(&self, options: Option<&Value>) -> Result<VariableBag, BoxError> {
        let options: FileLoaderOptions = serde_json::from_value(options.cloned().unwrap_or(Value::Null))
            .map_err(LoaderError::from)?;
        let path = options.path.as_path();
        let shown = path.display().to_string();

        let format = options
            .format
            .or_else(|| FileFormat::from_path(path))
            .ok_or_else(|| LoaderError::UnknownFormat {
                path: shown.clone(),
            })?;

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            if options.required {
                return Err(LoaderError::Missing { path: shown }.into());
            }
            debug!("跳过不存在的配置文件: {}", shown);
            return Ok(VariableBag::new());
        }

        debug!("加载配置文件: {}", shown);
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| LoaderError::Read {
                path: shown.clone(),
                source,
            })?;

        Ok(Self::parse(&content, format, path)?)
    }
}

/// 将 TOML 值转换为 JSON 值
fn toml_to_json(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Number(serde_json::Number::from(*i)),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Array(arr) => Value::Array(arr.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
    }
}
