//! 基于策略的配置管理器实现

use crate::pipeline::retrieve_variables;
use crate::stores::store_for;
use crate::tracer::{
    DebugTracer, ASSIGNING_TO_CACHE, ASSIGNING_TO_PROCESS_ENV, FIRST_LOAD_REQUESTED,
    LOAD_REQUEST_IGNORED_DUE_ALREADY_LOADED, LOAD_REQUEST_IGNORED_DUE_IN_PROGRESS,
    NOT_LOADED_STRATEGY_DISABLED, RELOADING_BY_SCHEDULER, STARTING_RELOAD, STARTING_STRATEGY,
};
use crate::view::{ConfigView, LiveView};
use config_abstractions::{
    ConfigLoaderStrategy, ConfigManagerOptions, CronScheduler, LoadState, ScheduleOptions,
    ScheduledTask, VariableBag, VariableStore,
};
use infrastructure_common::{ConfigError, ConfigResult, StrategyIdentifier};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{error, info};

/// 策略配置管理器
///
/// 按声明顺序执行策略，把结果写入缓存或进程环境变量，并负责首次加载的状态机、
/// 重载以及调度注册。克隆得到的句柄共享同一份状态。
#[derive(Clone)]
pub struct StrategyConfigManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    strategies: Vec<ConfigLoaderStrategy>,
    store: Arc<dyn VariableStore>,
    scheduler: Arc<dyn CronScheduler>,
    state: watch::Sender<LoadState>,
    tracer: DebugTracer,
    cache_enabled: bool,
    /// 已向调度器注册过的策略下标，失败后重试首次加载时跳过
    scheduled: Mutex<HashSet<usize>>,
}

impl fmt::Debug for StrategyConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyConfigManager")
            .field("strategies_count", &self.inner.strategies.len())
            .field("store", &self.inner.store.name())
            .field("state", &self.state())
            .field("cache_enabled", &self.inner.cache_enabled)
            .field("debug", &self.inner.tracer.is_enabled())
            .finish()
    }
}

impl StrategyConfigManager {
    /// 创建配置管理器，存储介质在此时选定
    pub fn new(options: ConfigManagerOptions, scheduler: Arc<dyn CronScheduler>) -> Self {
        let ConfigManagerOptions {
            cache,
            debug,
            strategies,
        } = options;

        let store = store_for(cache);
        info!(
            "创建配置管理器: {} 个策略, 存储: {}",
            strategies.len(),
            store.name()
        );

        let (state, _) = watch::channel(LoadState::Idle);

        Self {
            inner: Arc::new(ManagerInner {
                strategies,
                store,
                scheduler,
                state,
                tracer: DebugTracer::new(debug),
                cache_enabled: cache,
                scheduled: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// 首次加载变量
    ///
    /// 只有第一次调用会执行策略，其余调用直接返回。`ensure_load` 为 `true` 时，
    /// 若已有加载过程正在进行，则等待其完成；该过程失败时返回 [`ConfigError::LoadInterrupted`]。
    pub async fn load(&self, ensure_load: bool) -> ConfigResult<()> {
        let tracer = self.inner.tracer;
        let mut receiver = self.inner.state.subscribe();

        loop {
            if self.try_begin_loading() {
                tracer.trace_all(FIRST_LOAD_REQUESTED);

                let guard = LoadingGuard::new(&self.inner.state);
                self.inner.load_variables(false).await?;
                guard.complete();

                info!("配置变量加载完成");
                return Ok(());
            }

            let observed = *receiver.borrow_and_update();
            match observed {
                LoadState::Loaded => {
                    tracer.trace_all(LOAD_REQUEST_IGNORED_DUE_ALREADY_LOADED);
                    return Ok(());
                }
                LoadState::Loading => {
                    tracer.trace_all(LOAD_REQUEST_IGNORED_DUE_IN_PROGRESS);
                    if !ensure_load {
                        return Ok(());
                    }
                    return Self::wait_until_loaded(receiver).await;
                }
                // 上一次加载刚刚失败，重新尝试
                LoadState::Idle => continue,
            }
        }
    }

    fn try_begin_loading(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            if *state == LoadState::Idle {
                *state = LoadState::Loading;
                true
            } else {
                false
            }
        })
    }

    async fn wait_until_loaded(mut receiver: watch::Receiver<LoadState>) -> ConfigResult<()> {
        loop {
            let observed = *receiver.borrow_and_update();
            match observed {
                LoadState::Loaded => return Ok(()),
                LoadState::Idle => return Err(ConfigError::LoadInterrupted),
                LoadState::Loading => {}
            }

            if receiver.changed().await.is_err() {
                return Err(ConfigError::LoadInterrupted);
            }
        }
    }

    /// 重新加载变量
    ///
    /// 指定标识时只重载第一个匹配且可重载的策略，找不到时什么也不做；
    /// 未指定时重载全部可重载策略。重载不改变加载状态，也不重新注册调度。
    pub async fn reload(&self, identifier: Option<&StrategyIdentifier>) -> ConfigResult<()> {
        match identifier {
            Some(identifier) => {
                let Some(strategy) = self
                    .inner
                    .strategies
                    .iter()
                    .find(|strategy| strategy.is_identified_by(identifier))
                else {
                    return Ok(());
                };

                if strategy.reloadable {
                    self.inner
                        .tracer
                        .trace(STARTING_RELOAD, strategy.identifier.as_ref());
                    self.inner.load_variables_by_strategy(strategy).await?;
                }
                Ok(())
            }
            None => {
                self.inner.tracer.trace_all(STARTING_RELOAD);
                self.inner.load_variables(true).await
            }
        }
    }

    /// 按路径读取变量
    pub fn get(&self, path: &str) -> Option<Value> {
        self.inner.store.get(path)
    }

    /// 按路径读取变量，不存在时返回默认值
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        self.get(path).unwrap_or(default)
    }

    /// 按路径读取并反序列化变量
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<Option<T>> {
        self.get(path)
            .map(|value| {
                serde_json::from_value(value).map_err(|e| ConfigError::TypeConversionError {
                    message: format!("{}: {}", path, e),
                })
            })
            .transpose()
    }

    /// 路径上是否存在变量
    pub fn has(&self, path: &str) -> bool {
        self.inner.store.has(path)
    }

    /// 获取变量视图
    ///
    /// 对象值返回实时视图，每次访问都重新解析路径，重载后可以看到新值；
    /// 其他值返回调用时的快照。
    pub fn get_proxy_of(&self, path: &str, default: Option<Value>) -> ConfigView {
        match self.get(path) {
            Some(Value::Object(_)) => {
                ConfigView::Live(LiveView::new(Arc::clone(&self.inner.store), path, default))
            }
            Some(value) => ConfigView::Snapshot(value),
            None => ConfigView::Snapshot(default.unwrap_or(Value::Null)),
        }
    }

    /// 当前加载状态
    pub fn state(&self) -> LoadState {
        *self.inner.state.borrow()
    }

    /// 是否已完成首次加载
    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// 订阅加载状态变化
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.inner.state.subscribe()
    }

    /// 当前使用的存储
    pub fn store(&self) -> &Arc<dyn VariableStore> {
        &self.inner.store
    }
}

impl ManagerInner {
    /// 按声明顺序执行策略
    ///
    /// 首次加载时先校验所有需要调度的表达式，任何一个无效都会在写入变量之前失败，
    /// 然后逐个执行策略并注册调度。
    async fn load_variables(self: &Arc<Self>, only_reloadable: bool) -> ConfigResult<()> {
        if !only_reloadable {
            self.validate_schedules()?;
        }

        for (index, strategy) in self.strategies.iter().enumerate() {
            if only_reloadable && !strategy.reloadable {
                continue;
            }

            self.tracer
                .trace(STARTING_STRATEGY, strategy.identifier.as_ref());
            self.load_variables_by_strategy(strategy).await?;

            if !only_reloadable {
                if let Some(expression) = strategy.schedulable_expression() {
                    self.register_schedule(index, expression)?;
                }
            }
        }

        Ok(())
    }

    fn validate_schedules(&self) -> ConfigResult<()> {
        for strategy in &self.strategies {
            if let Some(expression) = strategy.schedulable_expression() {
                if !self.scheduler.validate(expression) {
                    return Err(ConfigError::InvalidSchedule {
                        identifier: strategy.identifier.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn load_variables_by_strategy(&self, strategy: &ConfigLoaderStrategy) -> ConfigResult<()> {
        let identifier = strategy.identifier.as_ref();

        if strategy.disable {
            self.tracer.trace(NOT_LOADED_STRATEGY_DISABLED, identifier);
            return Ok(());
        }

        let variables = retrieve_variables(strategy, self.tracer).await?;
        self.assign_variables(strategy, variables);
        Ok(())
    }

    fn assign_variables(&self, strategy: &ConfigLoaderStrategy, variables: VariableBag) {
        let message = if self.cache_enabled {
            ASSIGNING_TO_CACHE
        } else {
            ASSIGNING_TO_PROCESS_ENV
        };
        self.tracer.trace(message, strategy.identifier.as_ref());

        match &strategy.register_as {
            Some(key) => self.store.set(key, Value::Object(variables)),
            None => {
                for (key, value) in variables {
                    self.store.set(&key, value);
                }
            }
        }
    }

    fn register_schedule(self: &Arc<Self>, index: usize, expression: &str) -> ConfigResult<()> {
        let mut scheduled = self.scheduled.lock();
        if scheduled.contains(&index) {
            return Ok(());
        }

        let strategy = &self.strategies[index];
        let weak: Weak<ManagerInner> = Arc::downgrade(self);
        let task: ScheduledTask = Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };

                let strategy = &inner.strategies[index];
                inner
                    .tracer
                    .trace(RELOADING_BY_SCHEDULER, strategy.identifier.as_ref());

                if let Err(e) = inner.load_variables_by_strategy(strategy).await {
                    error!("调度重载失败: {}", e);
                }
            })
        });

        self.scheduler.schedule(
            expression,
            task,
            ScheduleOptions::with_timezone(strategy.schedule_timezone.clone()),
        )?;
        scheduled.insert(index);
        Ok(())
    }
}

/// 首次加载过程的状态守卫
///
/// 未调用 [`LoadingGuard::complete`] 就被丢弃时（加载失败或被取消），状态回到 `Idle`。
struct LoadingGuard<'a> {
    state: &'a watch::Sender<LoadState>,
    completed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(state: &'a watch::Sender<LoadState>) -> Self {
        Self {
            state,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.completed = true;
        self.state.send_replace(LoadState::Loaded);
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.state.send_replace(LoadState::Idle);
        }
    }
}
