//! 基于 tokio 和 cron 表达式的调度器

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use chrono_tz::Tz;
use config_abstractions::{CronScheduler, ScheduleOptions, ScheduledTask};
use cron::Schedule;
use infrastructure_common::ConfigError;
use parking_lot::Mutex;
use std::str::FromStr;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 调度时区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleTimezone {
    /// 协调世界时
    #[default]
    Utc,
    /// 本地时区
    Local,
    /// 固定偏移
    Fixed(FixedOffset),
    /// IANA 时区，例如 `America/New_York`
    Named(Tz),
}

impl FromStr for ScheduleTimezone {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed {
            "UTC" | "utc" | "Etc/UTC" | "GMT" | "Etc/GMT" | "Z" => return Ok(Self::Utc),
            "Local" | "local" => return Ok(Self::Local),
            _ => {}
        }

        parse_offset(trimmed)
            .map(Self::Fixed)
            .or_else(|| trimmed.parse::<Tz>().ok().map(Self::Named))
            .ok_or_else(|| ConfigError::InvalidTimezone {
                timezone: value.to_string(),
            })
    }
}

/// 解析 `+08:00`、`-0530`、`+8` 形式的偏移
fn parse_offset(value: &str) -> Option<FixedOffset> {
    let (sign, digits) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };

    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((hours, minutes)) => (hours, minutes),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

impl ScheduleTimezone {
    /// 严格晚于 `after` 的下一次触发时间
    fn next_after(self, schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Utc => next_in(schedule, &Utc, after),
            Self::Local => next_in(schedule, &Local, after),
            Self::Fixed(offset) => next_in(schedule, &offset, after),
            Self::Named(zone) => next_in(schedule, &zone, after),
        }
    }
}

fn next_in<Tz: TimeZone>(
    schedule: &Schedule,
    timezone: &Tz,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    schedule
        .after(&after.with_timezone(timezone))
        .next()
        .map(|next| next.with_timezone(&Utc))
}

/// tokio cron 调度器
///
/// 每次注册启动一个后台任务，休眠到下一次触发时间后执行回调。
/// 接受五段（分钟起始）和六、七段（秒起始）的 cron 表达式。
#[derive(Debug, Default)]
pub struct TokioCronScheduler {
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioCronScheduler {
    /// 创建调度器
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 cron 表达式
    pub fn parse(expression: &str) -> Result<Schedule, cron::error::Error> {
        Schedule::from_str(&Self::normalize(expression))
    }

    /// 五段表达式补上秒字段
    fn normalize(expression: &str) -> String {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() == 5 {
            format!("0 {}", fields.join(" "))
        } else {
            fields.join(" ")
        }
    }

    /// 仍在运行的调度任务数
    pub fn active_tasks(&self) -> usize {
        self.tasks.lock().iter().filter(|task| !task.is_finished()).count()
    }

    /// 停止所有调度任务
    pub fn shutdown(&self) {
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        info!("停止 {} 个调度任务", tasks.len());
        for task in tasks {
            task.abort();
        }
    }
}

impl CronScheduler for TokioCronScheduler {
    fn validate(&self, expression: &str) -> bool {
        Self::parse(expression).is_ok()
    }

    fn schedule(
        &self,
        expression: &str,
        task: ScheduledTask,
        options: ScheduleOptions,
    ) -> Result<(), ConfigError> {
        let schedule = Self::parse(expression).map_err(ConfigError::parse)?;
        let timezone = options
            .timezone
            .as_deref()
            .map(str::parse::<ScheduleTimezone>)
            .transpose()?
            .unwrap_or_default();
        let runtime = Handle::try_current().map_err(|e| ConfigError::SchedulerUnavailable {
            message: e.to_string(),
        })?;

        debug!("注册调度任务: {} ({:?})", expression, timezone);
        let expression = expression.to_string();

        let handle = runtime.spawn(async move {
            let mut after = Utc::now();
            loop {
                let Some(next) = timezone.next_after(&schedule, after) else {
                    warn!("调度表达式没有后续触发时间: {}", expression);
                    break;
                };

                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(delay).await;

                task().await;
                // 回调耗时超过间隔时跳过错过的触发点
                after = Utc::now().max(next);
            }
        });

        self.tasks.lock().push(handle);
        Ok(())
    }
}

impl Drop for TokioCronScheduler {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
