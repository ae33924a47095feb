//! 日志初始化

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// 安装全局 fmt 订阅者
///
/// `RUST_LOG` 优先于传入的默认级别。已经安装过订阅者时返回 `false`。
pub fn init_tracing(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();

    if installed {
        debug!("日志订阅者已安装，默认级别: {}", default_level);
    }
    installed
}
