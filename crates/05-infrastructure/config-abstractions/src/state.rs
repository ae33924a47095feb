//! 加载状态

use std::fmt;

/// 首次加载的状态
///
/// 只允许 `Idle -> Loading -> Loaded`；重载不会改变状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    /// 尚未加载
    #[default]
    Idle,
    /// 正在加载
    Loading,
    /// 已加载
    Loaded,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        };
        f.write_str(name)
    }
}
