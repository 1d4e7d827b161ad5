//! 提供者生命周期

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 提供者实例的生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// 瞬时模式 - 每次请求都创建新实例
    #[default]
    Transient,
    /// 单例模式 - 首次请求时创建并缓存，之后一直返回同一实例
    Singleton,
}

impl Lifetime {
    /// 生命周期名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Singleton => "singleton",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transient" => Ok(Self::Transient),
            "singleton" => Ok(Self::Singleton),
            other => Err(format!("未知的生命周期: {other}")),
        }
    }
}
