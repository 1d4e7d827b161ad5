//! # 基础设施组合层
//!
//! 负责在进程最外层把服务注册表组装起来：
//!
//! - **启动选项**: 可赋值性检查、过滤器、附加扫描器与显式服务定义
//! - **启动配置**: 从配置文件与环境变量读取启动设置
//! - **服务管理器**: 进程范围的注册表持有者
//! - **日志**: 基于 `tracing-subscriber` 的初始化
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{init_logging, BootstrapSettings, LoggingConfig, ServiceManager};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging(&LoggingConfig::default())?;
//!
//!     let settings = BootstrapSettings::load(None)?;
//!     let registry = ServiceManager::new_instance(settings.to_options_builder().build()?)?;
//!     println!("已加载 {} 个服务", registry.service_count());
//!
//!     Ok(())
//! }
//! ```

pub mod bootstrapper;
pub mod config_sources;
pub mod logging;
pub mod manager;

// 重新导出主要类型
pub use bootstrapper::{BootstrapOptions, BootstrapOptionsBuilder, RegistryBootstrap};
pub use config_sources::{BootstrapSettings, ENV_PREFIX};
pub use logging::{init_logging, LoggingConfig};
pub use manager::ServiceManager;

// 重新导出错误类型
pub use infrastructure_common::InfrastructureError;

#[cfg(test)]
mod tests;
