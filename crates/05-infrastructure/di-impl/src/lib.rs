//! # 依赖注入具体实现
//!
//! 基于服务注册表的依赖注入引擎：
//!
//! - [`ServiceRegistry`] - 聚合根，持有服务与扫描器
//! - [`Service`] / [`Provider`] - 契约及其实现
//! - [`Injector`] - 构造函数选择、参数解析与字段注入
//! - [`Scanner`] - 模块描述符、清单文件与显式定义三种发现方式
//!
//! ```ignore
//! let registry = ServiceRegistry::new();
//! registry.load();
//! let greeter = registry.load_service_provider::<dyn Greeter>()?;
//! ```

pub mod injector;
pub mod provider;
pub mod registry;
pub mod scanner;
pub mod service;

pub use injector::*;
pub use provider::*;
pub use registry::*;
pub use scanner::*;
pub use service::*;

#[cfg(test)]
mod tests;
