//! # Infrastructure Common
//!
//! 服务注册表依赖注入引擎的公共类型。
//!
//! ## 核心内容
//!
//! - [`TypeInfo`] - 类型标识
//! - [`ProviderMetadata`] - 提供者名称、生命周期与优先级
//! - [`Lifetime`] - 瞬时 / 单例
//! - [`DependencyError`] 等错误类型

pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
