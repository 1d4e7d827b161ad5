//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义类型描述符和发现阶段使用的基础类型。
//!
//! ## 核心接口
//!
//! - [`Injectable`] / [`TypeDescriptor`] - 类型向注入引擎描述自己的构造函数、字段和元数据
//! - [`ClassFilter`] - 可组合的类型过滤器
//! - [`Instance`] / [`Arguments`] / [`ExtraArg`] - 擦除后的实例与构造参数
//! - [`Injected`] - 字段注入槽位
//! - [`TypeResolver`] / [`TypeCatalog`] - 类型名称解析
//! - [`ResolveContext`] - 循环依赖检测

pub mod descriptor;
pub mod filter;
pub mod instance;
pub mod resolver;

pub use descriptor::*;
pub use filter::*;
pub use instance::*;
pub use resolver::*;

pub use infrastructure_common::{Lifetime, ProviderMetadata, TypeInfo};
