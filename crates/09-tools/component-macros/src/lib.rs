//! # Component Macros
//!
//! 为结构体生成 `di_abstractions::Injectable` 实现的派生宏。
//!
//! ## 使用示例
//!
//! ```ignore
//! use component_macros::Injectable;
//! use di_abstractions::Injected;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[service_provider(name = "console", lifetime = singleton, priority = 10)]
//! #[injectable(implements(dyn Greeter))]
//! pub struct ConsoleGreeter {
//!     #[inject]
//!     clock: Arc<dyn Clock>,
//!     #[inject(provider = "disk")]
//!     storage: Injected<dyn Storage>,
//!     #[arg]
//!     prefix: String,
//!     #[init(Vec::new)]
//!     history: Vec<String>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod injectable;
mod utils;

/// 派生 `Injectable`
///
/// # 类型属性
///
/// - `#[service_provider(name = "..", lifetime = singleton | transient, priority = N)]`
///   设置提供者元数据，不写参数时使用瞬态生命周期
/// - `#[injectable(implements(dyn A, dyn B), tag = "..")]` 声明实现的契约和标签
///
/// # 字段属性
///
/// - `#[inject]` / `#[inject(provider = "..")]` 用于 `Arc<C>` 时成为构造函数参数，
///   用于 `Injected<C>` 时成为字段注入点
/// - `#[arg]` 由调用方按位置提供的构造参数
/// - `#[init(path)]` 调用 `path()` 初始化
///
/// 其余字段使用 `Default::default()`。生成的构造函数总是带依赖注入标记。
#[proc_macro_derive(Injectable, attributes(service_provider, injectable, inject, init, arg))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::derive_injectable_impl(input).into()
}
