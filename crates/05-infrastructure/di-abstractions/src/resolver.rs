//! 类型解析与解析上下文
//!
//! [`TypeResolver`] 把清单文件中读到的类型名称解析为描述符，
//! [`ResolveContext`] 记录一次解析过程中的构造链，用于检测循环依赖。

use crate::descriptor::{Injectable, TypeDescriptor};
use infrastructure_common::{DependencyError, TypeInfo};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 类型解析器 trait
///
/// 名称 → 类型描述符，找不到时返回 `None`。
pub trait TypeResolver: Send + Sync {
    /// 解析指定名称的类型
    fn resolve(&self, type_name: &str) -> Option<Arc<TypeDescriptor>>;
}

/// 内存中的类型目录
///
/// 同时以 `a::b::C` 和 `a.b.C` 两种形式登记每个类型。
#[derive(Default)]
pub struct TypeCatalog {
    types: RwLock<HashMap<String, Arc<TypeDescriptor>>>,
}

impl TypeCatalog {
    /// 创建空目录
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记类型描述符，同名时后登记的覆盖先登记的
    pub fn register(&self, descriptor: impl Into<Arc<TypeDescriptor>>) {
        let descriptor = descriptor.into();
        let name = descriptor.name();
        debug!("登记类型: {}", name);
        let mut types = self.types.write();
        types.insert(name.replace("::", "."), descriptor.clone());
        types.insert(name.to_string(), descriptor);
    }

    /// 登记可注入类型
    pub fn register_type<T: Injectable>(&self) {
        self.register(T::descriptor());
    }

    /// 构建器风格的登记
    pub fn with(self, descriptor: impl Into<Arc<TypeDescriptor>>) -> Self {
        self.register(descriptor);
        self
    }

    /// 是否包含指定名称
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name.trim())
    }

    /// 已登记的类型数量
    pub fn len(&self) -> usize {
        self.types
            .read()
            .values()
            .map(|d| d.type_info().id)
            .collect::<std::collections::HashSet<_>>()
            .len()
    }

    /// 目录是否为空
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl TypeResolver for TypeCatalog {
    fn resolve(&self, type_name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(type_name.trim()).cloned()
    }
}

/// 解析上下文
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    /// 当前解析链，用于检测循环依赖
    pub resolution_chain: Vec<TypeInfo>,
    /// 解析选项
    pub options: ResolveOptions,
}

impl ResolveContext {
    /// 创建新的解析上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定选项创建解析上下文
    pub fn with_options(options: ResolveOptions) -> Self {
        Self {
            resolution_chain: Vec::new(),
            options,
        }
    }

    /// 添加类型到解析链
    pub fn push_type(&mut self, type_info: TypeInfo) -> Result<(), DependencyError> {
        if self.resolution_chain.contains(&type_info) {
            return Err(DependencyError::CircularDependency {
                dependency_chain: self.describe_chain(Some(type_info)),
            });
        }
        if self.resolution_chain.len() >= self.options.max_depth {
            return Err(DependencyError::CircularDependency {
                dependency_chain: format!(
                    "超过最大解析深度 {}: {}",
                    self.options.max_depth,
                    self.describe_chain(Some(type_info))
                ),
            });
        }
        self.resolution_chain.push(type_info);
        Ok(())
    }

    /// 从解析链中移除类型
    pub fn pop_type(&mut self) {
        self.resolution_chain.pop();
    }

    /// 当前解析深度
    pub fn depth(&self) -> usize {
        self.resolution_chain.len()
    }

    fn describe_chain(&self, next: Option<TypeInfo>) -> String {
        self.resolution_chain
            .iter()
            .chain(next.iter())
            .map(|t| t.qualified_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// 解析选项
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// 最大递归深度
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}
