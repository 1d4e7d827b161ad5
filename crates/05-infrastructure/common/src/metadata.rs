//! 元数据定义
//!
//! 提供类型标识和提供者元数据

use crate::lifecycle::Lifetime;
use std::any::TypeId;
use std::fmt;

/// 类型信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// 类型名称（`std::any::type_name` 的结果）
    pub name: &'static str,
    /// 类型ID
    pub id: TypeId,
}

impl TypeInfo {
    /// 从类型获取类型信息，支持 `dyn Trait`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// 完全限定名称，去掉 `dyn ` 前缀
    pub fn qualified_name(&self) -> &'static str {
        self.name.strip_prefix("dyn ").unwrap_or(self.name)
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        let name = self.qualified_name();
        name.rsplit("::").next().unwrap_or(name)
    }

    /// 判断是否为指定类型
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}

/// 提供者元数据
///
/// 带有元数据的提供者在选择默认提供者时优先于没有元数据的提供者。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// 提供者名称，为空时使用具体类型的完全限定名
    pub name: Option<String>,
    /// 生命周期
    pub lifetime: Lifetime,
    /// 优先级，数值越大越优先
    pub priority: i32,
}

impl ProviderMetadata {
    /// 默认优先级
    pub const DEFAULT_PRIORITY: i32 = 1;

    /// 创建新的提供者元数据
    pub fn new(lifetime: Lifetime) -> Self {
        Self {
            name: None,
            lifetime,
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    /// 设置提供者名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Default for ProviderMetadata {
    fn default() -> Self {
        Self::new(Lifetime::default())
    }
}
