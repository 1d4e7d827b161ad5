//! 类型过滤器
//!
//! 发现阶段用于接受或拒绝候选的契约类型与提供者类型。

use crate::descriptor::TypeDescriptor;
use infrastructure_common::TypeInfo;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&TypeDescriptor) -> bool + Send + Sync>;

/// 基于类型描述符的谓词，可以用 `or` / `and` / `negate` 组合
///
/// 组合总是返回新的过滤器，不修改参与组合的过滤器。
#[derive(Clone)]
pub struct ClassFilter {
    predicate: Predicate,
    label: Arc<str>,
    accept_all: bool,
}

impl ClassFilter {
    /// 从闭包创建过滤器
    pub fn from_fn<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&TypeDescriptor) -> bool + Send + Sync + 'static,
    {
        let label: String = label.into();
        Self {
            predicate: Arc::new(predicate),
            label: Arc::from(label),
            accept_all: false,
        }
    }

    /// 接受所有类型的默认过滤器
    pub fn accept_all() -> Self {
        Self {
            predicate: Arc::new(|_: &TypeDescriptor| true),
            label: Arc::from("accept_all"),
            accept_all: true,
        }
    }

    /// 类型可以赋值给契约 `C`
    ///
    /// 契约描述符通过 `extends` 声明的父契约同样参与判断。
    pub fn implements<C: ?Sized + 'static>() -> Self {
        let target = TypeInfo::of::<C>();
        Self::from_fn(format!("implements({target})"), move |descriptor| {
            descriptor.is_assignable_to(&target)
        })
    }

    /// 类型带有提供者元数据
    pub fn has_provider_metadata() -> Self {
        Self::from_fn("has_provider_metadata", |descriptor| {
            descriptor.metadata().is_some()
        })
    }

    /// 类型带有指定标签
    pub fn has_tag(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self::from_fn(format!("has_tag({tag})"), move |descriptor| {
            descriptor.has_tag(&tag)
        })
    }

    /// 类型的完全限定名以指定模块路径开头
    pub fn in_module(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::from_fn(format!("in_module({prefix})"), move |descriptor| {
            descriptor.name().starts_with(prefix.as_str())
        })
    }

    /// 判断类型是否被接受
    pub fn accept(&self, descriptor: &TypeDescriptor) -> bool {
        (self.predicate)(descriptor)
    }

    /// 是否为默认的全部接受过滤器
    pub fn is_accept_all(&self) -> bool {
        self.accept_all
    }

    /// 逻辑或
    pub fn or(&self, other: &ClassFilter) -> ClassFilter {
        let (left, right) = (self.predicate.clone(), other.predicate.clone());
        Self {
            predicate: Arc::new(move |d: &TypeDescriptor| left(d) || right(d)),
            label: Arc::from(format!("({} | {})", self.label, other.label)),
            accept_all: self.accept_all || other.accept_all,
        }
    }

    /// 逻辑与
    pub fn and(&self, other: &ClassFilter) -> ClassFilter {
        let (left, right) = (self.predicate.clone(), other.predicate.clone());
        Self {
            predicate: Arc::new(move |d: &TypeDescriptor| left(d) && right(d)),
            label: Arc::from(format!("({} & {})", self.label, other.label)),
            accept_all: self.accept_all && other.accept_all,
        }
    }

    /// 逻辑非
    pub fn negate(&self) -> ClassFilter {
        let inner = self.predicate.clone();
        Self {
            predicate: Arc::new(move |d: &TypeDescriptor| !inner(d)),
            label: Arc::from(format!("!{}", self.label)),
            accept_all: false,
        }
    }
}

impl Default for ClassFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl fmt::Debug for ClassFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassFilter").field(&self.label).finish()
    }
}
