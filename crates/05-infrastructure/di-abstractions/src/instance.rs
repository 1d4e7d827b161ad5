//! 类型擦除后的实例与构造参数

use crate::descriptor::{Injectable, TypeDescriptor};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// 擦除后的共享实例
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// 由提供者创建的实例
///
/// 保存擦除后的值以及它的描述符，可以转换为描述符中声明过的任意契约。
#[derive(Clone)]
pub struct Instance {
    value: AnyArc,
    descriptor: Arc<TypeDescriptor>,
}

impl Instance {
    /// 创建新的实例包装
    pub fn new(value: AnyArc, descriptor: Arc<TypeDescriptor>) -> Self {
        Self { value, descriptor }
    }

    /// 包装一个已有的可注入值
    pub fn of<T: Injectable>(value: Arc<T>) -> Self {
        Self::new(value, Arc::new(T::descriptor()))
    }

    /// 具体类型信息
    pub fn type_info(&self) -> TypeInfo {
        self.descriptor.type_info()
    }

    /// 具体类型描述符
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// 转换为契约 `C`，具体类型未声明该契约时返回 `None`
    pub fn cast<C: ?Sized + 'static>(&self) -> Option<Arc<C>> {
        self.descriptor.upcast::<C>(self.value.clone())
    }

    /// 转换为具体类型 `T`
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    /// 擦除后的值
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    /// 是否指向同一个对象
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::as_ptr(&a.value).cast::<()>() == Arc::as_ptr(&b.value).cast::<()>()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.descriptor.name())
            .field("ptr", &Arc::as_ptr(&self.value).cast::<()>())
            .finish()
    }
}

/// 调用方提供的位置参数
pub struct ExtraArg {
    value: Box<dyn Any + Send>,
    type_info: TypeInfo,
}

impl ExtraArg {
    /// 包装一个参数值
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_info: TypeInfo::of::<T>(),
        }
    }

    /// 参数值的类型
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// 是否为指定类型
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    fn take<T: Any>(self) -> Result<T, Self> {
        let type_info = self.type_info;
        self.value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|value| Self { value, type_info })
    }
}

impl fmt::Debug for ExtraArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraArg")
            .field("type", &self.type_info.qualified_name())
            .finish_non_exhaustive()
    }
}

/// 构造 [`ExtraArg`] 列表
///
/// ```ignore
/// registry.load_class_with_args::<Echo>(extra_args!["Test".to_string(), 2])
/// ```
#[macro_export]
macro_rules! extra_args {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::ExtraArg::new($value)),*]
    };
}

/// 单个已解析的参数
#[derive(Debug)]
pub enum Argument {
    /// 从注册表解析出的服务
    Service(Instance),
    /// 调用方提供的值
    Value(ExtraArg),
}

/// 已解析的构造参数，按参数声明顺序排列
///
/// 构造闭包通过 [`Arguments::service`] 与 [`Arguments::value`] 依次取出参数。
#[derive(Debug, Default)]
pub struct Arguments {
    values: VecDeque<(String, Argument)>,
}

impl Arguments {
    /// 创建空参数列表
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加服务参数
    pub fn push_service(&mut self, param: impl Into<String>, instance: Instance) {
        self.values.push_back((param.into(), Argument::Service(instance)));
    }

    /// 追加值参数
    pub fn push_value(&mut self, param: impl Into<String>, value: ExtraArg) {
        self.values.push_back((param.into(), Argument::Value(value)));
    }

    /// 剩余参数数量
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有剩余参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 取出下一个服务参数的原始实例
    pub fn instance(&mut self) -> DependencyResult<Instance> {
        match self.values.pop_front() {
            Some((_, Argument::Service(instance))) => Ok(instance),
            Some((param, Argument::Value(value))) => Err(DependencyError::ArgumentTypeMismatch {
                param,
                expected: "service".to_string(),
                actual: value.type_info().qualified_name().to_string(),
            }),
            None => Err(DependencyError::MissingArgument {
                param: "<end>".to_string(),
                expected: "service".to_string(),
            }),
        }
    }

    /// 取出下一个服务参数并转换为契约 `C`
    pub fn service<C: ?Sized + 'static>(&mut self) -> DependencyResult<Arc<C>> {
        let expected = TypeInfo::of::<C>().qualified_name();
        match self.values.pop_front() {
            Some((param, Argument::Service(instance))) => {
                instance.cast::<C>().ok_or_else(|| DependencyError::ArgumentTypeMismatch {
                    param,
                    expected: expected.to_string(),
                    actual: instance.type_info().qualified_name().to_string(),
                })
            }
            Some((param, Argument::Value(value))) => Err(DependencyError::ArgumentTypeMismatch {
                param,
                expected: expected.to_string(),
                actual: value.type_info().qualified_name().to_string(),
            }),
            None => Err(DependencyError::MissingArgument {
                param: "<end>".to_string(),
                expected: expected.to_string(),
            }),
        }
    }

    /// 取出下一个值参数
    pub fn value<T: Any>(&mut self) -> DependencyResult<T> {
        let expected = TypeInfo::of::<T>().qualified_name();
        match self.values.pop_front() {
            Some((param, Argument::Value(value))) => {
                value.take::<T>().map_err(|value| DependencyError::ArgumentTypeMismatch {
                    param,
                    expected: expected.to_string(),
                    actual: value.type_info().qualified_name().to_string(),
                })
            }
            Some((param, Argument::Service(instance))) => {
                Err(DependencyError::ArgumentTypeMismatch {
                    param,
                    expected: expected.to_string(),
                    actual: instance.type_info().qualified_name().to_string(),
                })
            }
            None => Err(DependencyError::MissingArgument {
                param: "<end>".to_string(),
                expected: expected.to_string(),
            }),
        }
    }
}

/// 字段注入槽位
///
/// 只能写入一次，实例创建完成后由注入器通过共享引用写入。
pub struct Injected<C: ?Sized>(OnceLock<Arc<C>>);

impl<C: ?Sized> Injected<C> {
    /// 创建空槽位
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// 已注入的值
    pub fn get(&self) -> Option<&Arc<C>> {
        self.0.get()
    }

    /// 是否已注入
    pub fn is_injected(&self) -> bool {
        self.0.get().is_some()
    }

    /// 写入值，已有值时保持原值并返回 `false`
    pub fn set(&self, value: Arc<C>) -> bool {
        self.0.set(value).is_ok()
    }
}

impl<C: ?Sized> Default for Injected<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> fmt::Debug for Injected<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected")
            .field("injected", &self.is_injected())
            .finish()
    }
}
