//! 类型描述符
//!
//! 描述一个类型能够被注入引擎使用的全部能力：可赋值的契约、提供者元数据、
//! 构造函数以及需要字段注入的字段。具体类型通过实现 [`Injectable`]
//! （手写或 `#[derive(Injectable)]`）提供自己的描述符。

use crate::instance::{AnyArc, Arguments, Injected, Instance};
use infrastructure_common::{BoxError, DependencyError, ProviderMetadata, TypeInfo};
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 把擦除后的实例视为契约 `C` 的转换函数
pub(crate) type Upcast<C> = Arc<dyn Fn(AnyArc) -> Option<Arc<C>> + Send + Sync>;

type Invoker = Arc<dyn Fn(&mut Arguments) -> Result<AnyArc, BoxError> + Send + Sync>;

type FieldWriter =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &Instance) -> Result<(), DependencyError> + Send + Sync>;

/// 可注入类型
///
/// 实现者描述自己的构造函数、字段和元数据，注入器据此创建实例。
pub trait Injectable: Any + Send + Sync {
    /// 返回类型描述符
    fn descriptor() -> TypeDescriptor;
}

/// 描述符种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// 抽象契约（通常是 `dyn Trait`）
    Contract,
    /// 可实例化的具体类型
    Concrete,
}

/// 父类型条目
#[derive(Clone)]
struct Supertype {
    info: TypeInfo,
    // 具体类型保存 `Upcast<C>`，契约之间的继承关系没有转换函数
    upcast: Option<Arc<dyn Any + Send + Sync>>,
}

/// 类型描述符
#[derive(Clone)]
pub struct TypeDescriptor {
    type_info: TypeInfo,
    kind: TypeKind,
    supertypes: Vec<Supertype>,
    metadata: Option<ProviderMetadata>,
    tags: Vec<String>,
    constructors: Vec<ConstructorDescriptor>,
    fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// 开始构建具体类型 `T` 的描述符
    pub fn builder<T: Any + Send + Sync>() -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder::new()
    }

    /// 开始构建契约 `C` 的描述符
    pub fn contract<C: ?Sized + 'static>() -> ContractBuilder {
        ContractBuilder {
            descriptor: Self::empty(TypeInfo::of::<C>(), TypeKind::Contract),
        }
    }

    fn empty(type_info: TypeInfo, kind: TypeKind) -> Self {
        Self {
            type_info,
            kind,
            supertypes: Vec::new(),
            metadata: None,
            tags: Vec::new(),
            constructors: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// 类型信息
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// 完全限定名称
    pub fn name(&self) -> &'static str {
        self.type_info.qualified_name()
    }

    /// 描述符种类
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// 是否为契约
    pub fn is_contract(&self) -> bool {
        self.kind == TypeKind::Contract
    }

    /// 声明的父类型（不含自身）
    pub fn supertypes(&self) -> impl Iterator<Item = TypeInfo> + '_ {
        self.supertypes
            .iter()
            .map(|s| s.info)
            .filter(move |info| info.id != self.type_info.id)
    }

    /// 是否可以赋值给指定类型
    pub fn is_assignable_to(&self, target: &TypeInfo) -> bool {
        self.type_info.id == target.id || self.supertypes.iter().any(|s| s.info.id == target.id)
    }

    /// 泛型版本的 [`Self::is_assignable_to`]
    pub fn is_assignable_to_type<C: ?Sized + 'static>(&self) -> bool {
        self.is_assignable_to(&TypeInfo::of::<C>())
    }

    /// 提供者元数据
    pub fn metadata(&self) -> Option<&ProviderMetadata> {
        self.metadata.as_ref()
    }

    /// 标签
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// 是否带有指定标签
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// 构造函数（声明顺序）
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// 需要字段注入的字段
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// 把擦除后的值转换为契约 `C`
    pub(crate) fn upcast<C: ?Sized + 'static>(&self, value: AnyArc) -> Option<Arc<C>> {
        let id = TypeId::of::<C>();
        let upcast = self
            .supertypes
            .iter()
            .find(|s| s.info.id == id)?
            .upcast
            .as_ref()?
            .downcast_ref::<Upcast<C>>()?;
        upcast(value)
    }

    fn push_supertype(&mut self, supertype: Supertype) {
        self.supertypes.retain(|s| s.info.id != supertype.info.id);
        self.supertypes.push(supertype);
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_info.id == other.type_info.id
    }
}

impl Eq for TypeDescriptor {}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name())
            .field("kind", &self.kind)
            .field(
                "supertypes",
                &self.supertypes().map(|s| s.qualified_name()).collect::<Vec<_>>(),
            )
            .field("metadata", &self.metadata)
            .field("tags", &self.tags)
            .field("constructors", &self.constructors)
            .field("fields", &self.fields)
            .finish()
    }
}

/// 具体类型描述符构建器
pub struct TypeDescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TypeDescriptorBuilder<T> {
    fn new() -> Self {
        let mut descriptor = TypeDescriptor::empty(TypeInfo::of::<T>(), TypeKind::Concrete);
        let identity: Upcast<T> = Arc::new(|value: AnyArc| value.downcast::<T>().ok());
        descriptor.push_supertype(Supertype {
            info: TypeInfo::of::<T>(),
            upcast: Some(Arc::new(identity)),
        });
        Self {
            descriptor,
            _marker: PhantomData,
        }
    }

    /// 声明 `T` 实现了契约 `C`
    ///
    /// ```ignore
    /// .implements::<dyn Greeter>(|this| this)
    /// ```
    pub fn implements<C: ?Sized + 'static>(mut self, upcast: fn(Arc<T>) -> Arc<C>) -> Self {
        let erased: Upcast<C> =
            Arc::new(move |value: AnyArc| value.downcast::<T>().ok().map(upcast));
        self.descriptor.push_supertype(Supertype {
            info: TypeInfo::of::<C>(),
            upcast: Some(Arc::new(erased)),
        });
        self
    }

    /// 设置提供者元数据
    pub fn service_provider(mut self, metadata: ProviderMetadata) -> Self {
        self.descriptor.metadata = Some(metadata);
        self
    }

    /// 添加标签
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.descriptor.tags.push(tag.into());
        self
    }

    /// 追加构造函数，按调用顺序保存
    pub fn constructor(mut self, constructor: Constructor<T>) -> Self {
        self.descriptor.constructors.push(ConstructorDescriptor {
            params: constructor.params,
            dependency_injection: constructor.dependency_injection,
            invoke: constructor.invoke,
        });
        self
    }

    /// 声明一个字段注入点
    pub fn field<C: ?Sized + 'static>(
        self,
        name: impl Into<String>,
        slot: fn(&T) -> &Injected<C>,
    ) -> Self {
        self.push_field(name.into(), None, slot)
    }

    /// 声明一个指定提供者名称的字段注入点
    pub fn named_field<C: ?Sized + 'static>(
        self,
        name: impl Into<String>,
        provider: impl Into<String>,
        slot: fn(&T) -> &Injected<C>,
    ) -> Self {
        self.push_field(name.into(), Some(provider.into()), slot)
    }

    fn push_field<C: ?Sized + 'static>(
        mut self,
        name: String,
        provider_name: Option<String>,
        slot: fn(&T) -> &Injected<C>,
    ) -> Self {
        let write: FieldWriter = Arc::new(move |target: &(dyn Any + Send + Sync), value: &Instance| {
            let this = target.downcast_ref::<T>().ok_or_else(|| {
                DependencyError::assignability(
                    TypeInfo::of::<T>().qualified_name(),
                    value.type_info().qualified_name(),
                )
            })?;
            let cast = value.cast::<C>().ok_or_else(|| {
                DependencyError::assignability(
                    TypeInfo::of::<C>().qualified_name(),
                    value.type_info().qualified_name(),
                )
            })?;
            slot(this).set(cast);
            Ok(())
        });
        self.descriptor.fields.push(FieldDescriptor {
            name,
            type_info: TypeInfo::of::<C>(),
            provider_name,
            write,
        });
        self
    }

    /// 完成构建
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// 契约描述符构建器
pub struct ContractBuilder {
    descriptor: TypeDescriptor,
}

impl ContractBuilder {
    /// 声明该契约继承自契约 `S`
    pub fn extends<S: ?Sized + 'static>(mut self) -> Self {
        self.descriptor.push_supertype(Supertype {
            info: TypeInfo::of::<S>(),
            upcast: None,
        });
        self
    }

    /// 添加标签
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.descriptor.tags.push(tag.into());
        self
    }

    /// 完成构建
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// 构造函数参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDescriptor {
    /// 参数名称
    pub name: String,
    /// 参数类型
    pub type_info: TypeInfo,
    /// 指定的提供者名称
    pub provider_name: Option<String>,
}

/// 构造函数描述
#[derive(Clone)]
pub struct ConstructorDescriptor {
    params: Vec<ParamDescriptor>,
    dependency_injection: bool,
    invoke: Invoker,
}

impl ConstructorDescriptor {
    /// 参数列表（声明顺序）
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// 是否标记为依赖注入构造函数
    pub fn is_dependency_injection(&self) -> bool {
        self.dependency_injection
    }

    /// 调用构造函数
    pub fn invoke(&self, args: &mut Arguments) -> Result<AnyArc, BoxError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .field("dependency_injection", &self.dependency_injection)
            .finish_non_exhaustive()
    }
}

/// 构造函数构建器
///
/// 参数按 [`Self::param`] 的调用顺序声明，构造闭包按相同顺序从 [`Arguments`] 取值。
pub struct Constructor<T> {
    params: Vec<ParamDescriptor>,
    dependency_injection: bool,
    invoke: Invoker,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> Constructor<T> {
    /// 用构造闭包创建构造函数
    pub fn new<F>(construct: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            dependency_injection: false,
            invoke: Arc::new(move |args: &mut Arguments| {
                construct(args).map(|value| Arc::new(value) as AnyArc)
            }),
            _marker: PhantomData,
        }
    }

    /// 声明一个参数
    pub fn param<P: ?Sized + 'static>(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            type_info: TypeInfo::of::<P>(),
            provider_name: None,
        });
        self
    }

    /// 声明一个要求指定提供者的参数
    pub fn named_param<P: ?Sized + 'static>(
        mut self,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            type_info: TypeInfo::of::<P>(),
            provider_name: Some(provider.into()),
        });
        self
    }

    /// 标记为依赖注入构造函数
    ///
    /// 可用构造函数中优先选择带此标记的，混合参数构造也只使用带此标记的构造函数。
    pub fn dependency_injection(mut self) -> Self {
        self.dependency_injection = true;
        self
    }
}

/// 字段注入点
#[derive(Clone)]
pub struct FieldDescriptor {
    /// 字段名称
    pub name: String,
    /// 字段所需的契约类型
    pub type_info: TypeInfo,
    /// 指定的提供者名称
    pub provider_name: Option<String>,
    write: FieldWriter,
}

impl FieldDescriptor {
    /// 把服务实例写入目标对象的字段
    pub fn assign(&self, target: &Instance, value: &Instance) -> Result<(), DependencyError> {
        (self.write)(target.as_any(), value)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type_info", &self.type_info)
            .field("provider_name", &self.provider_name)
            .finish_non_exhaustive()
    }
}
