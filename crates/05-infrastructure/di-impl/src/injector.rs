//! 注入器：构造函数选择、参数解析与字段注入
//!
//! 构造流程分两段：先选择构造函数并解析参数后调用，再为实例的注入字段赋值。
//! 注入器本身不缓存任何实例，单例缓存由 [`Provider`](crate::Provider) 负责。

use crate::registry::ServiceRegistry;
use crate::scanner::ModuleDescriptor;
use di_abstractions::{
    Arguments, Constructor, ConstructorDescriptor, ExtraArg, Injectable, Instance,
    ResolveContext, TypeDescriptor,
};
use infrastructure_common::{
    DependencyError, DependencyResult, Lifetime, ProviderMetadata, TypeInfo,
};
use linkme::distributed_slice;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tracing::debug;

/// 注入器
///
/// 本身也作为单例服务注册在内置的 `di-impl` 模块中，名称为 `Injector`。
pub struct Injector {
    registry: Weak<ServiceRegistry>,
}

impl Injector {
    /// 提供者名称
    pub const PROVIDER_NAME: &'static str = "Injector";

    /// 创建绑定到注册表的注入器
    pub fn new(registry: &Arc<ServiceRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }

    /// 绑定的注册表
    pub fn registry(&self) -> DependencyResult<Arc<ServiceRegistry>> {
        self.registry
            .upgrade()
            .ok_or(DependencyError::RegistryUnavailable)
    }

    /// 选择构造函数
    pub fn find_constructor<'a>(
        &self,
        descriptor: &'a TypeDescriptor,
    ) -> DependencyResult<&'a ConstructorDescriptor> {
        select_constructor(&*self.registry()?, descriptor)
    }

    /// 创建实例并完成字段注入
    pub fn create_instance(&self, descriptor: &Arc<TypeDescriptor>) -> DependencyResult<Instance> {
        let registry = self.registry()?;
        let mut ctx = ResolveContext::new();
        ctx.push_type(descriptor.type_info())?;
        let result = construct(&registry, descriptor, &mut ctx)
            .and_then(|instance| inject_fields(&registry, &instance, &mut ctx).map(|_| instance));
        ctx.pop_type();
        result
    }

    /// 使用混合参数构造函数创建实例
    ///
    /// 注册过的服务类型参数从注册表解析，第一个未注册类型的参数及其后的参数
    /// 依次从 `args` 中取值。
    pub fn create_instance_with_args(
        &self,
        descriptor: &Arc<TypeDescriptor>,
        args: Vec<ExtraArg>,
    ) -> DependencyResult<Instance> {
        let registry = self.registry()?;
        let mut ctx = ResolveContext::new();
        ctx.push_type(descriptor.type_info())?;
        let result = construct_with_args(&registry, descriptor, args, &mut ctx)
            .and_then(|instance| inject_fields(&registry, &instance, &mut ctx).map(|_| instance));
        ctx.pop_type();
        result
    }

    /// 创建可注入类型 `T` 的实例
    pub fn create<T: Injectable>(&self) -> DependencyResult<Arc<T>> {
        let instance = self.create_instance(&Arc::new(T::descriptor()))?;
        downcast_instance::<T>(&instance)
    }

    /// 使用混合参数创建可注入类型 `T` 的实例
    pub fn create_with_args<T: Injectable>(&self, args: Vec<ExtraArg>) -> DependencyResult<Arc<T>> {
        let instance = self.create_instance_with_args(&Arc::new(T::descriptor()), args)?;
        downcast_instance::<T>(&instance)
    }
}

impl Injectable for Injector {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .service_provider(
                ProviderMetadata::new(Lifetime::Singleton).with_name(Self::PROVIDER_NAME),
            )
            .constructor(
                Constructor::new(|args| Ok(Injector::new(&args.service::<ServiceRegistry>()?)))
                    .param::<ServiceRegistry>("registry")
                    .dependency_injection(),
            )
            .build()
    }
}

#[distributed_slice(crate::MODULES)]
static DI_IMPL_MODULE: fn() -> ModuleDescriptor = di_impl_module;

fn di_impl_module() -> ModuleDescriptor {
    ModuleDescriptor::new("di-impl").provides(
        TypeDescriptor::contract::<Injector>().build(),
        [Injector::descriptor()],
    )
}

/// 把实例转换为契约 `C`
pub(crate) fn cast_instance<C: ?Sized + 'static>(instance: &Instance) -> DependencyResult<Arc<C>> {
    instance.cast::<C>().ok_or_else(|| {
        DependencyError::assignability(
            TypeInfo::of::<C>().qualified_name(),
            instance.type_info().qualified_name(),
        )
    })
}

fn downcast_instance<T: Injectable>(instance: &Instance) -> DependencyResult<Arc<T>> {
    instance.downcast::<T>().ok_or_else(|| {
        DependencyError::assignability(
            TypeInfo::of::<T>().qualified_name(),
            instance.type_info().qualified_name(),
        )
    })
}

/// 选择构造函数
///
/// 所有参数类型都已注册（或无参）的构造函数才可用；可用构造函数中恰有一个带
/// 依赖注入标记时选它，否则按声明顺序选第一个。
pub(crate) fn select_constructor<'a>(
    registry: &ServiceRegistry,
    descriptor: &'a TypeDescriptor,
) -> DependencyResult<&'a ConstructorDescriptor> {
    let viable: Vec<&ConstructorDescriptor> = descriptor
        .constructors()
        .iter()
        .filter(|ctor| {
            ctor.params()
                .iter()
                .all(|param| registry.is_injectable(&param.type_info))
        })
        .collect();

    let mut marked = viable.iter().filter(|ctor| ctor.is_dependency_injection());
    let selected = match (marked.next(), marked.next()) {
        (Some(only), None) => Some(*only),
        _ => viable.first().copied(),
    };

    selected.ok_or_else(|| DependencyError::NoViableConstructor {
        type_name: descriptor.name().to_string(),
    })
}

/// 选择构造函数、解析参数并调用，不做字段注入
pub(crate) fn construct(
    registry: &ServiceRegistry,
    descriptor: &Arc<TypeDescriptor>,
    ctx: &mut ResolveContext,
) -> DependencyResult<Instance> {
    let ctor = select_constructor(registry, descriptor)?;
    debug!(
        "构造 {}, 参数: {:?}",
        descriptor.name(),
        ctor.params().iter().map(|p| p.name.as_str()).collect::<Vec<_>>()
    );
    let mut args = Arguments::new();
    for param in ctor.params() {
        let value = registry.resolve_in(&param.type_info, param.provider_name.as_deref(), ctx)?;
        args.push_service(param.name.clone(), value);
    }
    invoke(descriptor, ctor, args)
}

/// 使用带依赖注入标记的构造函数，混合注册表服务与调用方参数
pub(crate) fn construct_with_args(
    registry: &ServiceRegistry,
    descriptor: &Arc<TypeDescriptor>,
    extra: Vec<ExtraArg>,
    ctx: &mut ResolveContext,
) -> DependencyResult<Instance> {
    let ctor = descriptor
        .constructors()
        .iter()
        .find(|ctor| ctor.is_dependency_injection())
        .ok_or_else(|| DependencyError::NoViableConstructor {
            type_name: descriptor.name().to_string(),
        })?;

    let mut extra: VecDeque<ExtraArg> = extra.into();
    let mut args = Arguments::new();
    let mut positional = false;
    for param in ctor.params() {
        if !positional && registry.is_injectable(&param.type_info) {
            let value =
                registry.resolve_in(&param.type_info, param.provider_name.as_deref(), ctx)?;
            args.push_service(param.name.clone(), value);
            continue;
        }
        positional = true;
        let arg = extra
            .pop_front()
            .ok_or_else(|| DependencyError::MissingArgument {
                param: param.name.clone(),
                expected: param.type_info.qualified_name().to_string(),
            })?;
        if arg.type_info() != param.type_info {
            return Err(DependencyError::ArgumentTypeMismatch {
                param: param.name.clone(),
                expected: param.type_info.qualified_name().to_string(),
                actual: arg.type_info().qualified_name().to_string(),
            });
        }
        args.push_value(param.name.clone(), arg);
    }
    if !extra.is_empty() {
        debug!("{} 有 {} 个多余参数被忽略", descriptor.name(), extra.len());
    }
    invoke(descriptor, ctor, args)
}

fn invoke(
    descriptor: &Arc<TypeDescriptor>,
    ctor: &ConstructorDescriptor,
    mut args: Arguments,
) -> DependencyResult<Instance> {
    let value = ctor
        .invoke(&mut args)
        .map_err(|source| DependencyError::from_construction(descriptor.name(), source))?;
    Ok(Instance::new(value, descriptor.clone()))
}

/// 为实例的注入字段赋值
pub(crate) fn inject_fields(
    registry: &ServiceRegistry,
    instance: &Instance,
    ctx: &mut ResolveContext,
) -> DependencyResult<()> {
    let descriptor = instance.descriptor().clone();
    for field in descriptor.fields() {
        let value = registry.resolve_in(&field.type_info, field.provider_name.as_deref(), ctx)?;
        field.assign(instance, &value)?;
        debug!("注入字段: {}.{}", descriptor.name(), field.name);
    }
    Ok(())
}
