//! 提供者：绑定到服务的具体实现类型

use crate::injector;
use crate::registry::ServiceRegistry;
use crate::service::Service;
use di_abstractions::{Instance, ResolveContext, TypeDescriptor};
use infrastructure_common::{
    DependencyError, DependencyResult, Lifetime, ProviderMetadata, TypeInfo,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, error, warn};

/// 提供者
pub struct Provider {
    concrete: Arc<TypeDescriptor>,
    contract: TypeInfo,
    name: String,
    lifetime: Lifetime,
    service: Weak<Service>,
    cached: RwLock<Option<Instance>>,
    // 已构造、正在注入字段的单例，只对构造线程可见
    pending: Mutex<Option<(ThreadId, Instance)>>,
    // 串行化单例的首次构造
    construction: Mutex<()>,
}

impl Provider {
    /// 为服务创建提供者
    ///
    /// 服务要求检查可赋值性时，具体类型必须声明实现了服务的契约。
    /// 名称取自提供者元数据，缺省为具体类型的完全限定名；生命周期缺省为瞬时。
    pub fn new(
        service: &Arc<Service>,
        concrete: impl Into<Arc<TypeDescriptor>>,
    ) -> DependencyResult<Arc<Self>> {
        let concrete = concrete.into();
        let contract = service.type_info();

        if service.enforce_assignability() && !concrete.is_assignable_to(&contract) {
            error!("类型 {} 不能赋值给契约 {}", concrete.name(), contract);
            return Err(DependencyError::assignability(
                contract.qualified_name(),
                concrete.name(),
            ));
        }

        let (name, lifetime) = match concrete.metadata() {
            Some(meta) => (
                meta.name.clone().unwrap_or_else(|| concrete.name().to_string()),
                meta.lifetime,
            ),
            None => (concrete.name().to_string(), Lifetime::default()),
        };
        debug!("创建提供者: {} ({}, {})", name, concrete.name(), lifetime);

        Ok(Arc::new(Self {
            concrete,
            contract,
            name,
            lifetime,
            service: Arc::downgrade(service),
            cached: RwLock::new(None),
            pending: Mutex::new(None),
            construction: Mutex::new(()),
        }))
    }

    /// 提供者名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 生命周期
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// 具体类型描述符
    pub fn concrete(&self) -> &Arc<TypeDescriptor> {
        &self.concrete
    }

    /// 具体类型信息
    pub fn type_info(&self) -> TypeInfo {
        self.concrete.type_info()
    }

    /// 所属服务的契约
    pub fn contract(&self) -> TypeInfo {
        self.contract
    }

    /// 提供者元数据
    pub fn metadata(&self) -> Option<&ProviderMetadata> {
        self.concrete.metadata()
    }

    /// 声明的优先级，没有元数据时为 `None`
    pub fn priority(&self) -> Option<i32> {
        self.metadata().map(|meta| meta.priority)
    }

    /// 所属服务
    pub fn service(&self) -> Option<Arc<Service>> {
        self.service.upgrade()
    }

    /// 已缓存的单例实例，只包含字段注入已完成的实例
    pub fn cached_instance(&self) -> Option<Instance> {
        self.cached.read().clone()
    }

    /// 获取实例
    ///
    /// 单例从构造到字段注入完成都持有本提供者的构造锁，其他线程等待发布。
    /// 两个线程从相反方向首次解析同一组互相依赖的单例时会互相等待，
    /// 需要在启动阶段先解析其中一个。
    pub fn instance(&self) -> DependencyResult<Instance> {
        self.instance_in(&mut ResolveContext::new())
    }

    /// 获取实例并转换为契约 `C`
    pub fn get<C: ?Sized + 'static>(&self) -> DependencyResult<Arc<C>> {
        let instance = self.instance()?;
        injector::cast_instance::<C>(&instance)
    }

    /// 在给定解析上下文中获取实例
    ///
    /// 有缓存的单例直接返回；否则选择构造函数并解析参数、调用构造函数，
    /// 最后完成字段注入。单例在字段注入成功后才缓存，注入期间同一线程的
    /// 重入解析得到正在构造的实例；注入失败时不留下缓存。
    pub fn instance_in(&self, ctx: &mut ResolveContext) -> DependencyResult<Instance> {
        if let Some(instance) = self.cached_instance() {
            return Ok(instance);
        }
        if let Some(instance) = self.pending_for_current_thread() {
            return Ok(instance);
        }
        let registry = self.registry()?;
        ctx.push_type(self.type_info())?;
        let result = self.create(&registry, ctx);
        ctx.pop_type();
        result
    }

    fn create(
        &self,
        registry: &ServiceRegistry,
        ctx: &mut ResolveContext,
    ) -> DependencyResult<Instance> {
        match self.lifetime {
            Lifetime::Singleton => self.create_singleton(registry, ctx),
            Lifetime::Transient => {
                let instance = injector::construct(registry, &self.concrete, ctx)?;
                injector::inject_fields(registry, &instance, ctx)?;
                Ok(instance)
            }
        }
    }

    fn create_singleton(
        &self,
        registry: &ServiceRegistry,
        ctx: &mut ResolveContext,
    ) -> DependencyResult<Instance> {
        let _guard = self.construction.lock();
        if let Some(instance) = self.cached_instance() {
            return Ok(instance);
        }
        let instance = injector::construct(registry, &self.concrete, ctx)?;
        *self.pending.lock() = Some((thread::current().id(), instance.clone()));
        let injected = injector::inject_fields(registry, &instance, ctx);
        *self.pending.lock() = None;
        match injected {
            Ok(()) => {
                *self.cached.write() = Some(instance.clone());
                debug!("缓存单例: {}", self.name);
                Ok(instance)
            }
            Err(err) => {
                warn!("单例字段注入失败, 不缓存: {}: {}", self.name, err);
                Err(err)
            }
        }
    }

    fn pending_for_current_thread(&self) -> Option<Instance> {
        let current = thread::current().id();
        self.pending
            .lock()
            .as_ref()
            .filter(|(owner, _)| *owner == current)
            .map(|(_, instance)| instance.clone())
    }

    fn registry(&self) -> DependencyResult<Arc<ServiceRegistry>> {
        self.service
            .upgrade()
            .and_then(|service| service.registry())
            .ok_or(DependencyError::RegistryUnavailable)
    }
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.contract == other.contract
            && self.type_info() == other.type_info()
            && self.name == other.name
    }
}

impl Eq for Provider {}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("concrete", &self.concrete.name())
            .field("contract", &self.contract.qualified_name())
            .field("lifetime", &self.lifetime)
            .field("cached", &self.cached.read().is_some())
            .finish()
    }
}
