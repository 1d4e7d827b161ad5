//! 服务：一个契约类型及可以满足它的提供者集合

use crate::provider::Provider;
use crate::registry::ServiceRegistry;
use di_abstractions::TypeDescriptor;
use infrastructure_common::TypeInfo;
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// 服务
///
/// 以契约类型标识，提供者按发现顺序保存且具体类型互不相同。
pub struct Service {
    contract: Arc<TypeDescriptor>,
    providers: RwLock<Vec<Arc<Provider>>>,
    enforce_assignability: bool,
    registry: Weak<ServiceRegistry>,
}

impl Service {
    /// 创建服务，使用注册表的可赋值性检查默认值
    pub fn new(contract: impl Into<Arc<TypeDescriptor>>, registry: &ServiceRegistry) -> Arc<Self> {
        Self::with_enforcement(contract, registry, registry.enforce_assignability())
    }

    /// 创建服务并指定是否检查可赋值性
    pub fn with_enforcement(
        contract: impl Into<Arc<TypeDescriptor>>,
        registry: &ServiceRegistry,
        enforce_assignability: bool,
    ) -> Arc<Self> {
        let contract = contract.into();
        debug!(
            "创建服务: {} (检查可赋值性: {})",
            contract.name(),
            enforce_assignability
        );
        Arc::new(Self {
            contract,
            providers: RwLock::new(Vec::new()),
            enforce_assignability,
            registry: registry.downgrade(),
        })
    }

    /// 契约描述符
    pub fn contract(&self) -> &Arc<TypeDescriptor> {
        &self.contract
    }

    /// 契约类型信息
    pub fn type_info(&self) -> TypeInfo {
        self.contract.type_info()
    }

    /// 是否要求提供者可以赋值给契约
    pub fn enforce_assignability(&self) -> bool {
        self.enforce_assignability
    }

    /// 所属注册表
    pub fn registry(&self) -> Option<Arc<ServiceRegistry>> {
        self.registry.upgrade()
    }

    /// 追加提供者，同一具体类型只保存一次
    ///
    /// 返回是否真正追加。
    pub fn append_provider(&self, provider: Arc<Provider>) -> bool {
        if provider.contract() != self.type_info() {
            warn!(
                "提供者 {} 属于契约 {}, 不能追加到 {}",
                provider.name(),
                provider.contract(),
                self.contract.name()
            );
            return false;
        }
        let mut providers = self.providers.write();
        if providers.iter().any(|p| p.type_info() == provider.type_info()) {
            debug!("提供者已存在: {}", provider.type_info());
            return false;
        }
        debug!("追加提供者: {} -> {}", provider.name(), self.contract.name());
        providers.push(provider);
        true
    }

    /// 默认提供者
    ///
    /// 带元数据的提供者优先，其中优先级最高者胜出，同优先级取先发现的；
    /// 没有带元数据的提供者时返回第一个发现的提供者。
    pub fn provider(&self) -> Option<Arc<Provider>> {
        let providers = self.providers.read();
        let mut best: Option<&Arc<Provider>> = None;
        for candidate in providers.iter() {
            let Some(priority) = candidate.priority() else {
                continue;
            };
            if best.map_or(true, |b| b.priority().map_or(true, |p| priority > p)) {
                best = Some(candidate);
            }
        }
        best.or_else(|| providers.first()).cloned()
    }

    /// 名称精确匹配的提供者
    pub fn provider_named(&self, name: &str) -> Option<Arc<Provider>> {
        self.providers
            .read()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// 是否已有指定具体类型的提供者
    pub fn has_provider(&self, concrete: &TypeInfo) -> bool {
        self.providers
            .read()
            .iter()
            .any(|p| &p.type_info() == concrete)
    }

    /// 泛型版本的 [`Self::has_provider`]
    pub fn has_provider_type<T: 'static>(&self) -> bool {
        self.has_provider(&TypeInfo::of::<T>())
    }

    /// 全部提供者（发现顺序）
    pub fn providers(&self) -> Vec<Arc<Provider>> {
        self.providers.read().clone()
    }

    /// 提供者数量
    pub fn provider_count(&self) -> usize {
        self.providers.read().len()
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.type_info() == other.type_info()
    }
}

impl Eq for Service {}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_info().hash(state);
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("contract", &self.contract.name())
            .field(
                "providers",
                &self.providers.read().iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            )
            .field("enforce_assignability", &self.enforce_assignability)
            .finish()
    }
}
