//! 进程级服务管理器
//!
//! 只在应用最外层使用的便捷入口：持有一个进程范围的注册表，
//! 未安装时按默认配置懒创建。核心库中的组件应直接接收注册表引用。

use crate::bootstrapper::{BootstrapOptions, RegistryBootstrap};
use di_abstractions::ClassFilter;
use di_impl::{Scanner, ScannerFactory, Service, ServiceRegistry};
use infrastructure_common::{DependencyResult, InfrastructureResult};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

static REGISTRY: Lazy<RwLock<Option<Arc<ServiceRegistry>>>> = Lazy::new(|| RwLock::new(None));

/// 服务管理器
pub struct ServiceManager;

impl ServiceManager {
    /// 安装注册表，返回被替换的注册表
    pub fn install(registry: Arc<ServiceRegistry>) -> Option<Arc<ServiceRegistry>> {
        info!("安装进程级服务注册表");
        REGISTRY.write().replace(registry)
    }

    /// 当前注册表，未安装时创建一个默认注册表
    pub fn registry() -> Arc<ServiceRegistry> {
        if let Some(registry) = REGISTRY.read().as_ref() {
            return registry.clone();
        }
        let mut slot = REGISTRY.write();
        slot.get_or_insert_with(|| {
            debug!("创建默认服务注册表");
            ServiceRegistry::new()
        })
        .clone()
    }

    /// 按启动选项创建新注册表并安装
    pub fn new_instance(options: BootstrapOptions) -> InfrastructureResult<Arc<ServiceRegistry>> {
        let registry = RegistryBootstrap::load(options)?;
        Self::install(registry.clone());
        Ok(registry)
    }

    /// 是否已安装注册表
    pub fn is_installed() -> bool {
        REGISTRY.read().is_some()
    }

    /// 卸载当前注册表
    pub fn reset() -> Option<Arc<ServiceRegistry>> {
        info!("卸载进程级服务注册表");
        REGISTRY.write().take()
    }

    /// 使用默认过滤器加载
    pub fn load() -> bool {
        Self::registry().load()
    }

    /// 使用指定过滤器加载
    pub fn load_with(service_filter: &ClassFilter, provider_filter: &ClassFilter) -> bool {
        Self::registry().load_with(service_filter, provider_filter)
    }

    /// 运行指定名称的扫描器
    pub fn load_scanner(
        name: &str,
        service_filter: &ClassFilter,
        provider_filter: &ClassFilter,
        enforce_assignability: bool,
    ) -> DependencyResult<bool> {
        Self::registry().load_scanner(name, service_filter, provider_filter, enforce_assignability)
    }

    /// 运行一个未注册的扫描器实例
    pub fn load_from(scanner: &dyn Scanner) -> bool {
        Self::registry().load_from(scanner)
    }

    /// 重新加载
    pub fn reload_registry() -> bool {
        Self::registry().reload()
    }

    /// 使用指定过滤器重新加载
    pub fn reload_registry_with(service_filter: &ClassFilter, provider_filter: &ClassFilter) -> bool {
        Self::registry().reload_with(service_filter, provider_filter)
    }

    /// 注册表是否已完整加载
    pub fn is_loaded() -> bool {
        REGISTRY
            .read()
            .as_ref()
            .map(|registry| registry.is_loaded())
            .unwrap_or(false)
    }

    /// 指定扫描器最近一次运行是否成功
    pub fn is_scanner_loaded(name: &str) -> bool {
        REGISTRY
            .read()
            .as_ref()
            .map(|registry| registry.is_scanner_loaded(name))
            .unwrap_or(false)
    }

    /// 设置可赋值性检查默认值，只影响之后创建的服务
    pub fn set_enforce_assignability(enforce: bool) {
        Self::registry().set_enforce_assignability(enforce);
    }

    /// 是否注册了契约 `C` 的服务
    pub fn has_service<C: ?Sized + 'static>() -> bool {
        Self::loaded_registry().has_service::<C>()
    }

    /// 契约描述符被过滤器接受的全部服务
    pub fn find_services(filter: &ClassFilter) -> Vec<Arc<Service>> {
        Self::loaded_registry().find_services(filter)
    }

    /// 获取契约 `C` 默认提供者的实例
    pub fn load_service<C: ?Sized + 'static>() -> DependencyResult<Arc<C>> {
        Self::loaded_registry().load_service_provider::<C>()
    }

    /// 获取契约 `C` 指定名称提供者的实例
    pub fn load_service_named<C: ?Sized + 'static>(name: &str) -> DependencyResult<Arc<C>> {
        Self::loaded_registry().load_service_provider_named::<C>(name)
    }

    /// 获取契约 `C` 全部提供者的实例
    pub fn load_all_services<C: ?Sized + 'static>() -> DependencyResult<Vec<Arc<C>>> {
        Self::loaded_registry().load_all_service_providers::<C>()
    }

    /// 追加命名扫描器
    pub fn append_scanner(name: impl Into<String>, factory: ScannerFactory) {
        Self::registry().append_scanner(name, factory);
    }

    /// 已注册的扫描器名称
    pub fn scanners() -> Vec<String> {
        Self::registry().scanners()
    }

    // 查询前确保已加载
    fn loaded_registry() -> Arc<ServiceRegistry> {
        let registry = Self::registry();
        if !registry.is_loaded() {
            debug!("注册表尚未加载, 先执行加载");
            registry.load();
        }
        registry
    }
}
