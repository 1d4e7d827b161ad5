//! 服务注册表
//!
//! 聚合根：持有服务集合与命名扫描器，负责加载 / 重新加载，并提供查询与实例化的便捷操作。

use crate::injector::{self, Injector};
use crate::scanner::{
    LinkedModules, ManifestScanner, ModuleScanner, ModuleSource, Scanner, ScannerConfig,
    ScannerFactory, MANIFEST_SCANNER, MODULE_SCANNER,
};
use crate::service::Service;
use di_abstractions::{
    ClassFilter, ExtraArg, Injectable, Instance, ResolveContext, TypeDescriptor, TypeResolver,
};
use infrastructure_common::{DependencyError, DependencyResult, TypeInfo};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// 服务注册表
pub struct ServiceRegistry {
    me: Weak<ServiceRegistry>,
    descriptor: Arc<TypeDescriptor>,
    services: RwLock<Vec<Arc<Service>>>,
    // 加载期间构建中的服务集合，加载结束后整体替换 services
    staging: Mutex<Option<Vec<Arc<Service>>>>,
    scanners: RwLock<BTreeMap<String, ScannerFactory>>,
    scanner_status: RwLock<HashMap<String, bool>>,
    loaded: AtomicBool,
    enforce_assignability: AtomicBool,
    // load / reload / clear_services / append_scanner 互斥
    load_lock: Mutex<()>,
}

impl ServiceRegistry {
    /// 使用默认配置创建注册表
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    /// 创建注册表并指定可赋值性检查默认值
    pub fn with_enforcement(enforce_assignability: bool) -> Arc<Self> {
        Self::builder()
            .enforce_assignability(enforce_assignability)
            .build()
    }

    /// 注册表构建器
    pub fn builder() -> ServiceRegistryBuilder {
        ServiceRegistryBuilder::new()
    }

    pub(crate) fn downgrade(&self) -> Weak<Self> {
        self.me.clone()
    }

    /// 可赋值性检查默认值
    pub fn enforce_assignability(&self) -> bool {
        self.enforce_assignability.load(Ordering::SeqCst)
    }

    /// 设置可赋值性检查默认值，只影响之后创建的服务
    pub fn set_enforce_assignability(&self, enforce: bool) {
        self.enforce_assignability.store(enforce, Ordering::SeqCst);
    }

    // ---- 扫描器 ----

    /// 追加命名扫描器，同名时替换
    pub fn append_scanner(&self, name: impl Into<String>, factory: ScannerFactory) {
        let name = name.into();
        let _guard = self.load_lock.lock();
        info!("追加扫描器: {}", name);
        self.scanners.write().insert(name, factory);
    }

    /// 已注册的扫描器名称（按名称排序）
    pub fn scanners(&self) -> Vec<String> {
        self.scanners.read().keys().cloned().collect()
    }

    /// 是否已注册指定名称的扫描器
    pub fn has_scanner(&self, name: &str) -> bool {
        self.scanners.read().contains_key(name)
    }

    /// 注册表是否已完整加载（所有扫描器都成功）
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// 指定扫描器最近一次运行是否成功
    pub fn is_scanner_loaded(&self, name: &str) -> bool {
        self.scanner_status.read().get(name).copied().unwrap_or(false)
    }

    // ---- 加载 ----

    /// 使用默认过滤器运行所有扫描器
    pub fn load(&self) -> bool {
        self.load_with(&ClassFilter::accept_all(), &ClassFilter::accept_all())
    }

    /// 使用指定过滤器运行所有扫描器
    pub fn load_with(&self, service_filter: &ClassFilter, provider_filter: &ClassFilter) -> bool {
        let _guard = self.load_lock.lock();
        let succeeded = {
            let _staging = self.begin_staging(true);
            self.run_all(service_filter, provider_filter)
        };
        self.finish_load(succeeded)
    }

    /// 运行指定名称的扫描器
    pub fn load_scanner(
        &self,
        name: &str,
        service_filter: &ClassFilter,
        provider_filter: &ClassFilter,
        enforce_assignability: bool,
    ) -> DependencyResult<bool> {
        let _guard = self.load_lock.lock();
        let factory = self.scanners.read().get(name).cloned().ok_or_else(|| {
            DependencyError::ScannerNotFound {
                scanner: name.to_string(),
            }
        })?;
        let scanner = factory(ScannerConfig::new(
            service_filter.clone(),
            provider_filter.clone(),
            enforce_assignability,
        ));
        let _staging = self.begin_staging(true);
        Ok(self.run_scanner(name, scanner.as_ref()))
    }

    /// 运行一个未注册的扫描器实例
    pub fn load_from(&self, scanner: &dyn Scanner) -> bool {
        let _guard = self.load_lock.lock();
        let _staging = self.begin_staging(true);
        self.run_scanner(scanner.name(), scanner)
    }

    /// 清空服务后使用默认过滤器重新加载
    pub fn reload(&self) -> bool {
        self.reload_with(&ClassFilter::accept_all(), &ClassFilter::accept_all())
    }

    /// 清空服务后使用指定过滤器重新加载
    ///
    /// 新的服务集合在所有扫描器运行完成后一次性替换旧集合，
    /// 重新加载期间的查询看到的始终是旧集合。
    pub fn reload_with(&self, service_filter: &ClassFilter, provider_filter: &ClassFilter) -> bool {
        let _guard = self.load_lock.lock();
        info!("重新加载服务注册表");
        self.scanner_status.write().clear();
        self.loaded.store(false, Ordering::SeqCst);
        let succeeded = {
            let _staging = self.begin_staging(false);
            self.run_all(service_filter, provider_filter)
        };
        self.finish_load(succeeded)
    }

    fn run_all(&self, service_filter: &ClassFilter, provider_filter: &ClassFilter) -> bool {
        let factories: Vec<(String, ScannerFactory)> = self
            .scanners
            .read()
            .iter()
            .map(|(name, factory)| (name.clone(), factory.clone()))
            .collect();
        let enforce = self.enforce_assignability();
        info!(
            "开始加载服务注册表: {} 个扫描器, 服务过滤器 {:?}, 提供者过滤器 {:?}",
            factories.len(),
            service_filter,
            provider_filter
        );

        let mut all_succeeded = true;
        for (name, factory) in factories {
            let scanner = factory(ScannerConfig::new(
                service_filter.clone(),
                provider_filter.clone(),
                enforce,
            ));
            all_succeeded &= self.run_scanner(&name, scanner.as_ref());
        }

        all_succeeded
    }

    fn finish_load(&self, all_succeeded: bool) -> bool {
        self.loaded.store(all_succeeded, Ordering::SeqCst);
        info!(
            "服务注册表加载完成: {} 个服务, 全部成功: {}",
            self.service_count(),
            all_succeeded
        );
        all_succeeded
    }

    fn run_scanner(&self, name: &str, scanner: &dyn Scanner) -> bool {
        debug!("运行扫描器: {}", name);
        let succeeded = scanner.scan(self);
        if !succeeded {
            warn!("扫描器运行失败: {}", name);
        }
        self.scanner_status
            .write()
            .insert(name.to_string(), succeeded);
        succeeded
    }

    // ---- 服务集合 ----

    /// 开始构建新的服务集合，`inherit` 为真时以当前集合为起点
    ///
    /// 返回的守卫在释放时发布构建结果；调用方必须持有 `load_lock`。
    fn begin_staging(&self, inherit: bool) -> StagingGuard<'_> {
        let mut staging = self.staging.lock();
        *staging = Some(if inherit {
            self.services.read().clone()
        } else {
            Vec::new()
        });
        StagingGuard { registry: self }
    }

    fn publish_staging(&self) {
        let mut staging = self.staging.lock();
        if let Some(next) = staging.take() {
            debug!("发布服务集合: {} 个服务", next.len());
            *self.services.write() = next;
        }
    }

    fn discard_staging(&self) {
        if self.staging.lock().take().is_some() {
            warn!("加载中断, 丢弃未发布的服务集合");
        }
    }

    /// 在写入目标上执行操作：加载期间为构建中的集合，否则为已发布的集合
    ///
    /// 整个操作持有同一把锁，查找与追加之间不会被其他写入者打断。
    /// 操作内不能再访问注册表的服务集合。
    pub(crate) fn with_target_services<R>(
        &self,
        operation: impl FnOnce(&mut Vec<Arc<Service>>) -> R,
    ) -> R {
        let mut staging = self.staging.lock();
        match staging.as_mut() {
            Some(services) => operation(services),
            None => operation(&mut self.services.write()),
        }
    }

    /// 追加服务，契约已存在时保留原服务
    ///
    /// 返回是否真正追加。加载期间追加的服务随加载结果一起发布。
    pub fn append_service(&self, service: Arc<Service>) -> bool {
        self.with_target_services(|services| push_unique(services, service))
    }

    /// 全部服务（追加顺序）
    pub fn services(&self) -> Vec<Arc<Service>> {
        self.services.read().clone()
    }

    /// 服务数量
    pub fn service_count(&self) -> usize {
        self.services.read().len()
    }

    /// 查找契约 `C` 的服务
    pub fn find_service<C: ?Sized + 'static>(&self) -> Option<Arc<Service>> {
        self.find_service_by(&TypeInfo::of::<C>())
    }

    /// 按契约类型查找服务
    pub fn find_service_by(&self, contract: &TypeInfo) -> Option<Arc<Service>> {
        self.services
            .read()
            .iter()
            .find(|s| &s.type_info() == contract)
            .cloned()
    }

    /// 契约描述符被过滤器接受的全部服务
    pub fn find_services(&self, filter: &ClassFilter) -> Vec<Arc<Service>> {
        self.services
            .read()
            .iter()
            .filter(|s| filter.accept(s.contract()))
            .cloned()
            .collect()
    }

    /// 是否注册了契约 `C` 的服务
    pub fn has_service<C: ?Sized + 'static>(&self) -> bool {
        self.has_service_type(&TypeInfo::of::<C>())
    }

    /// 是否注册了指定契约的服务
    pub fn has_service_type(&self, contract: &TypeInfo) -> bool {
        self.services
            .read()
            .iter()
            .any(|s| &s.type_info() == contract)
    }

    /// 清空服务集合与扫描器状态
    ///
    /// 与加载互斥，不能在扫描器内部调用。
    pub fn clear_services(&self) {
        let _guard = self.load_lock.lock();
        info!("清空服务集合");
        self.services.write().clear();
        self.scanner_status.write().clear();
        self.loaded.store(false, Ordering::SeqCst);
    }

    /// 参数类型是否可以注入：已注册的服务或注册表自身
    pub fn is_injectable(&self, type_info: &TypeInfo) -> bool {
        type_info.is::<ServiceRegistry>() || self.has_service_type(type_info)
    }

    // ---- 查找与实例化 ----

    /// 获取契约 `C` 默认提供者的实例
    pub fn load_service_provider<C: ?Sized + 'static>(&self) -> DependencyResult<Arc<C>> {
        let instance = self.load_service_instance(&TypeInfo::of::<C>(), None)?;
        injector::cast_instance::<C>(&instance)
    }

    /// 获取契约 `C` 指定名称提供者的实例
    pub fn load_service_provider_named<C: ?Sized + 'static>(
        &self,
        name: &str,
    ) -> DependencyResult<Arc<C>> {
        let instance = self.load_service_instance(&TypeInfo::of::<C>(), Some(name))?;
        injector::cast_instance::<C>(&instance)
    }

    /// 获取契约 `C` 全部提供者的实例
    pub fn load_all_service_providers<C: ?Sized + 'static>(&self) -> DependencyResult<Vec<Arc<C>>> {
        self.load_all_service_instances(&TypeInfo::of::<C>())?
            .iter()
            .map(injector::cast_instance::<C>)
            .collect()
    }

    /// 未做类型转换的 [`Self::load_service_provider`]
    pub fn load_service_instance(
        &self,
        contract: &TypeInfo,
        provider: Option<&str>,
    ) -> DependencyResult<Instance> {
        self.resolve_in(contract, provider, &mut ResolveContext::new())
    }

    /// 未做类型转换的 [`Self::load_all_service_providers`]
    pub fn load_all_service_instances(&self, contract: &TypeInfo) -> DependencyResult<Vec<Instance>> {
        let service = self
            .find_service_by(contract)
            .ok_or_else(|| DependencyError::service_not_found(contract.qualified_name()))?;
        service
            .providers()
            .iter()
            .map(|provider| provider.instance())
            .collect()
    }

    /// 通过注入器创建类型 `T` 的实例
    pub fn load_class<T: Injectable>(&self) -> DependencyResult<Arc<T>> {
        self.injector()?.create::<T>()
    }

    /// 通过注入器使用混合参数创建类型 `T` 的实例
    pub fn load_class_with_args<T: Injectable>(
        &self,
        args: Vec<ExtraArg>,
    ) -> DependencyResult<Arc<T>> {
        self.injector()?.create_with_args::<T>(args)
    }

    /// 注册的注入器服务，未注册时创建临时注入器
    pub fn injector(&self) -> DependencyResult<Arc<Injector>> {
        if self.has_service::<Injector>() {
            return self.load_service_provider::<Injector>();
        }
        Ok(Arc::new(Injector::new(&self.self_arc()?)))
    }

    /// 在解析上下文中解析一个依赖
    ///
    /// 注册表类型解析为注册表自身；其余类型先找服务再按名称或默认规则选择提供者。
    pub(crate) fn resolve_in(
        &self,
        contract: &TypeInfo,
        provider: Option<&str>,
        ctx: &mut ResolveContext,
    ) -> DependencyResult<Instance> {
        if contract.is::<ServiceRegistry>() {
            return Ok(Instance::new(self.self_arc()?, self.descriptor.clone()));
        }
        let service = self
            .find_service_by(contract)
            .ok_or_else(|| DependencyError::service_not_found(contract.qualified_name()))?;
        let selected = match provider {
            Some(name) => service.provider_named(name).ok_or_else(|| {
                DependencyError::provider_not_found(contract.qualified_name(), name)
            })?,
            None => service
                .provider()
                .ok_or_else(|| DependencyError::service_not_found(contract.qualified_name()))?,
        };
        selected.instance_in(ctx)
    }

    fn self_arc(&self) -> DependencyResult<Arc<Self>> {
        self.me.upgrade().ok_or(DependencyError::RegistryUnavailable)
    }
}

/// 追加契约尚不存在的服务
pub(crate) fn push_unique(services: &mut Vec<Arc<Service>>, service: Arc<Service>) -> bool {
    if services.iter().any(|s| s.type_info() == service.type_info()) {
        debug!("服务已存在: {}", service.type_info());
        return false;
    }
    debug!("追加服务: {}", service.type_info());
    services.push(service);
    true
}

/// 释放时发布构建中的服务集合，扫描器 panic 时丢弃
struct StagingGuard<'a> {
    registry: &'a ServiceRegistry,
}

impl Drop for StagingGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.registry.discard_staging();
        } else {
            self.registry.publish_staging();
        }
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.read().len())
            .field("scanners", &self.scanners())
            .field("loaded", &self.is_loaded())
            .field("enforce_assignability", &self.enforce_assignability())
            .finish()
    }
}

/// 注册表构建器
pub struct ServiceRegistryBuilder {
    enforce_assignability: bool,
    manifest_roots: Vec<PathBuf>,
    module_source: Option<Arc<dyn ModuleSource>>,
    type_resolver: Option<Arc<dyn TypeResolver>>,
}

impl ServiceRegistryBuilder {
    /// 创建构建器
    pub fn new() -> Self {
        Self {
            enforce_assignability: false,
            manifest_roots: Vec::new(),
            module_source: None,
            type_resolver: None,
        }
    }

    /// 设置可赋值性检查默认值
    pub fn enforce_assignability(mut self, enforce: bool) -> Self {
        self.enforce_assignability = enforce;
        self
    }

    /// 追加清单扫描根路径（目录或 zip / jar 归档）
    pub fn manifest_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.manifest_roots.push(root.into());
        self
    }

    /// 批量追加清单扫描根路径
    pub fn manifest_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.manifest_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// 设置模块描述符来源，缺省为链接进程序的模块
    pub fn module_source(mut self, source: Arc<dyn ModuleSource>) -> Self {
        self.module_source = Some(source);
        self
    }

    /// 设置清单扫描使用的类型解析器
    pub fn type_resolver(mut self, resolver: Arc<dyn TypeResolver>) -> Self {
        self.type_resolver = Some(resolver);
        self
    }

    /// 构建注册表，内置的模块扫描器与清单扫描器已预先注册
    pub fn build(self) -> Arc<ServiceRegistry> {
        let module_source = self
            .module_source
            .unwrap_or_else(|| Arc::new(LinkedModules));
        let type_resolver = self
            .type_resolver
            .unwrap_or_else(|| Arc::new(module_source.catalog()));
        let roots = self.manifest_roots;

        let mut scanners: BTreeMap<String, ScannerFactory> = BTreeMap::new();
        let source = module_source.clone();
        scanners.insert(
            MODULE_SCANNER.to_string(),
            Arc::new(move |config: ScannerConfig| -> Box<dyn Scanner> {
                Box::new(ModuleScanner::new(source.clone(), config))
            }),
        );
        scanners.insert(
            MANIFEST_SCANNER.to_string(),
            Arc::new(move |config: ScannerConfig| -> Box<dyn Scanner> {
                Box::new(ManifestScanner::new(
                    roots.clone(),
                    type_resolver.clone(),
                    config,
                ))
            }),
        );

        let enforce = self.enforce_assignability;
        Arc::new_cyclic(|me| ServiceRegistry {
            me: me.clone(),
            descriptor: Arc::new(TypeDescriptor::builder::<ServiceRegistry>().build()),
            services: RwLock::new(Vec::new()),
            staging: Mutex::new(None),
            scanners: RwLock::new(scanners),
            scanner_status: RwLock::new(HashMap::new()),
            loaded: AtomicBool::new(false),
            enforce_assignability: AtomicBool::new(enforce),
            load_lock: Mutex::new(()),
        })
    }
}

impl Default for ServiceRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
