//! 注册表启动器
//!
//! 在进程启动时汇总启动选项（可赋值性检查、过滤器、附加扫描器、显式服务定义），
//! 创建并按需加载服务注册表。

use di_abstractions::{ClassFilter, TypeDescriptor};
use di_impl::{
    DefinitionScanner, ModuleSource, ScannerFactory, ServiceDefinition, ServiceRegistry,
    DEFINITION_SCANNER,
};
use infrastructure_common::{InfrastructureError, InfrastructureResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 启动选项
#[derive(Clone)]
pub struct BootstrapOptions {
    enforce_assignability: bool,
    load_registry: bool,
    fail_on_scan_error: bool,
    service_filter: ClassFilter,
    provider_filter: ClassFilter,
    scanners: Vec<(String, ScannerFactory)>,
    definitions: Vec<ServiceDefinition>,
    manifest_roots: Vec<PathBuf>,
    module_source: Option<Arc<dyn ModuleSource>>,
}

impl BootstrapOptions {
    /// 创建启动选项构建器
    pub fn builder() -> BootstrapOptionsBuilder {
        BootstrapOptionsBuilder::new()
    }

    /// 是否检查可赋值性
    pub fn enforce_assignability(&self) -> bool {
        self.enforce_assignability
    }

    /// 是否在启动时加载注册表
    pub fn load_registry(&self) -> bool {
        self.load_registry
    }

    /// 扫描失败时是否中止启动
    pub fn fail_on_scan_error(&self) -> bool {
        self.fail_on_scan_error
    }

    /// 契约类型过滤器
    pub fn service_filter(&self) -> &ClassFilter {
        &self.service_filter
    }

    /// 提供者类型过滤器
    pub fn provider_filter(&self) -> &ClassFilter {
        &self.provider_filter
    }

    /// 附加扫描器名称（追加顺序）
    pub fn scanner_names(&self) -> Vec<&str> {
        self.scanners.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// 显式服务定义
    pub fn definitions(&self) -> &[ServiceDefinition] {
        &self.definitions
    }

    /// 清单扫描根路径
    pub fn manifest_roots(&self) -> &[PathBuf] {
        &self.manifest_roots
    }
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            enforce_assignability: false,
            load_registry: true,
            fail_on_scan_error: false,
            service_filter: ClassFilter::accept_all(),
            provider_filter: ClassFilter::accept_all(),
            scanners: Vec::new(),
            definitions: Vec::new(),
            manifest_roots: Vec::new(),
            module_source: None,
        }
    }
}

impl std::fmt::Debug for BootstrapOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapOptions")
            .field("enforce_assignability", &self.enforce_assignability)
            .field("load_registry", &self.load_registry)
            .field("fail_on_scan_error", &self.fail_on_scan_error)
            .field("service_filter", &self.service_filter)
            .field("provider_filter", &self.provider_filter)
            .field("scanners", &self.scanner_names())
            .field("definitions", &self.definitions.len())
            .field("manifest_roots", &self.manifest_roots)
            .finish()
    }
}

/// 启动选项构建器
#[derive(Default)]
pub struct BootstrapOptionsBuilder {
    options: BootstrapOptions,
}

impl BootstrapOptionsBuilder {
    /// 创建构建器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置是否检查可赋值性
    pub fn enforce_assignability(mut self, enforce: bool) -> Self {
        self.options.enforce_assignability = enforce;
        self
    }

    /// 设置是否在启动时加载注册表
    pub fn load_registry(mut self, load: bool) -> Self {
        self.options.load_registry = load;
        self
    }

    /// 设置扫描失败时是否中止启动
    pub fn fail_on_scan_error(mut self, fail: bool) -> Self {
        self.options.fail_on_scan_error = fail;
        self
    }

    /// 设置契约类型过滤器
    ///
    /// 已设置过滤器时与之取逻辑或；传入全部接受过滤器时重置。
    pub fn service_filter(mut self, filter: ClassFilter) -> Self {
        self.options.service_filter = merge_filter(&self.options.service_filter, filter);
        self
    }

    /// 设置提供者类型过滤器，合并规则与 [`Self::service_filter`] 相同
    pub fn provider_filter(mut self, filter: ClassFilter) -> Self {
        self.options.provider_filter = merge_filter(&self.options.provider_filter, filter);
        self
    }

    /// 追加命名扫描器
    pub fn append_scanner(mut self, name: impl Into<String>, factory: ScannerFactory) -> Self {
        self.options.scanners.push((name.into(), factory));
        self
    }

    /// 追加一条 "契约 → 实现" 定义
    pub fn append_service(mut self, contract: TypeDescriptor, implementation: TypeDescriptor) -> Self {
        let contract_info = contract.type_info();
        match self
            .options
            .definitions
            .iter_mut()
            .find(|d| d.contract().type_info() == contract_info)
        {
            Some(existing) => {
                *existing = existing.clone().with_provider(implementation);
            }
            None => self
                .options
                .definitions
                .push(ServiceDefinition::new(contract).with_provider(implementation)),
        }
        self
    }

    /// 追加一条完整的服务定义
    pub fn append_definition(mut self, definition: ServiceDefinition) -> Self {
        self.options.definitions.push(definition);
        self
    }

    /// 追加清单扫描根路径
    pub fn manifest_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.manifest_roots.push(root.into());
        self
    }

    /// 设置模块描述符来源
    pub fn module_source(mut self, source: Arc<dyn ModuleSource>) -> Self {
        self.options.module_source = Some(source);
        self
    }

    /// 完成构建
    ///
    /// 检查可赋值性时，每条显式服务定义的实现都必须可以赋值给契约。
    pub fn build(self) -> InfrastructureResult<BootstrapOptions> {
        if self.options.enforce_assignability {
            for definition in &self.options.definitions {
                if let Err(err) = definition.validate() {
                    error!("服务定义无效: {}", err);
                    return Err(err.into());
                }
            }
        }
        debug!("启动选项: {:?}", self.options);
        Ok(self.options)
    }
}

fn merge_filter(current: &ClassFilter, filter: ClassFilter) -> ClassFilter {
    if filter.is_accept_all() || current.is_accept_all() {
        filter
    } else {
        current.or(&filter)
    }
}

/// 注册表启动器
pub struct RegistryBootstrap;

impl RegistryBootstrap {
    /// 按启动选项创建注册表
    ///
    /// 依次追加扫描器与显式服务定义，`load_registry` 为真时立即加载。
    pub fn load(options: BootstrapOptions) -> InfrastructureResult<Arc<ServiceRegistry>> {
        info!("开始启动服务注册表");
        let mut builder = ServiceRegistry::builder()
            .enforce_assignability(options.enforce_assignability)
            .manifest_roots(options.manifest_roots.iter().cloned());
        if let Some(source) = options.module_source.clone() {
            builder = builder.module_source(source);
        }
        let registry = builder.build();

        for (name, factory) in &options.scanners {
            registry.append_scanner(name.clone(), factory.clone());
        }
        if !options.definitions.is_empty() {
            registry.append_scanner(
                DEFINITION_SCANNER,
                DefinitionScanner::factory(options.definitions.clone()),
            );
        }

        if options.load_registry {
            let loaded = registry.load_with(&options.service_filter, &options.provider_filter);
            if !loaded {
                let failed: Vec<String> = registry
                    .scanners()
                    .into_iter()
                    .filter(|name| !registry.is_scanner_loaded(name))
                    .collect();
                if options.fail_on_scan_error {
                    error!("服务注册表加载失败, 失败的扫描器: {:?}", failed);
                    return Err(InfrastructureError::BootstrapFailed {
                        message: format!("扫描器运行失败: {}", failed.join(", ")),
                    });
                }
                warn!("服务注册表部分加载, 失败的扫描器: {:?}", failed);
            }
        }

        info!(
            "服务注册表启动完成: {} 个服务, 扫描器: {:?}",
            registry.service_count(),
            registry.scanners()
        );
        Ok(registry)
    }
}
