//! 服务发现扫描器
//!
//! 扫描器从某个数据源发现契约与实现，直接追加到传入的注册表中。
//! 注册表对所有扫描器一视同仁，只关心过滤器、可赋值性检查开关以及 `scan` 的结果。

mod definition;
mod manifest;
mod module;

pub use definition::*;
pub use manifest::*;
pub use module::*;

use crate::provider::Provider;
use crate::registry::{push_unique, ServiceRegistry};
use crate::service::Service;
use di_abstractions::{ClassFilter, TypeDescriptor};
use std::sync::Arc;
use tracing::{debug, error};

/// 模块扫描器名称
pub const MODULE_SCANNER: &str = "ModuleScanner";
/// 清单扫描器名称
pub const MANIFEST_SCANNER: &str = "ManifestScanner";
/// 显式服务定义扫描器名称
pub const DEFINITION_SCANNER: &str = "DefinitionScanner";

/// 扫描器配置
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// 契约类型过滤器
    pub service_filter: ClassFilter,
    /// 提供者类型过滤器
    pub provider_filter: ClassFilter,
    /// 新建服务是否检查可赋值性
    pub enforce_assignability: bool,
}

impl ScannerConfig {
    /// 创建扫描器配置
    pub fn new(
        service_filter: ClassFilter,
        provider_filter: ClassFilter,
        enforce_assignability: bool,
    ) -> Self {
        Self {
            service_filter,
            provider_filter,
            enforce_assignability,
        }
    }
}

/// 扫描器 trait
pub trait Scanner: Send + Sync {
    /// 扫描器名称
    fn name(&self) -> &str;

    /// 扫描器配置
    fn config(&self) -> &ScannerConfig;

    /// 发现服务并追加到注册表
    ///
    /// 结构性失败时返回 `false`；没有发现任何服务不算失败。
    fn scan(&self, registry: &ServiceRegistry) -> bool;

    /// 契约类型过滤器
    fn service_filter(&self) -> &ClassFilter {
        &self.config().service_filter
    }

    /// 提供者类型过滤器
    fn provider_filter(&self) -> &ClassFilter {
        &self.config().provider_filter
    }

    /// 新建服务是否检查可赋值性
    fn enforce_assignability(&self) -> bool {
        self.config().enforce_assignability
    }
}

/// 按配置创建扫描器的工厂
pub type ScannerFactory = Arc<dyn Fn(ScannerConfig) -> Box<dyn Scanner> + Send + Sync>;

/// 把构造函数包装为 [`ScannerFactory`]
pub fn scanner_factory<S, F>(create: F) -> ScannerFactory
where
    S: Scanner + 'static,
    F: Fn(ScannerConfig) -> S + Send + Sync + 'static,
{
    Arc::new(move |config: ScannerConfig| -> Box<dyn Scanner> { Box::new(create(config)) })
}

/// 把一个契约及其候选实现登记到注册表
///
/// 契约与候选分别经过过滤器；已存在的服务被复用，已存在的提供者被跳过；
/// 新建的服务只有在至少有一个提供者时才追加到注册表。返回新追加的提供者数量。
pub(crate) fn register_candidates<I>(
    registry: &ServiceRegistry,
    scanner: &dyn Scanner,
    contract: Arc<TypeDescriptor>,
    candidates: I,
) -> usize
where
    I: IntoIterator<Item = Arc<TypeDescriptor>>,
{
    if !scanner.service_filter().accept(&contract) {
        debug!("[{}] 服务被过滤: {}", scanner.name(), contract.name());
        return 0;
    }

    let type_info = contract.type_info();
    registry.with_target_services(|services| {
        let existing = services.iter().find(|s| s.type_info() == type_info).cloned();
        let service = existing.clone().unwrap_or_else(|| {
            Service::with_enforcement(contract.clone(), registry, scanner.enforce_assignability())
        });

        let mut appended = 0;
        for candidate in candidates {
            if !scanner.provider_filter().accept(&candidate) {
                debug!("[{}] 提供者被过滤: {}", scanner.name(), candidate.name());
                continue;
            }
            if service.has_provider(&candidate.type_info()) {
                debug!("[{}] 提供者已存在: {}", scanner.name(), candidate.name());
                continue;
            }
            match Provider::new(&service, candidate.clone()) {
                Ok(provider) => {
                    if service.append_provider(provider) {
                        appended += 1;
                    }
                }
                Err(err) => error!(
                    "[{}] 跳过提供者 {}: {}",
                    scanner.name(),
                    candidate.name(),
                    err
                ),
            }
        }

        if existing.is_none() && service.provider_count() > 0 {
            push_unique(services, service);
        }
        appended
    })
}
