//! 模块描述符扫描器
//!
//! 每个模块声明 "契约 由 这些实现 提供" 的关系。链接进程序的模块通过
//! [`MODULES`] 分布式切片登记：
//!
//! ```ignore
//! #[linkme::distributed_slice(di_impl::MODULES)]
//! static GREETING_MODULE: fn() -> ModuleDescriptor = greeting_module;
//! ```

use super::{register_candidates, Scanner, ScannerConfig, MODULE_SCANNER};
use crate::registry::ServiceRegistry;
use di_abstractions::{TypeCatalog, TypeDescriptor};
use linkme::distributed_slice;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 链接进程序的模块描述符
#[distributed_slice]
pub static MODULES: [fn() -> ModuleDescriptor];

/// 一条 "契约 由 实现 提供" 关系
#[derive(Debug, Clone)]
pub struct Provides {
    /// 契约描述符
    pub contract: Arc<TypeDescriptor>,
    /// 实现描述符（声明顺序）
    pub providers: Vec<Arc<TypeDescriptor>>,
}

/// 模块描述符
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    name: String,
    provides: Vec<Provides>,
    exports: Vec<Arc<TypeDescriptor>>,
}

impl ModuleDescriptor {
    /// 创建模块描述符
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provides: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// 声明契约由一组实现提供
    pub fn provides<I>(mut self, contract: TypeDescriptor, providers: I) -> Self
    where
        I: IntoIterator<Item = TypeDescriptor>,
    {
        self.provides.push(Provides {
            contract: Arc::new(contract),
            providers: providers.into_iter().map(Arc::new).collect(),
        });
        self
    }

    /// 导出一个类型，使其可以按名称解析
    pub fn exports(mut self, descriptor: TypeDescriptor) -> Self {
        self.exports.push(Arc::new(descriptor));
        self
    }

    /// 模块名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明的提供关系
    pub fn provisions(&self) -> &[Provides] {
        &self.provides
    }

    /// 模块涉及的全部类型
    pub fn types(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.provides
            .iter()
            .flat_map(|p| std::iter::once(&p.contract).chain(p.providers.iter()))
            .chain(self.exports.iter())
    }
}

/// 模块描述符来源
pub trait ModuleSource: Send + Sync {
    /// 按稳定顺序返回模块描述符
    fn modules(&self) -> Vec<ModuleDescriptor>;

    /// 由全部模块涉及的类型组成的类型目录
    fn catalog(&self) -> TypeCatalog {
        let catalog = TypeCatalog::new();
        for module in self.modules() {
            for descriptor in module.types() {
                catalog.register(descriptor.clone());
            }
        }
        catalog
    }
}

/// 链接进程序的模块，按名称排序
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedModules;

impl ModuleSource for LinkedModules {
    fn modules(&self) -> Vec<ModuleDescriptor> {
        let mut modules: Vec<ModuleDescriptor> = MODULES
            .iter()
            .filter_map(|load| match std::panic::catch_unwind(*load) {
                Ok(module) => Some(module),
                Err(_) => {
                    warn!("模块描述符加载失败, 已跳过");
                    None
                }
            })
            .collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }
}

/// 固定的模块列表
#[derive(Debug, Clone, Default)]
pub struct StaticModules {
    modules: Vec<ModuleDescriptor>,
}

impl StaticModules {
    /// 使用声明顺序的模块列表
    pub fn new(modules: Vec<ModuleDescriptor>) -> Self {
        Self { modules }
    }
}

impl ModuleSource for StaticModules {
    fn modules(&self) -> Vec<ModuleDescriptor> {
        self.modules.clone()
    }
}

/// 模块描述符扫描器
pub struct ModuleScanner {
    source: Arc<dyn ModuleSource>,
    config: ScannerConfig,
}

impl ModuleScanner {
    /// 创建模块扫描器
    pub fn new(source: Arc<dyn ModuleSource>, config: ScannerConfig) -> Self {
        Self { source, config }
    }
}

impl Scanner for ModuleScanner {
    fn name(&self) -> &str {
        MODULE_SCANNER
    }

    fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn scan(&self, registry: &ServiceRegistry) -> bool {
        let modules = self.source.modules();
        info!("[{}] 开始扫描 {} 个模块", self.name(), modules.len());
        for module in modules {
            debug!("[{}] 扫描模块: {}", self.name(), module.name());
            for provides in module.provisions() {
                if provides.providers.is_empty() {
                    warn!(
                        "[{}] 模块 {} 声明的契约 {} 没有实现, 已跳过",
                        self.name(),
                        module.name(),
                        provides.contract.name()
                    );
                    continue;
                }
                register_candidates(
                    registry,
                    self,
                    provides.contract.clone(),
                    provides.providers.iter().cloned(),
                );
            }
        }
        info!("[{}] 扫描完成", self.name());
        true
    }
}
