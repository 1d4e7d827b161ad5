//! 显式服务定义扫描器
//!
//! 用于启动阶段以编程方式追加 "契约 → 实现" 定义，不依赖模块或清单。

use super::{
    register_candidates, scanner_factory, Scanner, ScannerConfig, ScannerFactory,
    DEFINITION_SCANNER,
};
use crate::registry::ServiceRegistry;
use di_abstractions::{Injectable, TypeDescriptor};
use infrastructure_common::{DependencyError, DependencyResult};
use std::sync::Arc;
use tracing::info;

/// 一条显式服务定义
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    contract: Arc<TypeDescriptor>,
    providers: Vec<Arc<TypeDescriptor>>,
}

impl ServiceDefinition {
    /// 为契约创建定义
    pub fn new(contract: TypeDescriptor) -> Self {
        Self {
            contract: Arc::new(contract),
            providers: Vec::new(),
        }
    }

    /// 为契约 `C` 创建定义
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self::new(TypeDescriptor::contract::<C>().build())
    }

    /// 追加实现描述符
    pub fn with_provider(mut self, provider: TypeDescriptor) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// 追加可注入实现类型
    pub fn with<T: Injectable>(self) -> Self {
        self.with_provider(T::descriptor())
    }

    /// 契约描述符
    pub fn contract(&self) -> &Arc<TypeDescriptor> {
        &self.contract
    }

    /// 实现描述符
    pub fn providers(&self) -> &[Arc<TypeDescriptor>] {
        &self.providers
    }

    /// 检查每个实现都可以赋值给契约
    pub fn validate(&self) -> DependencyResult<()> {
        let contract = self.contract.type_info();
        match self.providers.iter().find(|p| !p.is_assignable_to(&contract)) {
            Some(provider) => Err(DependencyError::assignability(
                self.contract.name(),
                provider.name(),
            )),
            None => Ok(()),
        }
    }
}

/// 显式服务定义扫描器
pub struct DefinitionScanner {
    definitions: Arc<Vec<ServiceDefinition>>,
    config: ScannerConfig,
}

impl DefinitionScanner {
    /// 创建扫描器
    pub fn new(definitions: Arc<Vec<ServiceDefinition>>, config: ScannerConfig) -> Self {
        Self {
            definitions,
            config,
        }
    }

    /// 生成按配置创建本扫描器的工厂
    pub fn factory(definitions: Vec<ServiceDefinition>) -> ScannerFactory {
        let definitions = Arc::new(definitions);
        scanner_factory(move |config| DefinitionScanner::new(definitions.clone(), config))
    }
}

impl Scanner for DefinitionScanner {
    fn name(&self) -> &str {
        DEFINITION_SCANNER
    }

    fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn scan(&self, registry: &ServiceRegistry) -> bool {
        info!("[{}] 登记 {} 条服务定义", self.name(), self.definitions.len());
        for definition in self.definitions.iter() {
            register_candidates(
                registry,
                self,
                definition.contract.clone(),
                definition.providers.iter().cloned(),
            );
        }
        true
    }
}
