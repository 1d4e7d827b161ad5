//! 启动配置源
//!
//! 从可选的配置文件与 `SERVICE_DI` 前缀的环境变量读取启动设置，
//! 环境变量覆盖文件中的同名设置。
//!
//! ```text
//! SERVICE_DI_ENFORCE_ASSIGNABILITY=true
//! SERVICE_DI_MANIFEST_ROOTS=plugins/a.jar,plugins/b
//! ```

use crate::bootstrapper::BootstrapOptionsBuilder;
use di_abstractions::ClassFilter;
use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "SERVICE_DI";

/// 启动设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapSettings {
    /// 是否检查可赋值性
    pub enforce_assignability: bool,
    /// 是否在启动时加载注册表
    pub load_registry: bool,
    /// 扫描失败时是否中止启动
    pub fail_on_scan_error: bool,
    /// 清单扫描根路径
    pub manifest_roots: Vec<PathBuf>,
    /// 只接受该模块路径下的契约
    pub service_module_prefix: Option<String>,
    /// 只接受带提供者元数据的实现
    pub providers_require_metadata: bool,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            enforce_assignability: false,
            load_registry: true,
            fail_on_scan_error: false,
            manifest_roots: Vec::new(),
            service_module_prefix: None,
            providers_require_metadata: false,
        }
    }
}

impl BootstrapSettings {
    /// 从可选文件与默认前缀的环境变量加载
    pub fn load(file: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_prefix(file, ENV_PREFIX)
    }

    /// 从可选文件与指定前缀的环境变量加载
    ///
    /// 文件格式由扩展名决定（toml / json / yaml）；指定的文件不存在时返回
    /// [`ConfigError::FileNotFound`]。
    pub fn load_with_prefix(file: Option<&Path>, prefix: &str) -> ConfigResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            if !path.is_file() {
                error!("配置文件不存在: {}", path.display());
                return Err(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            debug!("添加配置文件: {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("manifest_roots"),
        );

        let settings: Self = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| {
                error!("启动配置解析失败: {}", e);
                ConfigError::ParseError {
                    source: Box::new(e),
                }
            })?;
        settings.validate()?;
        info!("启动配置加载完成: {:?}", settings);
        Ok(settings)
    }

    /// 检查设置
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(prefix) = &self.service_module_prefix {
            if prefix.trim().is_empty() {
                return Err(ConfigError::ValidationError {
                    message: "service_module_prefix 不能为空".to_string(),
                });
            }
        }
        if self.manifest_roots.iter().any(|root| root.as_os_str().is_empty()) {
            return Err(ConfigError::ValidationError {
                message: "manifest_roots 中存在空路径".to_string(),
            });
        }
        Ok(())
    }

    /// 转换为启动选项构建器
    pub fn to_options_builder(&self) -> BootstrapOptionsBuilder {
        let mut builder = BootstrapOptionsBuilder::new()
            .enforce_assignability(self.enforce_assignability)
            .load_registry(self.load_registry)
            .fail_on_scan_error(self.fail_on_scan_error);
        for root in &self.manifest_roots {
            builder = builder.manifest_root(root.clone());
        }
        if let Some(prefix) = &self.service_module_prefix {
            builder = builder.service_filter(ClassFilter::in_module(prefix.trim()));
        }
        if self.providers_require_metadata {
            builder = builder.provider_filter(ClassFilter::has_provider_metadata());
        }
        builder
    }
}
