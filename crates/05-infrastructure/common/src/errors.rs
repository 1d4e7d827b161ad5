//! 错误类型定义

use thiserror::Error;

/// 装箱的底层错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 依赖注入错误类型
///
/// 解析期的错误总是带上契约或具体类型的名称，参数相关的错误还会带上参数名与期望类型。
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("服务未注册: {contract}")]
    ServiceNotFound { contract: String },

    #[error("服务 {contract} 中找不到提供者: {provider}")]
    ProviderNotFound { contract: String, provider: String },

    #[error("扫描器不存在: {scanner}")]
    ScannerNotFound { scanner: String },

    #[error("找不到可用的构造函数: {type_name}")]
    NoViableConstructor { type_name: String },

    #[error("提供者构造失败: {type_name}, 原因: {source}")]
    ProviderConstruction { type_name: String, source: BoxError },

    #[error("类型 {concrete} 不能赋值给契约 {contract}")]
    AssignabilityViolation { contract: String, concrete: String },

    #[error("参数 {param} 缺少实参 (类型: {expected})")]
    MissingArgument { param: String, expected: String },

    #[error("参数 {param} 类型不匹配: 期望 {expected}, 实际 {actual}")]
    ArgumentTypeMismatch {
        param: String,
        expected: String,
        actual: String,
    },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("服务注册表已释放")]
    RegistryUnavailable,
}

impl DependencyError {
    /// 创建服务未注册错误
    pub fn service_not_found(contract: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            contract: contract.into(),
        }
    }

    /// 创建提供者不存在错误
    pub fn provider_not_found(contract: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            contract: contract.into(),
            provider: provider.into(),
        }
    }

    /// 创建不可赋值错误
    pub fn assignability(contract: impl Into<String>, concrete: impl Into<String>) -> Self {
        Self::AssignabilityViolation {
            contract: contract.into(),
            concrete: concrete.into(),
        }
    }

    /// 把构造函数返回的错误归类
    ///
    /// 已经是 `DependencyError` 的保持原样，其余包装为 `ProviderConstruction`。
    pub fn from_construction(type_name: impl Into<String>, source: BoxError) -> Self {
        match source.downcast::<DependencyError>() {
            Ok(inner) => *inner,
            Err(source) => Self::ProviderConstruction {
                type_name: type_name.into(),
                source,
            },
        }
    }
}

/// 组件发现错误类型
#[derive(Error, Debug)]
pub enum ComponentError {
    #[error("组件扫描失败: {message}")]
    ScanError { message: String },

    #[error("组件元数据无效: {message}")]
    InvalidMetadata { message: String },
}

impl ComponentError {
    /// 创建扫描错误
    pub fn scan_error(message: impl Into<String>) -> Self {
        Self::ScanError {
            message: message.into(),
        }
    }

    /// 创建元数据错误
    pub fn invalid_metadata(message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            message: message.into(),
        }
    }
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("组件错误: {source}")]
    ComponentError {
        #[from]
        source: ComponentError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type ComponentResult<T> = Result<T, ComponentError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
