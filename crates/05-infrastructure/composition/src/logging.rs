//! 日志初始化

use infrastructure_common::{InfrastructureError, InfrastructureResult};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 附加的过滤指令，例如 `di_impl=debug`
    pub directives: Vec<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名和行号
    pub show_location: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            show_target: true,
            show_thread_ids: false,
            show_location: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_thread_ids: true,
            show_location: true,
            ..Self::default()
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            show_target: false,
            json_format: true,
            ..Self::default()
        }
    }

    /// 追加过滤指令
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// 组合成 `EnvFilter` 指令字符串
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.level.to_string().to_lowercase())
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// 初始化全局日志订阅者
///
/// 设置了 `RUST_LOG` 时以其为准。已经初始化过时返回 `Ok(false)`。
pub fn init_logging(config: &LoggingConfig) -> InfrastructureResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directives()).map_err(|e| {
            InfrastructureError::BootstrapFailed {
                message: format!("日志过滤指令无效: {}", e),
            }
        })?,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_location)
        .with_line_number(config.show_location);

    let result = if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    match result {
        Ok(()) => {
            info!("日志系统初始化完成");
            Ok(true)
        }
        Err(e) => {
            debug!("日志系统已初始化: {}", e);
            Ok(false)
        }
    }
}
