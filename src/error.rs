use thiserror::Error;

/// 应用程序错误类型
///
/// 只覆盖启动阶段的致命错误；读写记录文件失败不会走到这里。
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 页面操作错误
    #[error("页面操作错误: {0}")]
    Driver(#[from] DriverError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 浏览器会话相关错误（启动阶段，致命）
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    LaunchFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
}

/// 页面操作错误
///
/// 这类错误都属于"瞬时 UI 错误"：在交互点被捕获、记录，
/// 然后当作"控件不存在"处理，不会向上传播导致整个运行中断。
#[derive(Debug, Error)]
pub enum DriverError {
    /// 元素不存在
    #[error("元素不存在: {selector}")]
    ElementNotFound { selector: String },
    /// 等待超时
    #[error("等待元素超时 ({timeout_secs:.1}s): {what}")]
    Timeout { what: String, timeout_secs: f64 },
    /// 元素句柄已失效（页面已跳转）
    #[error("元素句柄已失效: #{0}")]
    StaleElement(u64),
    /// 后端不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),
    /// 浏览器后端返回的错误
    #[error("{action} 失败: {source}")]
    Backend {
        action: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("配置文件 {path} 解析失败: {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 必填字段缺失或为空
    #[error("必填字段缺失或为空: {field}")]
    MissingField { field: String },
    /// 字段取值非法
    #[error("字段 {field} 取值非法: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Backend {
            action: "CDP 调用",
            source: Box::new(err),
        }
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Backend {
            action: "JSON 解析",
            source: Box::new(err),
        }
    }
}

// ========== 便捷构造函数 ==========

impl DriverError {
    /// 是否属于"元素不存在"一类（找不到、超时、句柄失效）
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            DriverError::ElementNotFound { .. }
                | DriverError::Timeout { .. }
                | DriverError::StaleElement(_)
        )
    }
}

impl FileError {
    /// 创建文件读取错误
    pub fn read_failed(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// 创建文件写入错误
    pub fn write_failed(path: impl Into<String>, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        }
    }
}

impl ConfigError {
    /// 创建字段缺失错误
    pub fn missing(field: impl Into<String>) -> Self {
        ConfigError::MissingField {
            field: field.into(),
        }
    }

    /// 创建字段非法错误
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 页面操作结果类型
pub type DriverResult<T> = Result<T, DriverError>;
