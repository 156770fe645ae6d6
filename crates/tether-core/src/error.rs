use alloc::borrow::Cow;
use alloc::boxed::Box;
use core::fmt;

use crate::Error;

/// `CoreError` 是通道构建路径上所有可观察故障的最终形态。
///
/// # 设计背景（Why）
/// - 安全连接器创建、配置合并、解析器启动等环节产生的故障需要合流为统一的
///   错误码，以便日志与告警系统执行精确分类。
/// - 构建流程需兼容 `no_std + alloc` 场景，因此不依赖 `std::error::Error`，
///   而复用 crate 内部定义的轻量 [`Error`] 抽象。
///
/// # 契约说明（What）
/// - `code`：稳定字符串，遵循 `<域>.<语义>` 命名规范（参见 [`codes`]）。
/// - `message`：面向排障人员的描述，避免包含敏感信息。
/// - `cause`：可选底层原因，`source()` 暴露完整链路。
///
/// # 风险提示（Trade-offs）
/// - 采用 `Cow` 保存消息，静态文案零分配，动态描述仅一次堆分配。
/// - 结构体仅承载信息，不执行格式化或指标上报；调用方需自行处理。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
}

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 统一的结果别名，默认错误类型为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;

impl CoreError {
    /// 使用稳定错误码与消息构造核心错误。
    ///
    /// # 契约说明
    /// - **参数**：`code` 为 `'static` 字符串；`message` 可为静态或堆分配文本。
    /// - **前置条件**：调用方需确保 `code` 已在 [`codes`] 中备案或遵循同一约定。
    /// - **后置条件**：返回的实例未携带底层原因，可继续通过 Builder 方法扩充。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的核心错误。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

/// 框架内置的错误码常量集合，确保可观测性系统具有稳定识别符。
///
/// # 设计背景（Why）
/// - 通道构建是一条多阶段状态机：安全状态冲突、连接器创建失败、解析器启动
///   失败等高频故障模式必须提供标准化标识，调用方才能实施兜底策略。
/// - 错误码遵循 `<域>.<语义>` 命名约定，方便在跨组件日志中检索与聚合。
///
/// # 契约说明（What）
/// - 错误码应由实现者封装进 [`CoreError`]，并在链路日志中携带完整上下文。
/// - 除 `channel.resolver_create_failed` 外，构建阶段的错误最终都以跛脚通道
///   的形式呈现给调用方，错误码在首次使用通道时浮出。
pub mod codes {
    /// 配置中已存在安全状态条目，构建被拒绝。
    pub const CHANNEL_SECURITY_CONFLICT: &str = "channel.security_state_conflict";
    /// 凭证到安全连接器的派生失败。
    pub const CHANNEL_CONNECTOR_CREATE: &str = "channel.connector_create_failed";
    /// 解析器启动失败，通道身份无法成立。
    pub const CHANNEL_RESOLVER_CREATE: &str = "channel.resolver_create_failed";
    /// 配置合并失败。前置条件已在编排层检查，此码属于防御性兜底。
    pub const CHANNEL_CONFIG_MERGE: &str = "channel.config_merge_failed";
    /// 在跛脚通道上执行操作。
    pub const CHANNEL_LAME: &str = "channel.lame";
    /// 目标字符串无法解析为端点。
    pub const TARGET_INVALID: &str = "target.invalid";
    /// 注册表中不存在匹配目标 scheme 的解析器工厂。
    pub const RESOLVER_UNKNOWN_SCHEME: &str = "resolver.unknown_scheme";
    /// 解析器认定目标本身不可用。
    pub const RESOLVER_INVALID_TARGET: &str = "resolver.invalid_target";
    /// 凭证与目标 scheme 不支持安全传输。
    pub const SECURITY_UNSUPPORTED_SCHEME: &str = "security.unsupported_scheme";
    /// 凭证对该目标无效。
    pub const SECURITY_INVALID_CREDENTIAL: &str = "security.invalid_credential";
}

const _: fn() = || {
    fn assert_error_traits<T: Error + Send + Sync + 'static>() {}

    assert_error_traits::<CoreError>();
};
