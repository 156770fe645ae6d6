use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::task::{Context, Poll};

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::config::ChannelConfig;
use crate::future::{BoxStream, Stream};
use crate::error::{CoreError, codes};
use crate::target::{Endpoint, ResolvedAddr};

/// 一批地址更新，由解析器随时间推送给通道栈。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressUpdate {
    addresses: Vec<ResolvedAddr>,
}

impl AddressUpdate {
    /// 构造地址更新。
    pub fn new(addresses: Vec<ResolvedAddr>) -> Self {
        Self { addresses }
    }

    /// 访问地址列表。
    pub fn addresses(&self) -> &[ResolvedAddr] {
        &self.addresses
    }

    /// 拆解为地址列表。
    pub fn into_addresses(self) -> Vec<ResolvedAddr> {
        self.addresses
    }
}

/// 异步名称解析过程的契约，1:1 绑定到一条存活通道。
///
/// # 设计背景（Why）
/// - 解析算法（DNS、服务发现）在 crate 之外实现；通道栈只需要一个可轮询的
///   更新序列，用地址变化驱动子通道的重建。
///
/// # 契约说明（What）
/// - `poll_update` 语义与 Stream 一致：`Ready(Some)` 推送一批地址，
///   `Ready(None)` 表示解析过程终止，`Pending` 表示暂无更新。
/// - `request_refresh` 提示实现尽快重新解析；允许实现将其作为空操作。
///
/// # 风险提示（Trade-offs）
/// - 契约不约定去重或排序；通道栈按更新到达顺序整体替换子通道集合。
pub trait Resolver: Send + 'static {
    /// 轮询下一批地址更新。
    fn poll_update(&mut self, cx: &mut Context<'_>) -> Poll<Option<AddressUpdate>>;

    /// 主动请求一次重新解析。
    fn request_refresh(&mut self);
}

/// 解析器启动失败的原因。
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolverError {
    /// 注册表中不存在匹配的 scheme。
    UnknownScheme(String),
    /// 目标本身无法形成有效的解析请求。
    InvalidTarget(String),
    /// 其他启动失败。
    Other(String),
}

impl ResolverError {
    /// 映射为核心错误，保留稳定错误码与原因链。
    pub fn into_core_error(self) -> CoreError {
        let (code, message) = match &self {
            Self::UnknownScheme(scheme) => (
                codes::RESOLVER_UNKNOWN_SCHEME,
                alloc::format!("no resolver factory registered for scheme `{scheme}`"),
            ),
            Self::InvalidTarget(reason) => (codes::RESOLVER_INVALID_TARGET, reason.clone()),
            Self::Other(reason) => (codes::RESOLVER_INVALID_TARGET, reason.clone()),
        };
        CoreError::new(code, message).with_cause(self)
    }
}

impl fmt::Display for ResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScheme(scheme) => write!(f, "unknown resolver scheme `{scheme}`"),
            Self::InvalidTarget(reason) => write!(f, "invalid resolve target: {reason}"),
            Self::Other(reason) => write!(f, "resolver start failed: {reason}"),
        }
    }
}

impl Error for ResolverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// 将解析器适配为对象安全的更新流。
///
/// # 设计背景（Why）
/// - 宿主侧常以流水线方式消费地址更新；本适配器把 [`Resolver`] 的轮询契约
///   落到统一的 [`crate::future::BoxStream`] 表达上，避免每个宿主重写包装。
pub fn into_update_stream(resolver: Box<dyn Resolver>) -> BoxStream<'static, AddressUpdate> {
    struct UpdateStream(Box<dyn Resolver>);

    impl Stream for UpdateStream {
        type Item = AddressUpdate;

        fn poll_next(
            self: core::pin::Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<Option<Self::Item>> {
            self.get_mut().0.poll_update(cx)
        }
    }

    Box::pin(UpdateStream(resolver))
}

/// 解析器工厂契约：同步启动，异步交付。
///
/// # 契约说明（What）
/// - `start` 只做解析过程的装配，不得阻塞在网络 I/O 上；地址更新经由
///   [`Resolver::poll_update`] 随时间交付。
pub trait ResolverFactory: Send + Sync + 'static {
    /// 返回支持的 scheme。
    fn scheme(&self) -> &'static str;

    /// 针对目标启动解析过程。
    fn start(
        &self,
        target: &Endpoint,
        config: &ChannelConfig,
    ) -> Result<Box<dyn Resolver>, ResolverError>;
}

/// 解析器注册表：scheme 到工厂的映射。
///
/// # 设计背景（Why）
/// - 通道工厂按目标 scheme 选取解析器；注册表集中管理工厂集合，并为裸目标
///   （scheme 为空）补全默认 scheme。
///
/// # 契约说明（What）
/// - `register` 以 scheme 为键覆盖旧工厂；`start` 在缺失匹配工厂时返回
///   [`ResolverError::UnknownScheme`]。
/// - 读多写少：内部使用读写锁，注册通常发生在进程装配阶段。
pub struct ResolverRegistry {
    default_scheme: String,
    factories: spin::RwLock<BTreeMap<String, Arc<dyn ResolverFactory>>>,
}

impl ResolverRegistry {
    /// 以默认 scheme 创建空注册表。
    pub fn new(default_scheme: impl Into<String>) -> Self {
        Self {
            default_scheme: default_scheme.into(),
            factories: spin::RwLock::new(BTreeMap::new()),
        }
    }

    /// 注册解析器工厂，覆盖同 scheme 旧值。
    pub fn register(&self, factory: Arc<dyn ResolverFactory>) {
        let mut factories = self.factories.write();
        factories.insert(String::from(factory.scheme()), factory);
    }

    /// 返回默认 scheme。
    pub fn default_scheme(&self) -> &str {
        &self.default_scheme
    }

    /// 查找 scheme 对应的工厂。
    pub fn lookup(&self, scheme: &str) -> Option<Arc<dyn ResolverFactory>> {
        self.factories.read().get(scheme).cloned()
    }

    /// 为目标启动解析过程。
    ///
    /// # 逻辑解析（How）
    /// 1. 目标 scheme 为空时套用注册表默认 scheme；
    /// 2. 查表取得工厂，缺失则返回 `UnknownScheme`；
    /// 3. 委托工厂执行启动。
    pub fn start(
        &self,
        target: &Endpoint,
        config: &ChannelConfig,
    ) -> Result<Box<dyn Resolver>, ResolverError> {
        let scheme = if target.scheme().is_empty() {
            self.default_scheme.as_str()
        } else {
            target.scheme()
        };
        let factory = self
            .lookup(scheme)
            .ok_or_else(|| ResolverError::UnknownScheme(String::from(scheme)))?;
        factory.start(target, config)
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemes: Vec<String> = self.factories.read().keys().cloned().collect();
        f.debug_struct("ResolverRegistry")
            .field("default_scheme", &self.default_scheme)
            .field("schemes", &schemes)
            .finish()
    }
}
