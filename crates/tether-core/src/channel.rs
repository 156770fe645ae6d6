use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::task::{Context, Poll};

use serde::{Deserialize, Serialize};

use crate::config::ChannelConfig;
use crate::error::{CoreError, codes};
use crate::factory::ClientChannelFactory;
use crate::resolver::Resolver;
use crate::subchannel::{Subchannel, SubchannelArgs};
use crate::target::Endpoint;

/// 通道（及子通道）的连接状态。
///
/// # 契约说明（What）
/// - 通道从 `Idle` 起步；发起连接尝试后进入 `Connecting`，可用后为 `Ready`，
///   持续失败为 `TransientFailure`；`Shutdown` 为终态，跛脚通道恒处于该态。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectivityState {
    /// 尚未发起连接。
    Idle,
    /// 正在建立连接。
    Connecting,
    /// 至少一条连接可用。
    Ready,
    /// 连接持续失败，自动重试中。
    TransientFailure,
    /// 通道已关闭或从未可用。
    Shutdown,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Ready => "Ready",
            Self::TransientFailure => "TransientFailure",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(label)
    }
}

/// 面向调用方的通道状态码。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum StatusCode {
    /// 正常。
    Ok,
    /// 内部错误：构建期故障统一落在此码。
    Internal,
    /// 服务暂不可用。
    Unavailable,
    /// 认证失败。
    Unauthenticated,
}

/// 通道级状态：状态码加人类可读消息。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelStatus {
    code: StatusCode,
    message: Cow<'static, str>,
}

impl ChannelStatus {
    /// 构造状态。
    pub fn new(code: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 正常状态。
    pub fn ok() -> Self {
        Self::new(StatusCode::Ok, "")
    }

    /// 返回状态码。
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// 返回消息。
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 通道类型：常规客户端通道或负载均衡内部通道。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelPurpose {
    /// 常规客户端通道。
    Regular,
    /// 负载均衡器内部使用的通道。
    LoadBalancing,
}

/// `ChannelStack` 是存活通道的内部分发栈。
///
/// # 设计背景（Why）
/// - 通道对外是轻量句柄，真正持有资源的是栈：合并配置（含安全连接器回引）、
///   解析器绑定与工厂能力引用都归栈所有，通道销毁时随栈统一释放。
/// - 解析器与工厂能力在 `finish_init` 阶段一次性接线，此后栈即自洽，构造方
///   不再保留任何内部引用。
///
/// # 契约说明（What）
/// - [`ChannelStack::new`] 之后栈处于未初始化状态，不得对外暴露；
///   [`ChannelStack::finish_init`] 恰好调用一次完成接线。
/// - `poll_resolution` 将地址更新转化为子通道集合的整体重建，是“地址更新
///   驱动子通道创建”的最小泵实现。
pub struct ChannelStack {
    target: Endpoint,
    purpose: ChannelPurpose,
    config: ChannelConfig,
    resolver: Option<Box<dyn Resolver>>,
    capability: Option<Arc<dyn ClientChannelFactory>>,
    subchannels: Vec<Subchannel>,
}

impl ChannelStack {
    /// 创建尚未接线的通道栈。
    pub fn new(target: Endpoint, purpose: ChannelPurpose, config: ChannelConfig) -> Self {
        Self {
            target,
            purpose,
            config,
            resolver: None,
            capability: None,
            subchannels: Vec::new(),
        }
    }

    /// 将解析器与工厂能力接入栈，完成初始化。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：栈尚未初始化；重复接线属编程错误。
    /// - **后置条件**：解析器所有权转移进栈（构造方不再持有）；工厂能力以
    ///   强引用长期持有，用于后续按地址构造子通道。
    pub fn finish_init(
        &mut self,
        resolver: Box<dyn Resolver>,
        capability: Arc<dyn ClientChannelFactory>,
    ) {
        debug_assert!(!self.is_initialized(), "通道栈不得重复接线");
        self.resolver = Some(resolver);
        self.capability = Some(capability);
    }

    /// 栈是否已完成接线。
    pub fn is_initialized(&self) -> bool {
        self.resolver.is_some() && self.capability.is_some()
    }

    /// 返回通道目标。
    pub fn target(&self) -> &Endpoint {
        &self.target
    }

    /// 返回通道类型。
    pub fn purpose(&self) -> ChannelPurpose {
        self.purpose
    }

    /// 返回合并后的通道配置。
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// 是否持有解析器绑定。
    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    /// 返回当前子通道集合。
    pub fn subchannels(&self) -> &[Subchannel] {
        &self.subchannels
    }

    /// 请求解析器尽快重新解析一次。
    pub fn request_refresh(&mut self) {
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.request_refresh();
        }
    }

    /// 泵取一次解析进度。
    ///
    /// # 逻辑解析（How）
    /// - 轮询解析器：收到一批地址时，经工厂能力为每个地址构造子通道并整体
    ///   替换集合；`Ready(None)` 表示解析终止，此后不再产生新集合。
    ///
    /// # 契约说明（What）
    /// - **返回值**：`Ready(Some(n))` 表示本轮重建了 `n` 个子通道；
    ///   `Ready(None)` 表示解析过程终止；`Pending` 表示暂无更新。
    pub fn poll_resolution(&mut self, cx: &mut Context<'_>) -> Poll<Option<usize>> {
        let Some(resolver) = self.resolver.as_mut() else {
            return Poll::Ready(None);
        };
        let Some(capability) = self.capability.as_ref() else {
            return Poll::Ready(None);
        };
        match resolver.poll_update(cx) {
            Poll::Ready(Some(update)) => {
                let authority = self.target.authority();
                self.subchannels = update
                    .into_addresses()
                    .into_iter()
                    .map(|address| {
                        capability.create_subchannel(SubchannelArgs::new(authority.clone(), address))
                    })
                    .collect();
                Poll::Ready(Some(self.subchannels.len()))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for ChannelStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelStack")
            .field("target", &self.target)
            .field("purpose", &self.purpose)
            .field("initialized", &self.is_initialized())
            .field("subchannels", &self.subchannels.len())
            .finish_non_exhaustive()
    }
}

enum ChannelInner {
    Live(Box<ChannelStack>),
    Lame(ChannelStatus),
}

/// `Channel` 是面向调用方的通道句柄。
///
/// # 设计背景（Why）
/// - 公开的通道创建接口承诺“总能拿到一个可当作通道使用的对象”：构建期的
///   多数故障不以错误返回，而是折叠为一条跛脚通道，错误在首次使用时浮现。
/// - 存活通道与跛脚通道共用同一句柄类型，调用方无需在创建点分支。
///
/// # 契约说明（What）
/// - 跛脚通道携带固定状态，所有操作立即以该状态失败；连接状态恒为
///   [`ConnectivityState::Shutdown`]。
/// - 存活通道的资源归内部栈所有，句柄销毁时整体释放。
#[derive(Debug)]
pub struct Channel {
    target: Endpoint,
    inner: ChannelInner,
}

impl Channel {
    /// 以完成接线的栈构造存活通道。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：栈必须已完成 `finish_init`；未接线的栈不得包装成通道。
    pub fn live(stack: ChannelStack) -> Self {
        debug_assert!(stack.is_initialized(), "存活通道要求栈已完成接线");
        Self {
            target: stack.target().clone(),
            inner: ChannelInner::Live(Box::new(stack)),
        }
    }

    /// 构造跛脚通道：携带固定失败状态的非功能通道。
    ///
    /// # 设计背景（Why）
    /// - 保证“公开接口总是返回可构造对象”的契约：构建失败不抛错，调用方在
    ///   使用时惰性感知错误。
    ///
    /// # 契约说明（What）
    /// - 纯分配，永不失败；后续所有操作以 `code`/`message` 立即失败。
    pub fn lame(
        target: Endpoint,
        code: StatusCode,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            target,
            inner: ChannelInner::Lame(ChannelStatus::new(code, message)),
        }
    }

    /// 返回通道目标。
    pub fn target(&self) -> &Endpoint {
        &self.target
    }

    /// 是否为跛脚通道。
    pub fn is_lame(&self) -> bool {
        matches!(self.inner, ChannelInner::Lame(_))
    }

    /// 返回通道状态：存活通道为 `Ok`，跛脚通道为其固定状态。
    pub fn status(&self) -> ChannelStatus {
        match &self.inner {
            ChannelInner::Live(_) => ChannelStatus::ok(),
            ChannelInner::Lame(status) => status.clone(),
        }
    }

    /// 返回跛脚状态；存活通道返回 `None`。
    pub fn lame_status(&self) -> Option<&ChannelStatus> {
        match &self.inner {
            ChannelInner::Live(_) => None,
            ChannelInner::Lame(status) => Some(status),
        }
    }

    /// 返回连接状态。
    pub fn connectivity_state(&self) -> ConnectivityState {
        match &self.inner {
            ChannelInner::Lame(_) => ConnectivityState::Shutdown,
            ChannelInner::Live(stack) => {
                if stack.subchannels().is_empty() {
                    ConnectivityState::Idle
                } else {
                    ConnectivityState::Connecting
                }
            }
        }
    }

    /// 操作前置检查：跛脚通道立即以固定状态失败。
    pub fn ensure_usable(&self) -> crate::Result<()> {
        match &self.inner {
            ChannelInner::Live(_) => Ok(()),
            ChannelInner::Lame(status) => Err(CoreError::new(
                codes::CHANNEL_LAME,
                status.message.clone(),
            )),
        }
    }

    /// 访问内部栈；跛脚通道返回 `None`。
    pub fn stack(&self) -> Option<&ChannelStack> {
        match &self.inner {
            ChannelInner::Live(stack) => Some(stack),
            ChannelInner::Lame(_) => None,
        }
    }

    /// 请求解析器尽快重新解析；跛脚通道上为空操作。
    pub fn request_refresh(&mut self) {
        if let ChannelInner::Live(stack) = &mut self.inner {
            stack.request_refresh();
        }
    }

    /// 泵取一次解析进度；跛脚通道视为已终止的解析过程。
    pub fn poll_resolution(&mut self, cx: &mut Context<'_>) -> Poll<Option<usize>> {
        match &mut self.inner {
            ChannelInner::Live(stack) => stack.poll_resolution(cx),
            ChannelInner::Lame(_) => Poll::Ready(None),
        }
    }
}

impl fmt::Debug for ChannelInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live(stack) => f.debug_tuple("Live").field(stack).finish(),
            Self::Lame(status) => f.debug_tuple("Lame").field(status).finish(),
        }
    }
}
