use alloc::borrow::Cow;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::channel::ConnectivityState;
use crate::security::SecurityConnector;
use crate::target::ResolvedAddr;

/// 握手链中的一个步骤。
///
/// # 契约说明（What）
/// - `label` 为稳定标识（如 `tcp`、`tls`），用于日志与测试断言；真实握手
///   状态机在传输实现内，契约层只描述链的组成。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeStep {
    label: Cow<'static, str>,
}

impl HandshakeStep {
    /// 构造握手步骤。
    pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// 返回步骤标签。
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// 有序握手链：传输层步骤在前，安全步骤由连接器追加在后。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HandshakeChain {
    steps: Vec<HandshakeStep>,
}

impl HandshakeChain {
    /// 创建空链。
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加步骤。
    pub fn push(&mut self, step: HandshakeStep) {
        self.steps.push(step);
    }

    /// 遍历步骤。
    pub fn steps(&self) -> impl Iterator<Item = &HandshakeStep> {
        self.steps.iter()
    }

    /// 返回步骤数量。
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// 是否为空链。
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// 握手安装回调：由工厂能力传入，向链追加安全步骤。
///
/// # 设计背景（Why）
/// - 连接器构造与安全实现解耦：构造方仅约定“给定安全连接器，如何装配握手
///   链”，以纯函数指针表达，保证 `Send + Sync + 'static` 且无捕获状态。
pub type HandshakerInstaller = fn(&SecurityConnector, &mut HandshakeChain);

/// `Connector` 是单次连接尝试的装配产物：传输连接器加安全握手链。
///
/// # 契约说明（What）
/// - 纯构造，无 I/O；`new` 会执行一次安装回调完成链装配。
/// - 持有安全连接器的强引用，在子通道存活期间保持安全材料可用。
pub struct Connector {
    server_name: String,
    security: Arc<SecurityConnector>,
    handshake: HandshakeChain,
}

impl Connector {
    /// 装配连接器。
    ///
    /// # 逻辑解析（How）
    /// 1. 以传输步骤起链（当前为 `tcp` 占位，具体传输实现可替换）；
    /// 2. 执行 `installer` 追加安全步骤；
    /// 3. 连同服务器名与安全连接器引用打包。
    pub fn new(
        server_name: impl Into<String>,
        installer: HandshakerInstaller,
        security: Arc<SecurityConnector>,
    ) -> Self {
        let mut handshake = HandshakeChain::new();
        handshake.push(HandshakeStep::new("tcp"));
        installer(&security, &mut handshake);
        Self {
            server_name: server_name.into(),
            security,
            handshake,
        }
    }

    /// 返回握手目标服务器名。
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// 返回安全连接器引用。
    pub fn security(&self) -> &Arc<SecurityConnector> {
        &self.security
    }

    /// 返回握手链。
    pub fn handshake(&self) -> &HandshakeChain {
        &self.handshake
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("server_name", &self.server_name)
            .field("handshake", &self.handshake)
            .finish_non_exhaustive()
    }
}

/// 子通道构造参数：地址级别的输入。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubchannelArgs {
    server_name: String,
    address: ResolvedAddr,
}

impl SubchannelArgs {
    /// 构造参数。
    pub fn new(server_name: impl Into<String>, address: ResolvedAddr) -> Self {
        Self {
            server_name: server_name.into(),
            address,
        }
    }

    /// 返回服务器名。
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// 返回目标地址。
    pub fn address(&self) -> ResolvedAddr {
        self.address
    }
}

/// `Subchannel` 表示一个可复用的连接尝试单元。
///
/// # 设计背景（Why）
/// - 通道的连接管理层按地址维护子通道集合；每个子通道携带完整的连接器链，
///   在后续连接尝试中独立演进状态。
///
/// # 契约说明（What）
/// - 构造永不失败：下游连接失败在连接尝试阶段异步浮现，不在对象构造期。
/// - 初始连接状态为 [`ConnectivityState::Idle`]。
#[derive(Debug)]
pub struct Subchannel {
    connector: Connector,
    address: ResolvedAddr,
    state: ConnectivityState,
}

impl Subchannel {
    /// 以连接器与参数构造子通道。
    pub fn new(connector: Connector, args: &SubchannelArgs) -> Self {
        Self {
            connector,
            address: args.address(),
            state: ConnectivityState::Idle,
        }
    }

    /// 返回连接器。
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// 返回目标地址。
    pub fn address(&self) -> ResolvedAddr {
        self.address
    }

    /// 返回当前连接状态。
    pub fn state(&self) -> ConnectivityState {
        self.state
    }
}
