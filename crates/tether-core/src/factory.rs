use alloc::sync::Arc;

use crate::channel::{Channel, ChannelPurpose, ChannelStack};
use crate::config::ChannelConfig;
use crate::error::{CoreError, codes};
use crate::resolver::ResolverRegistry;
use crate::security::SecurityConnector;
use crate::subchannel::{Connector, HandshakeChain, Subchannel, SubchannelArgs};
use crate::target::Endpoint;

/// 客户端通道工厂能力：统一子通道与通道的创建入口。
///
/// # 设计背景（Why）
/// - 原型是一张函数指针表（ref/unref/create_subchannel/create_channel）；在
///   Rust 中，共享所有权交由 `Arc` 承担（acquire/release 即克隆与析构，原子
///   且可并发调用），多态派发交由 trait object 承担。
/// - 能力对象按传输形态（安全/明文）提供不同实现，通道栈只依赖本契约。
///
/// # 契约说明（What）
/// - `create_subchannel` 在本层永不失败：下游连接失败在连接尝试阶段异步
///   浮现，不在对象构造期。
/// - `create_channel` 是构建流程中唯一返回错误的操作：解析器启动失败时，
///   半成品通道必须随错误一并释放，不得有悬挂对象逃逸。
pub trait ClientChannelFactory: Send + Sync + 'static {
    /// 为一个地址构造子通道（单次连接尝试单元）。
    fn create_subchannel(&self, args: SubchannelArgs) -> Subchannel;

    /// 构造通道并为其绑定解析器。
    ///
    /// # 契约说明（What）
    /// - **输入**：`self` 以 `Arc` 接收，能力对象自身将被接入通道栈长期持有；
    ///   `config` 为合并完成的通道配置，所有权转移进通道。
    /// - **失败语义**：解析器启动失败返回
    ///   [`codes::CHANNEL_RESOLVER_CREATE`]，此时已构造的栈与全部引用
    ///   随返回路径释放。
    fn create_channel(
        self: Arc<Self>,
        target: &Endpoint,
        purpose: ChannelPurpose,
        config: ChannelConfig,
    ) -> crate::Result<Channel>;
}

/// 安全传输形态的工厂能力实现。
///
/// # 设计背景（Why）
/// - 每次通道构建产生一个新工厂实例，绑定本次构建派生的安全连接器；实例间
///   互不共享状态，保证两次构建互不影响。
///
/// # 契约说明（What）
/// - 长期持有安全连接器的强引用；能力对象被通道栈与其派生对象共享，最后
///   一个引用释放时连接器引用随之归还。
#[derive(Debug)]
pub struct SecureChannelFactory {
    connector: Arc<SecurityConnector>,
    resolvers: Arc<ResolverRegistry>,
}

impl SecureChannelFactory {
    /// 以安全连接器与解析器注册表构造工厂。
    pub fn new(connector: Arc<SecurityConnector>, resolvers: Arc<ResolverRegistry>) -> Self {
        Self {
            connector,
            resolvers,
        }
    }

    /// 返回持有的安全连接器。
    pub fn security_connector(&self) -> &Arc<SecurityConnector> {
        &self.connector
    }
}

/// 安全握手安装回调：把连接器派生的安全步骤追加进握手链。
fn install_security_handshakers(connector: &SecurityConnector, chain: &mut HandshakeChain) {
    connector.install_handshakers(chain);
}

impl ClientChannelFactory for SecureChannelFactory {
    fn create_subchannel(&self, args: SubchannelArgs) -> Subchannel {
        let connector = Connector::new(
            args.server_name(),
            install_security_handshakers,
            Arc::clone(&self.connector),
        );
        Subchannel::new(connector, &args)
    }

    fn create_channel(
        self: Arc<Self>,
        target: &Endpoint,
        purpose: ChannelPurpose,
        config: ChannelConfig,
    ) -> crate::Result<Channel> {
        let mut stack = ChannelStack::new(target.clone(), purpose, config);
        let resolver = self
            .resolvers
            .start(target, stack.config())
            .map_err(|err| {
                tracing::error!(
                    target: "tether::factory",
                    endpoint = %target,
                    error = %err,
                    "resolver start failed, releasing partially built channel"
                );
                CoreError::new(
                    codes::CHANNEL_RESOLVER_CREATE,
                    alloc::format!("failed to start resolver for `{target}`"),
                )
                .with_cause(err.into_core_error())
            })?;
        stack.finish_init(resolver, self);
        Ok(Channel::live(stack))
    }
}
