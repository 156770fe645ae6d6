use alloc::sync::Arc;

use crate::channel::{Channel, ChannelPurpose, StatusCode};
use crate::config::ChannelConfig;
use crate::factory::{ClientChannelFactory, SecureChannelFactory};
use crate::resolver::ResolverRegistry;
use crate::security::{Credential, SecurityBinder};
use crate::target::Endpoint;

/// `SecureChannelBootstrap` 是安全通道构建的顶层编排入口。
///
/// # 设计背景（Why）
/// - 构建需要正确组合四类独立生命周期的资源：凭证派生的安全状态、合并配置、
///   解析过程与多态工厂能力。编排集中在一处，保证每条失败路径都有确定的
///   归一行为，不产生泄漏，也不让半成品对象逃逸。
/// - 绑定器与解析器注册表在装配阶段注入一次，此后每次构建互不共享派生
///   状态（无隐式缓存），两条通道的安全连接器彼此独立。
///
/// # 契约说明（What）
/// - 唯一公开操作为 [`Self::create_secure_channel`]；该方法从不 panic。
/// - 除解析器启动失败（返回 `None`）外，所有失败折叠为跛脚通道返回。
///
/// # 风险提示（Trade-offs）
/// - “解析失败返回 `None` 而非跛脚通道”是有意保留的接口不对称：此时目标
///   本身不可用，无法为通道构造有意义的身份。
#[derive(Clone)]
pub struct SecureChannelBootstrap {
    binder: Arc<dyn SecurityBinder>,
    resolvers: Arc<ResolverRegistry>,
}

impl SecureChannelBootstrap {
    /// 以安全绑定器与解析器注册表装配编排器。
    pub fn new(binder: Arc<dyn SecurityBinder>, resolvers: Arc<ResolverRegistry>) -> Self {
        Self { binder, resolvers }
    }

    /// 访问解析器注册表。
    pub fn resolvers(&self) -> &Arc<ResolverRegistry> {
        &self.resolvers
    }

    /// 构建一条安全客户端通道。
    ///
    /// # 逻辑解析（How）
    /// 状态机按固定顺序推进，每个终态恰好释放其已获取的引用：
    /// 1. **参数校验**：配置已携带安全状态 → 跛脚通道（Internal），绑定器
    ///    不被调用；
    /// 2. **连接器创建**：绑定器拒绝 → 跛脚通道（Internal），解析器不会
    ///    启动；
    /// 3. **配置合并**：派生条目先入、调用方条目覆盖、回引唯一挂接；防御性
    ///    失败同样折叠为跛脚通道；
    /// 4. **工厂装配**：能力对象取得连接器的独立强引用，编排器自身的引用
    ///    保留到函数返回，保证清理对称；
    /// 5. **通道创建**：解析器启动失败时半成品栈与全部引用随返回路径释放，
    ///    本方法返回 `None`；
    /// 6. **完成**：编排器持有的临时引用在返回时释放，通道自洽。
    ///
    /// # 契约说明（What）
    /// - **输入**：凭证与配置在构建期间仅被借用；合并产物是独立副本。
    /// - **返回值**：`Some(Channel)`（存活或跛脚）或 `None`（仅解析器启动
    ///   失败）。
    /// - **后置条件**：无论成败，安全连接器的引用计数恰好等于返回对象内部
    ///   保留的份数，无多余引用，无泄漏。
    pub fn create_secure_channel(
        &self,
        credential: &Credential,
        target: &Endpoint,
        config: &ChannelConfig,
    ) -> Option<Channel> {
        tracing::debug!(
            target: "tether::bootstrap",
            endpoint = %target,
            entries = config.len(),
            "create_secure_channel"
        );

        // 必须在创建连接器之前检查，避免白白构造一次安全状态。
        if config.has_security_connector() {
            tracing::error!(
                target: "tether::bootstrap",
                endpoint = %target,
                "security connector already present in channel config"
            );
            return Some(Channel::lame(
                target.clone(),
                StatusCode::Internal,
                "Security connector exists in channel args.",
            ));
        }

        let binding = match self.binder.bind(credential, target, config) {
            Ok(binding) => binding,
            Err(err) => {
                tracing::error!(
                    target: "tether::bootstrap",
                    endpoint = %target,
                    error = %err,
                    "failed to create security connector"
                );
                return Some(Channel::lame(
                    target.clone(),
                    StatusCode::Internal,
                    "Failed to create security connector.",
                ));
            }
        };
        let (connector, derived_config) = binding.into_parts();

        let merged = match ChannelConfig::merge(config, derived_config.as_ref(), Arc::clone(&connector))
        {
            Ok(merged) => merged,
            Err(err) => {
                tracing::error!(
                    target: "tether::bootstrap",
                    endpoint = %target,
                    error = %err,
                    "failed to merge channel configuration"
                );
                return Some(Channel::lame(
                    target.clone(),
                    StatusCode::Internal,
                    "Failed to merge channel configuration.",
                ));
            }
        };

        // 能力对象取得连接器的独立强引用；编排器自身的 `connector` 保留到
        // 函数返回，清理保持对称。
        let capability: Arc<dyn ClientChannelFactory> = Arc::new(SecureChannelFactory::new(
            Arc::clone(&connector),
            Arc::clone(&self.resolvers),
        ));

        match Arc::clone(&capability).create_channel(target, ChannelPurpose::Regular, merged) {
            Ok(channel) => Some(channel),
            Err(err) => {
                tracing::error!(
                    target: "tether::bootstrap",
                    endpoint = %target,
                    error = %err,
                    "channel creation failed, returning no channel"
                );
                None
            }
        }
    }
}

impl core::fmt::Debug for SecureChannelBootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecureChannelBootstrap")
            .field("resolvers", &self.resolvers)
            .finish_non_exhaustive()
    }
}
