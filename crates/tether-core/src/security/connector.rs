use alloc::borrow::Cow;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;
use crate::config::ChannelConfig;
use crate::error::{CoreError, codes};
use crate::subchannel::{HandshakeChain, HandshakeStep};
use crate::target::Endpoint;

use super::credential::{Credential, CredentialScope};

/// 安全协议枚举，标识连接器承诺的握手形态。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SecurityProtocol {
    /// mTLS 或 TLS1.3 双向认证。
    MutualTls,
    /// 单向 TLS，结合令牌绑定。
    TokenBinding,
    /// 自定义协议，通过名称说明。
    Custom { name: String },
}

impl SecurityProtocol {
    /// 返回协议对应的握手步骤标签。
    pub fn handshake_label(&self) -> Cow<'static, str> {
        match self {
            Self::MutualTls => Cow::Borrowed("tls"),
            Self::TokenBinding => Cow::Borrowed("token-binding"),
            Self::Custom { name } => Cow::Owned(name.clone()),
        }
    }
}

/// `SecurityConnector` 将凭证与目标绑定为已验证的安全状态。
///
/// # 设计背景（Why）
/// - 通道、工厂能力与合并配置都需要引用同一份安全材料；以 `Arc` 共享所有权，
///   最后一个持有者释放引用后材料随之销毁，天然满足“引用计数归零前材料不得
///   释放”的约束。
/// - 创建阶段只做凭证与目标配对的策略校验，不触网；真实握手推迟到子通道的
///   连接尝试。
///
/// # 契约说明（What）
/// - 创建之后不可变：除引用计数外无任何字段在构造后被修改，读取无需加锁。
/// - `fingerprint` 为凭证材料的 SHA-256 摘要（域分隔符为材料类型标签），用于
///   审计与轮换比对，不回泄原始材料。
///
/// # 风险提示（Trade-offs）
/// - 连接器持有 SNI 主机名的独立副本而非借用，换取 `'static` 生命周期与跨
///   线程移动能力。
#[derive(Debug, PartialEq, Eq)]
pub struct SecurityConnector {
    target_host: String,
    sni_host: String,
    protocol: SecurityProtocol,
    scope: CredentialScope,
    fingerprint: [u8; 32],
}

impl SecurityConnector {
    /// 构造安全连接器。
    ///
    /// # 契约说明
    /// - **参数**：`target_host` 为通道目标主机；`sni_host` 为握手时呈现的
    ///   服务器名，允许与目标主机不同（如经由代理）；`protocol` 指明握手形态。
    /// - **后置条件**：指纹由凭证材料即时计算，之后凭证本体不再被引用。
    pub fn new(
        target_host: impl Into<String>,
        sni_host: impl Into<String>,
        protocol: SecurityProtocol,
        credential: &Credential,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(credential.material().kind_label().as_bytes());
        hasher.update([0u8]);
        hasher.update(credential.material().payload());
        let digest = hasher.finalize();
        let mut fingerprint = [0u8; 32];
        fingerprint.copy_from_slice(&digest);

        Self {
            target_host: target_host.into(),
            sni_host: sni_host.into(),
            protocol,
            scope: credential.scope(),
            fingerprint,
        }
    }

    /// 返回通道目标主机。
    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    /// 返回握手呈现的服务器名。
    pub fn sni_host(&self) -> &str {
        &self.sni_host
    }

    /// 返回握手协议。
    pub fn protocol(&self) -> &SecurityProtocol {
        &self.protocol
    }

    /// 返回凭证适用范围。
    pub fn scope(&self) -> CredentialScope {
        self.scope
    }

    /// 返回凭证材料指纹。
    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.fingerprint
    }

    /// 向握手链追加安全握手步骤。
    ///
    /// # 契约说明（What）
    /// - 传输层步骤应已先行入链；本方法仅追加由协议派生的安全步骤。
    /// - 幂等性不做保证：重复调用会追加重复步骤，安装方应只调用一次。
    pub fn install_handshakers(&self, chain: &mut HandshakeChain) {
        chain.push(HandshakeStep::new(self.protocol.handshake_label()));
    }
}

/// “凭证 + 目标”配对被拒绝的原因。
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SecurityConnectorError {
    /// 目标 scheme 不支持安全传输。
    UnsupportedScheme(String),
    /// 凭证对该目标无效。
    InvalidCredential(String),
    /// 其他策略性拒绝。
    Other(String),
}

impl SecurityConnectorError {
    /// 映射为核心错误，保留稳定错误码与原因链。
    pub fn into_core_error(self) -> CoreError {
        let code = match &self {
            Self::UnsupportedScheme(_) => codes::SECURITY_UNSUPPORTED_SCHEME,
            Self::InvalidCredential(_) | Self::Other(_) => codes::SECURITY_INVALID_CREDENTIAL,
        };
        let message = match &self {
            Self::UnsupportedScheme(scheme) => {
                alloc::format!("target scheme `{scheme}` does not support secure transport")
            }
            Self::InvalidCredential(reason) | Self::Other(reason) => reason.clone(),
        };
        CoreError::new(code, message).with_cause(self)
    }
}

impl fmt::Display for SecurityConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedScheme(scheme) => write!(f, "unsupported scheme `{scheme}`"),
            Self::InvalidCredential(reason) => write!(f, "invalid credential: {reason}"),
            Self::Other(reason) => write!(f, "security connector rejected: {reason}"),
        }
    }
}

impl Error for SecurityConnectorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

/// 派生结果：连接器本体与可选的派生配置片段。
///
/// # 契约说明（What）
/// - `derived_config` 为连接器建议的附加参数（如 SNI 主机名），由配置合并
///   阶段以低优先级并入；不得携带安全状态槽位。
#[derive(Debug)]
pub struct SecurityBinding {
    connector: Arc<SecurityConnector>,
    derived_config: Option<ChannelConfig>,
}

impl SecurityBinding {
    /// 构造派生结果。
    pub fn new(connector: Arc<SecurityConnector>, derived_config: Option<ChannelConfig>) -> Self {
        Self {
            connector,
            derived_config,
        }
    }

    /// 拆解为组成部分。
    pub fn into_parts(self) -> (Arc<SecurityConnector>, Option<ChannelConfig>) {
        (self.connector, self.derived_config)
    }

    /// 访问连接器。
    pub fn connector(&self) -> &Arc<SecurityConnector> {
        &self.connector
    }

    /// 访问派生配置。
    pub fn derived_config(&self) -> Option<&ChannelConfig> {
        self.derived_config.as_ref()
    }
}

/// “凭证 → 安全连接器”的派生契约，由具体安全实现提供。
///
/// # 设计背景（Why）
/// - 通道构建编排不关心 TLS 细节或令牌校验逻辑，仅依赖本契约完成策略校验与
///   连接器装配；实现方（mTLS、令牌绑定、测试桩）在 crate 之外自由演进。
///
/// # 契约说明（What）
/// - **输入**：借用的凭证、目标端点与调用方基础配置（供策略读取，不得修改）。
/// - **输出**：成功返回引用计数为 1 的连接器与可选派生配置；失败返回
///   [`SecurityConnectorError`]。
/// - **禁止副作用**：不得发起网络 I/O；本阶段只做凭证与目标配对的合法性
///   判定。
pub trait SecurityBinder: Send + Sync + 'static {
    /// 将凭证绑定到目标，派生安全连接器。
    fn bind(
        &self,
        credential: &Credential,
        target: &Endpoint,
        base_config: &ChannelConfig,
    ) -> Result<SecurityBinding, SecurityConnectorError>;
}
