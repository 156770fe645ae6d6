use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

/// 凭证在安全流程中的适用范围。
///
/// # 设计参考
/// - 对标 OAuth2 token scope 与通道凭证分类，将范围划分为连接/会话/消息层。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialScope {
    /// 面向传输连接（如 TLS 握手）。
    Connection,
    /// 面向逻辑会话（如单条 RPC 流）。
    Session,
    /// 面向单次消息或请求。
    Message,
}

/// 凭证载荷。
///
/// # 背景（Why）
/// - 提供统一封装，便于在 `no_std` 环境通过 `Vec<u8>` 传输不同格式的密钥和
///   令牌。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CredentialMaterial {
    /// DER 编码证书链或私钥。
    CertificateChain(Vec<u8>),
    /// 对称密钥。
    SymmetricKey(Vec<u8>),
    /// 签名令牌或断言（如 JWT）。
    SignedToken(Vec<u8>),
    /// 公钥材料。
    PublicKey(Vec<u8>),
    /// 其他类型，由 `format` 字段说明。
    ///
    /// # 实现责任 (Implementation Responsibility)
    /// - **命名约定**：`format` 推荐使用 IANA 注册名或组织前缀，确保跨系统唯一。
    /// - **错误处理**：派生方若不支持该格式，必须返回
    ///   [`super::SecurityConnectorError::InvalidCredential`]，禁止静默降级为
    ///   已知类型。
    Custom { format: String, payload: Vec<u8> },
}

impl CredentialMaterial {
    /// 返回材料的原始字节，用于指纹计算。
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::CertificateChain(bytes)
            | Self::SymmetricKey(bytes)
            | Self::SignedToken(bytes)
            | Self::PublicKey(bytes) => bytes,
            Self::Custom { payload, .. } => payload,
        }
    }

    /// 返回材料类型的稳定标签，用于日志与指纹域分隔。
    pub fn kind_label(&self) -> &str {
        match self {
            Self::CertificateChain(_) => "certificate_chain",
            Self::SymmetricKey(_) => "symmetric_key",
            Self::SignedToken(_) => "signed_token",
            Self::PublicKey(_) => "public_key",
            Self::Custom { format, .. } => format,
        }
    }
}

/// 凭证实体，描述调用方“如何认证”。
///
/// # 契约说明（What）
/// - 不可变；由调用方持有，构建流程仅在执行期间借用。
/// - 结构体本身不做签名或加密处理，真实校验发生在 [`super::SecurityBinder`]
///   实现与后续握手阶段。
///
/// # 风险提示（Trade-offs）
/// - 凭证不会自动擦除内存，敏感场景请结合安全内存分配器或零化工具。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    material: CredentialMaterial,
    scope: CredentialScope,
}

impl Credential {
    /// 构建凭证实体。
    pub fn new(material: CredentialMaterial, scope: CredentialScope) -> Self {
        Self { material, scope }
    }

    /// 获取凭证材料。
    pub fn material(&self) -> &CredentialMaterial {
        &self.material
    }

    /// 获取适用范围。
    pub fn scope(&self) -> CredentialScope {
        self.scope
    }
}
