//! 安全域契约：凭证、安全连接器与“凭证 → 连接器”派生接口。
//!
//! # 模块定位（Why）
//! - 通道构建把“如何认证”抽象为调用方持有的不可变 [`Credential`]，把“已验证
//!   的安全材料”抽象为共享所有权的 [`SecurityConnector`]；两者之间的策略性
//!   转换由 [`SecurityBinder`] 承担，实现位于本 crate 之外。
//! - 构建阶段只做策略校验与对象装配，不发生任何网络 I/O；真实握手由子通道
//!   的握手链在连接尝试时执行。

mod connector;
mod credential;

pub use connector::{
    SecurityBinder, SecurityBinding, SecurityConnector, SecurityConnectorError, SecurityProtocol,
};
pub use credential::{Credential, CredentialMaterial, CredentialScope};
