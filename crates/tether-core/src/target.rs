use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, codes};

/// `Endpoint` 将逻辑协议与目标地址绑定。
///
/// # 设计背景（Why）
/// - 通道构建需要统一表达 `dns://example.com:443` 等带 scheme 的逻辑地址与
///   `example.com:443` 这类裸目标；scheme 决定由哪个解析器工厂接管。
/// - 与物理套接字地址（[`ResolvedAddr`]）分离，保证构建阶段不触发任何解析。
///
/// # 契约说明（What）
/// - `scheme` 可为空字符串，表示交由解析器注册表套用默认 scheme。
/// - `host` 可为域名或逻辑服务名，`port` 为目标端口。
///
/// # 风险提示（Trade-offs）
/// - 未支持 Unix Domain Socket 等无端口目标，如有需要可在上层扩展。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: u16,
}

impl Endpoint {
    /// 构造新的端点。
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port,
        }
    }

    /// 从目标字符串解析端点。
    ///
    /// # 契约说明（What）
    /// - **输入**：`host:port` 或 `scheme://host:port`；IPv6 字面量需用方括号
    ///   包裹（`[::1]:443`）。
    /// - **返回值**：解析成功返回 [`Endpoint`]；缺失端口或端口非法时返回
    ///   [`codes::TARGET_INVALID`] 错误。
    /// - **后置条件**：裸目标的 `scheme` 为空字符串，由解析器注册表补全默认值。
    pub fn parse(target: &str) -> crate::Result<Self> {
        let (scheme, rest) = match target.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("", target),
        };
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid_target(target, "missing port"))?;
        let port: u16 = port
            .parse()
            .map_err(|_| invalid_target(target, "port out of range"))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid_target(target, "empty host"));
        }
        Ok(Self::new(scheme, host, port))
    }

    /// 返回协议方案，可能为空。
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// 返回主机名或服务名。
    pub fn host(&self) -> &str {
        &self.host
    }

    /// 返回端口号。
    pub fn port(&self) -> u16 {
        self.port
    }

    /// 返回 `host:port` 形式的权威名，用于子通道的握手目标。
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn invalid_target(target: &str, reason: &str) -> CoreError {
    CoreError::new(
        codes::TARGET_INVALID,
        format!("invalid target `{target}`: {reason}"),
    )
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme.is_empty() {
            write!(f, "{}:{}", self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

/// `ResolvedAddr` 在 `no_std` 场景下提供统一的套接字地址表达。
///
/// # 设计背景（Why）
/// - 避免绑定到 `std::net::SocketAddr`，以便在 unikernel 或嵌入式环境部署。
/// - 使用枚举存储原始字节，序列化时无需动态分配。
///
/// # 契约说明（What）
/// - `V4`、`V6` 分别存储 IPv4、IPv6 原始字节；`Display` 遵循人类可读格式。
///
/// # 风险提示（Trade-offs）
/// - 未对 IPv6 地址进行零压缩优化，优先保证直观可读。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ResolvedAddr {
    /// IPv4 地址。
    V4 { addr: [u8; 4], port: u16 },
    /// IPv6 地址。
    V6 { addr: [u16; 8], port: u16 },
}

impl ResolvedAddr {
    /// 返回端口号。
    pub fn port(&self) -> u16 {
        match self {
            Self::V4 { port, .. } | Self::V6 { port, .. } => *port,
        }
    }
}

impl fmt::Display for ResolvedAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAddr::V4 { addr, port } => {
                write!(
                    f,
                    "{}.{}.{}.{}:{}",
                    addr[0], addr[1], addr[2], addr[3], port
                )
            }
            ResolvedAddr::V6 { addr, port } => {
                let segments: Vec<String> = addr
                    .iter()
                    .map(|segment| format!("{:x}", segment))
                    .collect();
                write!(f, "[{}]:{}", segments.join(":"), port)
            }
        }
    }
}

#[cfg(feature = "std")]
impl From<std::net::SocketAddr> for ResolvedAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        match addr {
            std::net::SocketAddr::V4(v4) => Self::V4 {
                addr: v4.ip().octets(),
                port: v4.port(),
            },
            std::net::SocketAddr::V6(v6) => Self::V6 {
                addr: v6.ip().segments(),
                port: v6.port(),
            },
        }
    }
}
