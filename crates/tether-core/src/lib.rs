#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![doc = "tether-core: 安全 RPC 通道构建协议的核心契约与编排。"]
#![doc = ""]
#![doc = "给定调用方凭证与目标地址，产出一条可用的、经安全认证的通信通道，"]
#![doc = "并保证每条失败路径下的资源清理：不泄漏引用、不让半成品对象逃逸、"]
#![doc = "公开入口永远返回定义良好的结果（多数失败折叠为跛脚通道，仅解析器"]
#![doc = "启动失败返回空结果）。传输实现、解析算法、TLS 内部与调用分发运行时"]
#![doc = "均为外部协作方，经由窄契约接入。"]
#![doc = ""]
#![doc = "== 内存分配依赖 =="]
#![doc = "本 crate 定位于 `no_std + alloc` 场景：契约依赖 [`alloc`] 中的 `Box`、"]
#![doc = "`Arc`、`Vec` 支撑共享所有权与对象安全派发。纯 no_std（无分配器）环境"]
#![doc = "暂不支持。"]

extern crate alloc;

pub mod bootstrap;
pub mod channel;
pub mod config;
pub mod error;
pub mod factory;
pub mod future;
pub mod resolver;
pub mod security;
pub mod subchannel;
pub mod target;
/// 测试桩命名空间，集中暴露官方维护的静态/拒绝/记录桩，供集成测试复用。
pub mod test_stubs;

pub use bootstrap::SecureChannelBootstrap;
pub use channel::{
    Channel, ChannelPurpose, ChannelStack, ChannelStatus, ConnectivityState, StatusCode,
};
pub use config::{ChannelConfig, ConfigValue};
pub use error::{CoreError, ErrorCause, Result};
pub use factory::{ClientChannelFactory, SecureChannelFactory};
pub use future::{BoxStream, Stream};
pub use resolver::{
    AddressUpdate, Resolver, ResolverError, ResolverFactory, ResolverRegistry, into_update_stream,
};
pub use security::{
    Credential, CredentialMaterial, CredentialScope, SecurityBinder, SecurityBinding,
    SecurityConnector, SecurityConnectorError, SecurityProtocol,
};
pub use subchannel::{
    Connector, HandshakeChain, HandshakeStep, HandshakerInstaller, Subchannel, SubchannelArgs,
};
pub use target::{Endpoint, ResolvedAddr};

use alloc::boxed::Box;
use core::fmt;

/// 本 crate 所有错误必须实现的 `no_std` 基础 Trait。
///
/// # 设计背景（Why）
/// - `std::error::Error` 在 `no_std` 环境中不可用，因此需要一个对象安全、
///   与平台无关的错误抽象来串联底层错误链。
///
/// # 契约说明（What）
/// - 实现者提供 `Debug` 与 `Display`，便于日志与可观测性收集。
/// - `source` 语义与 `std::error::Error::source` 一致，返回链路上游错误；
///   返回引用的生命周期受限于 `self`，防止悬垂。
pub trait Error: fmt::Debug + fmt::Display {
    /// 返回当前错误的上游来源。
    fn source(&self) -> Option<&(dyn Error + 'static)>;
}

impl<E> Error for Box<E>
where
    E: Error + ?Sized,
{
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        (**self).source()
    }
}
