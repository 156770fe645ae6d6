//! 通道构建契约使用的官方测试桩集合。
//!
//! # 设计定位（Why）
//! - 合约测试与端到端验证经常需要满足 [`crate::security::SecurityBinder`]、
//!   [`crate::resolver::ResolverFactory`] 等契约，但多数场景仅关注构建编排
//!   本身的行为。
//! - 将静态桩、拒绝桩与记录桩集中维护，接口演进时获得集中编译错误提示，
//!   避免在各测试文件内重复定义。
//!
//! # 使用方式（How）
//! - 通过 `use tether_core::test_stubs::security::*;` 等语句引入需要的桩。
//! - 记录型桩（[`security::RecordingBinder`]）保留派生连接器的强引用与调用
//!   计数，供测试断言 `Arc::strong_count` 与调用次序。
//!
//! # 风险与权衡（Trade-offs）
//! - 桩对象忽略真实校验逻辑，不能用于验证安全语义本身；需要时应替换为
//!   真实实现。
//! - 记录桩持有的强引用会计入引用计数，测试侧需将其算入期望值。

pub mod security {
    //! 安全域桩：静态派生、固定拒绝与记录型包装。

    use alloc::string::{String, ToString};
    use alloc::sync::Arc;
    use alloc::vec::Vec;

    use crate::config::{ChannelConfig, ConfigValue};
    use crate::security::{
        Credential, SecurityBinder, SecurityBinding, SecurityConnector, SecurityConnectorError,
        SecurityProtocol,
    };
    use crate::target::Endpoint;

    /// `StaticBinder` 总是成功派生连接器，适用于走通主路径的测试。
    ///
    /// # 行为描述（How）
    /// - SNI 默认取目标主机名，可通过 [`Self::with_sni`] 覆盖；
    /// - 可选地携带派生配置条目，模拟连接器建议的附加参数。
    #[derive(Debug, Default)]
    pub struct StaticBinder {
        sni_override: Option<String>,
        derived_entries: Vec<(String, ConfigValue)>,
    }

    impl StaticBinder {
        /// 创建默认桩。
        pub fn new() -> Self {
            Self::default()
        }

        /// 覆盖派生连接器的 SNI 主机名。
        pub fn with_sni(mut self, sni: impl Into<String>) -> Self {
            self.sni_override = Some(sni.into());
            self
        }

        /// 附加一条派生配置条目。
        pub fn with_derived_entry(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
            self.derived_entries.push((key.into(), value));
            self
        }
    }

    impl SecurityBinder for StaticBinder {
        fn bind(
            &self,
            credential: &Credential,
            target: &Endpoint,
            _base_config: &ChannelConfig,
        ) -> Result<SecurityBinding, SecurityConnectorError> {
            let sni = self
                .sni_override
                .clone()
                .unwrap_or_else(|| target.host().to_string());
            let connector = Arc::new(SecurityConnector::new(
                target.host(),
                sni,
                SecurityProtocol::MutualTls,
                credential,
            ));
            let derived = if self.derived_entries.is_empty() {
                None
            } else {
                let mut config = ChannelConfig::new();
                for (key, value) in &self.derived_entries {
                    config.insert(key.clone(), value.clone());
                }
                Some(config)
            };
            Ok(SecurityBinding::new(connector, derived))
        }
    }

    /// `RejectingBinder` 以固定原因拒绝所有派生请求。
    #[derive(Debug)]
    pub struct RejectingBinder {
        reason: SecurityConnectorError,
    }

    impl RejectingBinder {
        /// 以给定原因创建拒绝桩。
        pub fn new(reason: SecurityConnectorError) -> Self {
            Self { reason }
        }
    }

    impl SecurityBinder for RejectingBinder {
        fn bind(
            &self,
            _credential: &Credential,
            _target: &Endpoint,
            _base_config: &ChannelConfig,
        ) -> Result<SecurityBinding, SecurityConnectorError> {
            Err(self.reason.clone())
        }
    }

    /// `RecordingBinder` 包装任意绑定器，记录调用次数与派生出的连接器。
    ///
    /// # 契约说明（What）
    /// - `minted` 保存每次成功派生的连接器强引用（每份计入引用计数 1），
    ///   供测试做 `Arc::strong_count` 与 `Arc::ptr_eq` 断言。
    #[derive(Debug)]
    pub struct RecordingBinder<B> {
        inner: B,
        calls: spin::Mutex<usize>,
        minted: spin::Mutex<Vec<Arc<SecurityConnector>>>,
    }

    impl<B> RecordingBinder<B> {
        /// 包装内部绑定器。
        pub fn new(inner: B) -> Self {
            Self {
                inner,
                calls: spin::Mutex::new(0),
                minted: spin::Mutex::new(Vec::new()),
            }
        }

        /// 返回 `bind` 被调用的次数。
        pub fn calls(&self) -> usize {
            *self.calls.lock()
        }

        /// 返回最近一次派生的连接器。
        pub fn last_minted(&self) -> Option<Arc<SecurityConnector>> {
            self.minted.lock().last().cloned()
        }

        /// 返回全部派生连接器的克隆。
        pub fn minted(&self) -> Vec<Arc<SecurityConnector>> {
            self.minted.lock().clone()
        }
    }

    impl<B: SecurityBinder> SecurityBinder for RecordingBinder<B> {
        fn bind(
            &self,
            credential: &Credential,
            target: &Endpoint,
            base_config: &ChannelConfig,
        ) -> Result<SecurityBinding, SecurityConnectorError> {
            *self.calls.lock() += 1;
            let binding = self.inner.bind(credential, target, base_config)?;
            self.minted.lock().push(Arc::clone(binding.connector()));
            Ok(binding)
        }
    }
}

pub mod resolver {
    //! 解析域桩：静态更新序列与固定失败工厂。

    use alloc::boxed::Box;
    use alloc::collections::VecDeque;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use core::task::{Context, Poll};

    use crate::config::ChannelConfig;
    use crate::resolver::{AddressUpdate, Resolver, ResolverError, ResolverFactory};
    use crate::target::Endpoint;

    /// `StaticResolver` 按预置顺序交付地址更新，耗尽后保持 `Pending`。
    ///
    /// # 契约说明（What）
    /// - 不注册 waker：测试侧通常以空操作 waker 手动轮询。
    /// - `request_refresh` 仅累加计数，供断言刷新请求次数。
    #[derive(Debug)]
    pub struct StaticResolver {
        updates: VecDeque<AddressUpdate>,
        refresh_requests: usize,
    }

    impl StaticResolver {
        /// 以更新序列创建解析器。
        pub fn new(updates: Vec<AddressUpdate>) -> Self {
            Self {
                updates: updates.into(),
                refresh_requests: 0,
            }
        }

        /// 返回收到的刷新请求次数。
        pub fn refresh_requests(&self) -> usize {
            self.refresh_requests
        }
    }

    impl Resolver for StaticResolver {
        fn poll_update(&mut self, _cx: &mut Context<'_>) -> Poll<Option<AddressUpdate>> {
            match self.updates.pop_front() {
                Some(update) => Poll::Ready(Some(update)),
                None => Poll::Pending,
            }
        }

        fn request_refresh(&mut self) {
            self.refresh_requests += 1;
        }
    }

    /// `StaticResolverFactory` 为固定 scheme 启动 [`StaticResolver`]。
    ///
    /// # 契约说明（What）
    /// - `started()` 返回 `start` 成功执行的次数，可用于断言“解析器从未
    ///   启动”这类次序不变量。
    #[derive(Debug)]
    pub struct StaticResolverFactory {
        scheme: &'static str,
        updates: Vec<AddressUpdate>,
        started: AtomicUsize,
    }

    impl StaticResolverFactory {
        /// 以 scheme 与预置更新序列创建工厂。
        pub fn new(scheme: &'static str, updates: Vec<AddressUpdate>) -> Self {
            Self {
                scheme,
                updates,
                started: AtomicUsize::new(0),
            }
        }

        /// 返回已启动的解析器数量。
        pub fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }
    }

    impl ResolverFactory for StaticResolverFactory {
        fn scheme(&self) -> &'static str {
            self.scheme
        }

        fn start(
            &self,
            _target: &Endpoint,
            _config: &ChannelConfig,
        ) -> Result<Box<dyn Resolver>, ResolverError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StaticResolver::new(self.updates.clone())))
        }
    }

    /// `FailingResolverFactory` 总是拒绝启动，用于驱动“无通道”失败路径。
    #[derive(Debug)]
    pub struct FailingResolverFactory {
        scheme: &'static str,
        reason: String,
    }

    impl FailingResolverFactory {
        /// 以 scheme 与失败原因创建工厂。
        pub fn new(scheme: &'static str, reason: impl Into<String>) -> Self {
            Self {
                scheme,
                reason: reason.into(),
            }
        }
    }

    impl ResolverFactory for FailingResolverFactory {
        fn scheme(&self) -> &'static str {
            self.scheme
        }

        fn start(
            &self,
            _target: &Endpoint,
            _config: &ChannelConfig,
        ) -> Result<Box<dyn Resolver>, ResolverError> {
            Err(ResolverError::Other(self.reason.clone()))
        }
    }
}
