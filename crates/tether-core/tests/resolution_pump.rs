use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures::task::noop_waker;
use thiserror::Error;

use tether_core::test_stubs::security::StaticBinder;
use tether_core::{
    AddressUpdate, ChannelConfig, ConnectivityState, Credential, CredentialMaterial,
    CredentialScope, Endpoint, ResolvedAddr, Resolver, ResolverError, ResolverFactory,
    ResolverRegistry, SecureChannelBootstrap, StatusCode, Stream, into_update_stream,
};

fn credential() -> Credential {
    Credential::new(
        CredentialMaterial::CertificateChain(b"leaf+chain".to_vec()),
        CredentialScope::Connection,
    )
}

fn addr(last_octet: u8) -> ResolvedAddr {
    ResolvedAddr::V4 {
        addr: [10, 0, 0, last_octet],
        port: 443,
    }
}

/// 两批更新的测试解析器：演示地址变化驱动子通道集合重建。
struct TwoPhaseResolver {
    updates: Vec<AddressUpdate>,
    refreshes: Arc<AtomicUsize>,
}

impl Resolver for TwoPhaseResolver {
    fn poll_update(&mut self, _cx: &mut Context<'_>) -> Poll<Option<AddressUpdate>> {
        if self.updates.is_empty() {
            Poll::Pending
        } else {
            Poll::Ready(Some(self.updates.remove(0)))
        }
    }

    fn request_refresh(&mut self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// 后端不可达时以实现私有错误包装进 [`ResolverError`] 的工厂。
#[derive(Debug, Error)]
#[error("dns backend unreachable: {0}")]
struct DnsBackendError(String);

struct TwoPhaseResolverFactory {
    refreshes: Arc<AtomicUsize>,
}

impl ResolverFactory for TwoPhaseResolverFactory {
    fn scheme(&self) -> &'static str {
        "dns"
    }

    fn start(
        &self,
        target: &Endpoint,
        _config: &ChannelConfig,
    ) -> Result<Box<dyn Resolver>, ResolverError> {
        if target.host() == "unreachable.example.com" {
            let cause = DnsBackendError(target.host().to_string());
            return Err(ResolverError::Other(cause.to_string()));
        }
        Ok(Box::new(TwoPhaseResolver {
            updates: vec![
                AddressUpdate::new(vec![addr(1), addr(2)]),
                AddressUpdate::new(vec![addr(3)]),
            ],
            refreshes: Arc::clone(&self.refreshes),
        }))
    }
}

fn bootstrap() -> (SecureChannelBootstrap, Arc<AtomicUsize>) {
    let refreshes = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ResolverRegistry::new("dns"));
    registry.register(Arc::new(TwoPhaseResolverFactory {
        refreshes: Arc::clone(&refreshes),
    }));
    (
        SecureChannelBootstrap::new(Arc::new(StaticBinder::new()), registry),
        refreshes,
    )
}

/// 验证解析泵：地址更新驱动子通道重建，且每个子通道携带安全握手链。
///
/// # 测试目标（Why）
/// - 构建完成后，通道栈持有的解析器与工厂能力需协同工作：每批地址更新
///   经工厂能力转化为子通道集合；握手链以传输步骤起链、安全步骤收尾。
///
/// # 测试步骤（How）
/// 1. 构建存活通道，初始连接状态为 `Idle`（尚无子通道）；
/// 2. 第一次泵取得两个子通道，状态转为 `Connecting`；
/// 3. 检查子通道的握手链标签为 `["tcp", "tls"]`、服务器名为目标权威名；
/// 4. 第二次泵整体替换为一个子通道；
/// 5. 第三次泵无更新，返回 `Pending`。
#[test]
fn address_updates_drive_subchannel_rebuild_with_security_handshake() {
    let target = Endpoint::parse("example.com:443").expect("目标应可解析");
    let (bootstrap, refreshes) = bootstrap();
    let mut channel = bootstrap
        .create_secure_channel(&credential(), &target, &ChannelConfig::new())
        .expect("构建应成功");
    assert_eq!(channel.connectivity_state(), ConnectivityState::Idle);

    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);

    assert_eq!(
        channel.poll_resolution(&mut cx),
        Poll::Ready(Some(2)),
        "第一批更新应产出两个子通道"
    );
    assert_eq!(channel.connectivity_state(), ConnectivityState::Connecting);

    {
        let stack = channel.stack().expect("存活通道应暴露内部栈");
        let subchannels = stack.subchannels();
        assert_eq!(subchannels.len(), 2);
        for subchannel in subchannels {
            assert_eq!(subchannel.state(), ConnectivityState::Idle);
            assert_eq!(subchannel.connector().server_name(), "example.com:443");
            let labels: Vec<&str> = subchannel
                .connector()
                .handshake()
                .steps()
                .map(|step| step.label())
                .collect();
            assert_eq!(labels, vec!["tcp", "tls"], "安全步骤应由连接器追加在传输步骤之后");
        }
        assert_eq!(subchannels[0].address(), addr(1));
        assert_eq!(subchannels[1].address(), addr(2));
    }

    assert_eq!(
        channel.poll_resolution(&mut cx),
        Poll::Ready(Some(1)),
        "第二批更新应整体替换子通道集合"
    );
    let stack = channel.stack().expect("存活通道应暴露内部栈");
    assert_eq!(stack.subchannels().len(), 1);
    assert_eq!(stack.subchannels()[0].address(), addr(3));

    assert_eq!(
        channel.poll_resolution(&mut cx),
        Poll::Pending,
        "暂无更新时泵应返回 Pending"
    );

    channel.request_refresh();
    assert_eq!(
        refreshes.load(Ordering::SeqCst),
        1,
        "刷新请求应穿透通道栈抵达解析器"
    );
}

/// 验证跛脚通道的泵语义：解析过程视为已终止。
#[test]
fn lame_channel_reports_terminated_resolution() {
    let target = Endpoint::parse("example.com:443").expect("目标应可解析");
    let mut channel = tether_core::Channel::lame(target, StatusCode::Internal, "broken");

    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);
    assert_eq!(channel.poll_resolution(&mut cx), Poll::Ready(None));
}

/// 验证解析器实现可将私有底层错误翻译为契约错误并走 `None` 终态。
///
/// # 测试目标（Why）
/// - 工厂实现内部的错误类型（此处以 `thiserror` 定义）不进入契约签名，
///   但其信息需经 [`ResolverError`] 保留给日志与排障。
#[test]
fn resolver_implementation_errors_surface_as_absent_channel() {
    let target = Endpoint::parse("unreachable.example.com:443").expect("目标应可解析");
    let (bootstrap, _refreshes) = bootstrap();
    let outcome = bootstrap.create_secure_channel(&credential(), &target, &ChannelConfig::new());
    assert!(outcome.is_none(), "解析器后端不可达应返回空结果");
}

/// 验证解析器到更新流的适配：流语义与轮询契约一致。
///
/// # 测试步骤（How）
/// 1. 直接从注册表启动解析器并适配为 `BoxStream`；
/// 2. 依次取得两批更新后进入 `Pending`。
#[test]
fn resolver_adapts_to_update_stream() {
    let (bootstrap, _refreshes) = bootstrap();
    let target = Endpoint::parse("example.com:443").expect("目标应可解析");
    let resolver = bootstrap
        .resolvers()
        .start(&target, &ChannelConfig::new())
        .expect("解析器应能启动");
    let mut stream = into_update_stream(resolver);

    let waker = noop_waker();
    let mut cx = Context::from_waker(&waker);

    match stream.as_mut().poll_next(&mut cx) {
        Poll::Ready(Some(update)) => assert_eq!(update.addresses().len(), 2),
        other => panic!("首批更新应立即就绪，实际为 {other:?}"),
    }
    match stream.as_mut().poll_next(&mut cx) {
        Poll::Ready(Some(update)) => assert_eq!(update.addresses().len(), 1),
        other => panic!("次批更新应立即就绪，实际为 {other:?}"),
    }
    assert!(matches!(stream.as_mut().poll_next(&mut cx), Poll::Pending));
}
