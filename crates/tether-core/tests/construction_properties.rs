use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use tether_core::test_stubs::resolver::{FailingResolverFactory, StaticResolverFactory};
use tether_core::test_stubs::security::{RecordingBinder, RejectingBinder, StaticBinder};
use tether_core::{
    AddressUpdate, ChannelConfig, ConfigValue, Credential, CredentialMaterial, CredentialScope,
    Endpoint, ResolvedAddr, ResolverRegistry, SecureChannelBootstrap, SecurityBinder,
    SecurityConnector, SecurityConnectorError, SecurityProtocol,
};

fn credential() -> Credential {
    Credential::new(
        CredentialMaterial::SignedToken(b"prop-token".to_vec()),
        CredentialScope::Connection,
    )
}

fn connector() -> Arc<SecurityConnector> {
    Arc::new(SecurityConnector::new(
        "example.com",
        "example.com",
        SecurityProtocol::MutualTls,
        &credential(),
    ))
}

fn config_from(entries: &BTreeMap<String, i64>) -> ChannelConfig {
    let mut config = ChannelConfig::new();
    for (key, value) in entries {
        config.insert(key.clone(), ConfigValue::I64(*value));
    }
    config
}

fn entry_strategy() -> impl Strategy<Value = BTreeMap<String, i64>> {
    proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8)
}

proptest! {
    /// 合并优先级的全量性质：同名键取调用方值，派生独有键保留，回引唯一。
    ///
    /// # 测试目标（Why）
    /// - 在任意键值组合下验证合并次序约定，而非只覆盖手工挑选的样例。
    #[test]
    fn merge_precedence_holds_for_arbitrary_entries(
        base_entries in entry_strategy(),
        derived_entries in entry_strategy(),
    ) {
        let base = config_from(&base_entries);
        let derived = config_from(&derived_entries);

        let merged = ChannelConfig::merge(&base, Some(&derived), connector())
            .expect("无安全状态输入的合并必须成功");

        for (key, value) in &base_entries {
            prop_assert_eq!(merged.get_i64(key), Some(*value), "调用方条目必须保留");
        }
        for (key, value) in &derived_entries {
            if !base_entries.contains_key(key) {
                prop_assert_eq!(merged.get_i64(key), Some(*value), "派生独有条目必须保留");
            }
        }
        prop_assert_eq!(
            merged.len(),
            base_entries.len()
                + derived_entries
                    .keys()
                    .filter(|key| !base_entries.contains_key(*key))
                    .count()
        );
        prop_assert!(merged.has_security_connector(), "回引条目必须唯一挂接");
    }

    /// 端点显示与解析的往返一致性。
    #[test]
    fn endpoint_display_parse_roundtrip(
        scheme in proptest::option::of("[a-z]{2,6}"),
        host in "[a-z]{1,10}(\\.[a-z]{1,10}){0,2}",
        port in 1u16..,
    ) {
        let endpoint = Endpoint::new(scheme.unwrap_or_default(), host, port);
        let reparsed = Endpoint::parse(&endpoint.to_string()).expect("显示格式必须可回解析");
        prop_assert_eq!(endpoint, reparsed);
    }

    /// 引用计数平衡对所有终态成立：返回对象之外不残留任何连接器引用。
    ///
    /// # 测试目标（Why）
    /// - 构建状态机的每个终态（成功、冲突、绑定失败、解析失败）都必须恰好
    ///   释放其获取的引用；以随机失败点覆盖全部分支。
    ///
    /// # 输入/输出契约（What）
    /// - `mode == 0`：成功 → 通道内部保留 2 份引用，销毁后归零；
    /// - `mode == 1`：冲突 → 绑定器从不派生连接器；
    /// - `mode == 2`：绑定失败 → 同上；
    /// - `mode == 3`：解析失败 → 派生的连接器被完整释放。
    #[test]
    fn reference_counts_balance_across_all_terminal_states(
        mode in 0u8..4,
        entries in entry_strategy(),
    ) {
        let binder = Arc::new(RecordingBinder::new(StaticBinder::new()));
        let rejecting = Arc::new(RejectingBinder::new(SecurityConnectorError::Other(
            "policy veto".into(),
        )));
        let registry = Arc::new(ResolverRegistry::new("dns"));
        if mode == 3 {
            registry.register(Arc::new(FailingResolverFactory::new("dns", "down")));
        } else {
            registry.register(Arc::new(StaticResolverFactory::new(
                "dns",
                vec![AddressUpdate::new(vec![ResolvedAddr::V4 {
                    addr: [127, 0, 0, 1],
                    port: 443,
                }])],
            )));
        }

        let chosen: Arc<dyn SecurityBinder> = if mode == 2 {
            rejecting
        } else {
            binder.clone()
        };
        let bootstrap = SecureChannelBootstrap::new(chosen, registry);

        let target = Endpoint::parse("example.com:443").expect("目标应可解析");
        let mut config = config_from(&entries);
        if mode == 1 {
            config = config.with_security_connector(connector());
        }

        let outcome = bootstrap.create_secure_channel(&credential(), &target, &config);

        match mode {
            0 => {
                let channel = outcome.expect("成功路径必须返回通道");
                prop_assert!(!channel.is_lame());
                let minted = binder.last_minted().expect("应派生连接器");
                prop_assert_eq!(Arc::strong_count(&minted), 4);
                drop(channel);
                prop_assert_eq!(Arc::strong_count(&minted), 2);
            }
            1 => {
                let channel = outcome.expect("冲突路径必须返回跛脚通道");
                prop_assert!(channel.is_lame());
                prop_assert_eq!(binder.calls(), 0);
            }
            2 => {
                let channel = outcome.expect("绑定失败路径必须返回跛脚通道");
                prop_assert!(channel.is_lame());
                prop_assert!(binder.minted().is_empty());
            }
            3 => {
                prop_assert!(outcome.is_none(), "解析失败必须返回空结果");
                let minted = binder.last_minted().expect("应派生连接器");
                prop_assert_eq!(Arc::strong_count(&minted), 2);
            }
            _ => unreachable!(),
        }
    }
}
