use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, codes};
use crate::security::SecurityConnector;

/// 配置条目的取值类型。
///
/// # 设计背景（Why）
/// - 通道配置混杂字符串、整数与开关量，统一枚举便于序列化与跨组件传递。
///
/// # 契约说明（What）
/// - 时长类参数约定以毫秒整数存储，经由 [`ChannelConfig::get_duration`] 读取。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigValue {
    /// UTF-8 字符串。
    Str(String),
    /// 有符号整数。
    I64(i64),
    /// 布尔开关。
    Bool(bool),
}

/// `ChannelConfig` 是通道构建使用的不可变有序键值集合。
///
/// # 设计背景（Why）
/// - 构建流程需要合并三路配置：调用方参数、安全连接器派生参数、以及指向
///   连接器本体的回引条目；选择 `BTreeMap` 保证遍历顺序稳定，方便调试。
/// - 安全状态回引以独立槽位建模而非普通条目，使“至多一个安全状态条目”成为
///   结构不变量，而不是运行时约定。
///
/// # 契约说明（What）
/// - 合并产物是独立副本，与调用方原配置不共享可变状态。
/// - `security` 槽位仅能由 [`ChannelConfig::with_security_connector`] 或
///   [`ChannelConfig::merge`] 写入；后者要求两路输入均不携带安全状态。
///
/// # 风险提示（Trade-offs）
/// - 克隆配置会同步增加安全连接器的引用计数；持有方应避免长期缓存副本。
#[derive(Clone, Debug, Default)]
pub struct ChannelConfig {
    entries: BTreeMap<String, ConfigValue>,
    security: Option<Arc<SecurityConnector>>,
}

impl ChannelConfig {
    /// 创建空配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入键值对，覆盖同名条目。
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.entries.insert(key.into(), value);
    }

    /// Builder 风格插入条目。
    pub fn with_entry(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder 风格附加安全连接器回引，仅用于测试冲突路径或外部预装配。
    pub fn with_security_connector(mut self, connector: Arc<SecurityConnector>) -> Self {
        self.security = Some(connector);
        self
    }

    /// 获取原始条目。
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// 获取字符串值。
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(ConfigValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// 获取整数值。
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(ConfigValue::I64(value)) => Some(*value),
            _ => None,
        }
    }

    /// 获取布尔值。
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(ConfigValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// 获取持续时间，约定单位为毫秒。
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        self.get_i64(key)
            .and_then(|millis| u64::try_from(millis).ok())
            .map(Duration::from_millis)
    }

    /// 遍历全部条目，顺序按键稳定。
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    /// 返回普通条目数量（不含安全状态槽位）。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否不含普通条目。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 是否已携带安全连接器回引。
    pub fn has_security_connector(&self) -> bool {
        self.security.is_some()
    }

    /// 获取安全连接器回引。
    pub fn security_connector(&self) -> Option<&Arc<SecurityConnector>> {
        self.security.as_ref()
    }

    /// 合并三路配置，产出通道最终使用的配置集合。
    ///
    /// # 设计背景（Why）
    /// - 安全连接器可能派生出额外参数（如 SNI 主机名），需要与调用方参数
    ///   合流；回引条目最后追加，保证通道栈能按需取回连接器。
    ///
    /// # 逻辑解析（How）
    /// 1. 先写入 `derived` 条目（低优先级）；
    /// 2. 再写入 `base` 条目，同名键覆盖派生值；
    /// 3. 最后挂接连接器回引，且必须唯一。
    ///
    /// # 契约说明（What）
    /// - **前置条件**：`base` 与 `derived` 均不得携带安全状态。编排层在连接器
    ///   创建之前已检查 `base`，此处校验属于防御性兜底。
    /// - **返回值**：独立副本；后续对 `base` 的修改不影响合并产物。
    /// - **失败语义**：违反前置条件时返回 [`codes::CHANNEL_CONFIG_MERGE`]。
    pub fn merge(
        base: &ChannelConfig,
        derived: Option<&ChannelConfig>,
        connector: Arc<SecurityConnector>,
    ) -> crate::Result<ChannelConfig> {
        if base.has_security_connector() {
            return Err(CoreError::new(
                codes::CHANNEL_CONFIG_MERGE,
                "base config already carries a security connector",
            ));
        }
        if derived.is_some_and(ChannelConfig::has_security_connector) {
            return Err(CoreError::new(
                codes::CHANNEL_CONFIG_MERGE,
                "derived config must not carry a security connector",
            ));
        }

        let mut entries = BTreeMap::new();
        if let Some(derived) = derived {
            entries.extend(
                derived
                    .entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
        }
        entries.extend(
            base.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        Ok(ChannelConfig {
            entries,
            security: Some(connector),
        })
    }
}
