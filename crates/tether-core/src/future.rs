use alloc::boxed::Box;
use core::{
    pin::Pin,
    task::{Context, Poll},
};

/// `Stream` 描述按需拉取元素的异步序列。
///
/// # 设计背景（Why）
/// - 解析器向通道栈分发地址更新属于典型的异步序列，契约层需要一个对象安全、
///   与运行时无关的最小抽象。
///
/// # 契约说明（What）
/// - `poll_next` 与标准 Stream 语义一致，返回 `Poll<Option<Item>>`；
///   `Ready(None)` 表示序列终止，之后不应再轮询。
pub trait Stream {
    /// 流中产生的元素类型。
    type Item;

    /// 从流中轮询下一个元素。
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>>;
}

/// `BoxStream` 为对象安全的流包装。
///
/// # 契约说明（What）
/// - 封装任何实现 `Stream + Send` 的类型，生命周期由 `'a` 限定。
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;
