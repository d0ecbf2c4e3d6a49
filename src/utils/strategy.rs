//! 有序候选策略
//!
//! "按顺序尝试每个候选，第一个成功即停止，全部失败也不报错" 这一模式在
//! 打开 Case Status 页面、关闭弹窗等地方反复出现，统一在这里实现。

use std::fmt::Display;
use std::future::Future;
use tracing::debug;

/// 依次尝试候选项，返回第一个成功的候选
///
/// - `attempt` 返回 `Ok(true)` 视为成功并短路
/// - `Ok(false)` 或 `Err(_)` 都只记录后继续下一个
/// - 全部失败返回 `None`，由调用方决定是否继续
pub async fn first_success<'a, T, F, Fut>(candidates: &'a [T], mut attempt: F) -> Option<&'a T>
where
    T: Display,
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    for candidate in candidates {
        match attempt(candidate).await {
            Ok(true) => return Some(candidate),
            Ok(false) => debug!("候选 {} 未命中", candidate),
            Err(e) => debug!("候选 {} 失败: {}", candidate, e),
        }
    }
    None
}
