//! 共享会话 - 编排层
//!
//! 持有当前会话 Cookie；刷新时独占页面：重新打开门户，再导出 Cookie

use crate::infrastructure::PortalSurface;
use crate::models::SessionTokens;
use crate::services::{GatewayTimings, PortalGateway, SessionBridge};
use crate::workflow::SessionProvider;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// 共享会话
///
/// 刷新操作被互斥锁串行化，同一时刻只有一个任务在操作页面
pub struct SharedSession<S: PortalSurface + ?Sized> {
    surface: Arc<S>,
    bridge: SessionBridge,
    entry_url: String,
    timings: GatewayTimings,
    current: Mutex<SessionTokens>,
    refresh_count: AtomicUsize,
}

impl<S: PortalSurface + ?Sized> SharedSession<S> {
    pub fn new(
        surface: Arc<S>,
        bridge: SessionBridge,
        initial: SessionTokens,
        entry_url: impl Into<String>,
        timings: GatewayTimings,
    ) -> Self {
        Self {
            surface,
            bridge,
            entry_url: entry_url.into(),
            timings,
            current: Mutex::new(initial),
            refresh_count: AtomicUsize::new(0),
        }
    }

    /// 已刷新的次数
    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: PortalSurface + ?Sized> SessionProvider for SharedSession<S> {
    async fn current(&self) -> SessionTokens {
        self.current.lock().await.clone()
    }

    async fn refresh(&self, stale: &SessionTokens) -> Result<SessionTokens> {
        let mut current = self.current.lock().await;
        if *current != *stale {
            debug!("会话已被其他任务刷新，直接使用");
            return Ok(current.clone());
        }

        info!("🔄 重新打开门户以刷新会话");
        let gateway = PortalGateway::new(
            self.surface.as_ref(),
            self.entry_url.clone(),
            self.timings.clone(),
        );
        gateway.open().await?;

        let fresh = self.bridge.snapshot(self.surface.as_ref()).await?;
        *current = fresh.clone();
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        Ok(fresh)
    }
}
