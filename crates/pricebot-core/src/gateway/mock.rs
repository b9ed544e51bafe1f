//! Mock Chat Gateway
//!
//! Records every call so tests can assert on nicknames and notifications.

use std::sync::Mutex;
use std::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{BotCredential, ChatGateway};
use crate::error::{BotError, Result};
use crate::message::Embed;

/// A recorded gateway call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayCall {
    Open { client_id: String },
    Close { client_id: String },
    Nickname { client_id: String, guild_id: String, nickname: String },
    Embed { channel_id: String, embed: Embed },
}

#[derive(Default)]
pub struct MockGateway {
    calls: Mutex<Vec<GatewayCall>>,
    fail_open: AtomicBool,
    fail_nickname: AtomicBool,
    fail_send: AtomicBool,

    /// Milliseconds every session open takes
    open_delay_ms: AtomicU64,

    /// Remaining nickname failures before calls succeed again
    nickname_failures_left: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make every session open take `delay`
    pub fn set_open_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.open_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn set_fail_nickname(&self, fail: bool) {
        self.fail_nickname.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Fail the next `count` nickname updates, then succeed
    pub fn fail_next_nicknames(&self, count: usize) {
        self.nickname_failures_left.store(count, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Nicknames set so far, in order
    pub fn nicknames(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Nickname { nickname, .. } => Some(nickname),
                _ => None,
            })
            .collect()
    }

    /// Embeds delivered so far, in order
    pub fn embeds(&self) -> Vec<(String, Embed)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Embed { channel_id, embed } => Some((channel_id, embed)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn open_session(&self, credential: &BotCredential) -> Result<()> {
        let delay = self.open_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(BotError::TransientSend("session open refused".into()));
        }
        self.record(GatewayCall::Open {
            client_id: credential.client_id.clone(),
        });
        Ok(())
    }

    async fn close_session(&self, credential: &BotCredential) -> Result<()> {
        self.record(GatewayCall::Close {
            client_id: credential.client_id.clone(),
        });
        Ok(())
    }

    async fn set_nickname(&self, credential: &BotCredential, guild_id: &str, nickname: &str) -> Result<()> {
        let scripted_failure = self
            .nickname_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if scripted_failure || self.fail_nickname.load(Ordering::SeqCst) {
            return Err(BotError::TransientSend("nickname update refused".into()));
        }
        self.record(GatewayCall::Nickname {
            client_id: credential.client_id.clone(),
            guild_id: guild_id.to_string(),
            nickname: nickname.to_string(),
        });
        Ok(())
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<()> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(BotError::TransientSend("message send refused".into()));
        }
        self.record(GatewayCall::Embed {
            channel_id: channel_id.to_string(),
            embed: embed.clone(),
        });
        Ok(())
    }
}
