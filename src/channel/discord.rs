// ── Discord Gateway Transport ─────────────────────────────────────────────────
// Concrete provider transport grounded in the teacher's
// `engine/discord.rs` Gateway bridge: WS connect -> Hello -> Identify ->
// heartbeat -> Dispatch, plus REST send/typing helpers. The core treats the
// wire framing as opaque per spec.md §1 Non-goals; this module is the one
// place that speaks it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::error::{CoreError, CoreResult};
use crate::identity::WelcomeDelivery;

pub const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
pub const API_BASE: &str = "https://discord.com/api/v10";
const CHANNEL_KIND: &str = "discord";

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    d: Option<serde_json::Value>,
    s: Option<u64>,
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadyEvent {
    user: DiscordUser,
    session_id: String,
    resume_gateway_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    bot: Option<bool>,
    global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    channel_id: String,
    author: DiscordUser,
    content: String,
    guild_id: Option<String>,
    mentions: Option<Vec<DiscordUser>>,
}

/// An inbound message handed up to the adapter's routing layer, already
/// stripped of gateway framing.
pub struct InboundMessage {
    pub external_id: String,
    pub username: String,
    pub display_name: String,
    pub channel_id: String,
    pub content: String,
    pub is_dm: bool,
}

#[derive(Serialize)]
struct OutboundPayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    embeds: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    components: Option<Vec<serde_json::Value>>,
}

pub struct DiscordRest {
    client: reqwest::Client,
    token: String,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), token: token.into() }
    }

    pub async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        embed: Option<serde_json::Value>,
        action_row: Option<serde_json::Value>,
    ) -> CoreResult<()> {
        let url = format!("{API_BASE}/channels/{channel_id}/messages");
        let body = OutboundPayload {
            content,
            embeds: embed.map(|e| vec![e]),
            components: action_row.map(|r| vec![r]),
        };
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(CoreError::channel("discord", format!("send_message {status}: {body}")));
        }
        Ok(())
    }

    pub async fn send_typing(&self, channel_id: &str) {
        let url = format!("{API_BASE}/channels/{channel_id}/typing");
        let _ = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await;
    }

    /// Open (or reuse) a DM channel with a user and send the message.
    pub async fn send_dm(&self, external_user_id: &str, content: &str) -> bool {
        let url = format!("{API_BASE}/users/@me/channels");
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&json!({ "recipient_id": external_user_id }))
            .send()
            .await;
        let Ok(resp) = resp else { return false };
        if !resp.status().is_success() {
            return false;
        }
        let Ok(dm_channel) = resp.json::<serde_json::Value>().await else { return false };
        let Some(channel_id) = dm_channel["id"].as_str() else { return false };
        self.send_message(channel_id, content, None, None).await.is_ok()
    }
}

#[async_trait]
impl WelcomeDelivery for DiscordRest {
    async fn send_dm(&self, external_id: &str, text: &str) -> bool {
        DiscordRest::send_dm(self, external_id, text).await
    }

    async fn send_to_channel(&self, channel_id: &str, text: &str) -> bool {
        self.send_message(channel_id, text, None, None).await.is_ok()
    }
}

/// Connect to the Gateway, Identify, run heartbeats, and feed inbound
/// messages to `on_message` until the connection drops or `stop` fires.
pub async fn run_gateway_loop<F, Fut>(
    token: &str,
    bot_user_id: Arc<AsyncMutex<Option<String>>>,
    stop: Arc<std::sync::atomic::AtomicBool>,
    mut on_message: F,
) -> CoreResult<()>
where
    F: FnMut(InboundMessage) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let (ws_stream, _) = connect_async(GATEWAY_URL)
        .await
        .map_err(|e| CoreError::channel("discord", e.to_string()))?;
    let (write, mut read) = ws_stream.split();

    let hello = read
        .next()
        .await
        .ok_or_else(|| CoreError::channel("discord", "gateway closed before Hello"))?
        .map_err(|e| CoreError::channel("discord", e.to_string()))?;
    let hello_text = hello.to_text().map_err(|e| CoreError::channel("discord", e.to_string()))?;
    let hello_payload: GatewayPayload = serde_json::from_str(hello_text)?;
    if hello_payload.op != 10 {
        return Err(CoreError::channel("discord", format!("expected Hello (op 10), got op {}", hello_payload.op)));
    }
    let heartbeat_interval_ms = hello_payload
        .d
        .as_ref()
        .and_then(|d| d["heartbeat_interval"].as_u64())
        .unwrap_or(41250);

    log::info!("[discord] connected to gateway, heartbeat_interval={heartbeat_interval_ms}ms");

    let intents: u64 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);
    let identify = json!({
        "op": 2,
        "d": {
            "token": token,
            "intents": intents,
            "properties": { "os": std::env::consts::OS, "browser": "pawbot", "device": "pawbot" }
        }
    });

    let write = Arc::new(AsyncMutex::new(write));
    write
        .lock()
        .await
        .send(WsMessage::Text(identify.to_string()))
        .await
        .map_err(|e| CoreError::channel("discord", e.to_string()))?;

    let sequence = Arc::new(AtomicU64::new(0));
    let heartbeat_write = write.clone();
    let heartbeat_sequence = sequence.clone();
    let heartbeat_stop = stop.clone();
    let heartbeat_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(heartbeat_interval_ms)).await;
            if heartbeat_stop.load(Ordering::Relaxed) {
                break;
            }
            let seq = heartbeat_sequence.load(Ordering::Relaxed);
            let seq_value = if seq == 0 { serde_json::Value::Null } else { json!(seq) };
            let hb = json!({ "op": 1, "d": seq_value });
            let mut w = heartbeat_write.lock().await;
            if w.send(WsMessage::Text(hb.to_string())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg_result) = read.next().await {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let msg = match msg_result {
            Ok(m) => m,
            Err(e) => {
                log::warn!("[discord] ws read error: {e}");
                break;
            }
        };
        let text = match msg {
            WsMessage::Text(t) => t,
            WsMessage::Close(_) => {
                log::info!("[discord] gateway closed");
                break;
            }
            _ => continue,
        };
        let Ok(payload) = serde_json::from_str::<GatewayPayload>(&text) else { continue };
        if let Some(s) = payload.s {
            sequence.store(s, Ordering::Relaxed);
        }

        match payload.op {
            0 => handle_dispatch(payload, &bot_user_id, &mut on_message).await,
            11 => {}
            7 => {
                log::info!("[discord] gateway requested reconnect");
                break;
            }
            9 => {
                log::warn!("[discord] invalid session");
                break;
            }
            _ => {}
        }
    }

    heartbeat_task.abort();
    Ok(())
}

async fn handle_dispatch<F, Fut>(payload: GatewayPayload, bot_user_id: &Arc<AsyncMutex<Option<String>>>, on_message: &mut F)
where
    F: FnMut(InboundMessage) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    match payload.t.as_deref().unwrap_or("") {
        "READY" => {
            if let Some(d) = payload.d {
                if let Ok(ready) = serde_json::from_value::<ReadyEvent>(d) {
                    log::info!("[discord] ready as {} ({}), session {}", ready.user.username, ready.user.id, ready.session_id);
                    *bot_user_id.lock().await = Some(ready.user.id);
                    let _ = ready.resume_gateway_url;
                }
            }
        }
        "MESSAGE_CREATE" => {
            let Some(d) = payload.d else { return };
            let Ok(discord_msg) = serde_json::from_value::<DiscordMessage>(d) else { return };
            if discord_msg.author.bot.unwrap_or(false) || discord_msg.content.is_empty() {
                return;
            }

            let is_dm = discord_msg.guild_id.is_none();
            let bot_id = bot_user_id.lock().await.clone();
            let is_mention = discord_msg
                .mentions
                .as_ref()
                .map(|m| m.iter().any(|u| bot_id.as_deref() == Some(u.id.as_str())))
                .unwrap_or(false);
            if !is_dm && !is_mention {
                return;
            }

            let content = if is_mention {
                let pattern = format!("<@{}>", bot_id.as_deref().unwrap_or(""));
                discord_msg.content.replace(&pattern, "").trim().to_string()
            } else {
                discord_msg.content.clone()
            };
            if content.is_empty() {
                return;
            }

            let display_name = discord_msg.author.global_name.clone().unwrap_or_else(|| discord_msg.author.username.clone());
            on_message(InboundMessage {
                external_id: discord_msg.author.id,
                username: discord_msg.author.username,
                display_name,
                channel_id: discord_msg.channel_id,
                content,
                is_dm,
            })
            .await;
        }
        _ => {}
    }
}

pub fn channel_kind() -> &'static str {
    CHANNEL_KIND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_payload_omits_absent_embeds_and_components() {
        let payload = OutboundPayload { content: "hi", embeds: None, components: None };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("embeds").is_none());
        assert!(json.get("components").is_none());
    }

    #[test]
    fn channel_kind_is_discord() {
        assert_eq!(channel_kind(), "discord");
    }
}
