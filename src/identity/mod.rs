// ── Welcome/Identity Bridge (C7) ─────────────────────────────────────────────
// Maps provider user id <-> internal user id; sends a one-time welcome for
// new users; falls back from DM to the originating channel on delivery
// failure. See SPEC_FULL.md §4.7.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// How the resolved message arrived, used to select a welcome template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalContext {
    DirectMessage,
    ServerMessage,
    ExplicitAuthorization,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelIdentity {
    pub channel_kind: String,
    pub external_id: String,
}

/// Outcome of resolving an inbound message's sender.
pub enum Resolution {
    Known(String),
    /// Unresolved — the bridge has already sent (or attempted) a welcome and
    /// the caller should return early without invoking C4.
    WelcomedNewUser,
}

/// Delivers a welcome message, trying a DM first and falling back to the
/// originating channel on failure. Implemented by the channel adapter (C6).
#[async_trait]
pub trait WelcomeDelivery: Send + Sync {
    async fn send_dm(&self, external_id: &str, text: &str) -> bool;
    async fn send_to_channel(&self, channel_id: &str, text: &str) -> bool;
}

pub struct IdentityMap {
    forward: Mutex<HashMap<ChannelIdentity, String>>,
    welcomed: Mutex<std::collections::HashSet<String>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self {
            forward: Mutex::new(HashMap::new()),
            welcomed: Mutex::new(std::collections::HashSet::new()),
        }
    }

    pub fn link(&self, identity: ChannelIdentity, internal_user_id: impl Into<String>) {
        self.forward.lock().insert(identity, internal_user_id.into());
    }

    pub fn resolve(&self, identity: &ChannelIdentity) -> Option<String> {
        self.forward.lock().get(identity).cloned()
    }

    /// If the resolved internal id differs from the last known mapping for
    /// this channel identity, update it (e.g. the provider id changed).
    pub fn reconcile(&self, identity: ChannelIdentity, internal_user_id: impl Into<String>) {
        let internal_user_id = internal_user_id.into();
        let mut map = self.forward.lock();
        match map.get(&identity) {
            Some(existing) if existing == &internal_user_id => {}
            _ => {
                map.insert(identity, internal_user_id);
            }
        }
    }

    pub fn is_welcomed(&self, internal_user_id: &str) -> bool {
        self.welcomed.lock().contains(internal_user_id)
    }

    fn mark_welcomed(&self, internal_user_id: &str) {
        self.welcomed.lock().insert(internal_user_id.to_string());
    }
}

impl Default for IdentityMap {
    fn default() -> Self {
        Self::new()
    }
}

fn welcome_text(context: ArrivalContext) -> &'static str {
    match context {
        ArrivalContext::DirectMessage => {
            "Welcome! I'm your personal assistant. Reply here any time, or try \"help\" to see what I can do."
        }
        ArrivalContext::ServerMessage => {
            "Hi! I've sent you a DM to get started — check your messages, or say \"help\" here."
        }
        ArrivalContext::ExplicitAuthorization => {
            "Thanks for authorizing me! I'm your personal assistant — try \"help\" any time to see what I can do."
        }
    }
}

/// Resolve `(channel_kind, external_id)` to an internal user id. If
/// unresolved, sends (at most once) a welcome message and returns
/// `WelcomedNewUser` — the caller must return early without invoking C4.
pub async fn resolve_or_welcome(
    identity_map: &IdentityMap,
    delivery: &dyn WelcomeDelivery,
    identity: ChannelIdentity,
    fallback_channel_id: &str,
    context: ArrivalContext,
    provisional_internal_id: impl Into<String>,
) -> Resolution {
    if let Some(internal_id) = identity_map.resolve(&identity) {
        return Resolution::Known(internal_id);
    }

    let internal_id = provisional_internal_id.into();
    if !identity_map.is_welcomed(&internal_id) {
        let text = welcome_text(context);
        let delivered = delivery.send_dm(&identity.external_id, text).await;
        if !delivered {
            delivery.send_to_channel(fallback_channel_id, text).await;
        }
        identity_map.mark_welcomed(&internal_id);
    }

    Resolution::WelcomedNewUser
}
