// ── Outbound Rendering ───────────────────────────────────────────────────────
// RichPayload -> Discord embed, suggestions -> action row. See
// SPEC_FULL.md §4.6.4.

use serde_json::{json, Value};

use crate::types::RichPayload;

const BUTTON_LABEL_MAX_LEN: usize = 80;

fn embed_color(kind: Option<&str>) -> u32 {
    match kind {
        Some("success") => 0x2ECC71,
        Some("error") => 0xE74C3C,
        Some("warning") => 0xF1C40F,
        Some("info") => 0x3498DB,
        Some("task") => 0x9B59B6,
        Some("profile") => 0xE67E22,
        Some("schedule") => 0x3498DB,
        Some("analytics") => 0x2ECC71,
        _ => 0x3498DB,
    }
}

/// Build a Discord embed object from a `RichPayload`.
pub fn render_embed(rich: &RichPayload) -> Value {
    let mut embed = json!({
        "color": embed_color(rich.kind.as_deref()),
    });
    let obj = embed.as_object_mut().expect("embed is an object");
    if let Some(title) = &rich.title {
        obj.insert("title".into(), json!(title));
    }
    if let Some(description) = &rich.description {
        obj.insert("description".into(), json!(description));
    }
    if !rich.fields.is_empty() {
        let fields: Vec<Value> = rich
            .fields
            .iter()
            .map(|f| json!({ "name": f.name, "value": f.value, "inline": f.inline }))
            .collect();
        obj.insert("fields".into(), json!(fields));
    }
    if let Some(footer) = &rich.footer {
        obj.insert("footer".into(), json!({ "text": footer }));
    }
    if let Some(ts) = rich.timestamp {
        obj.insert("timestamp".into(), json!(ts.to_rfc3339()));
    }
    embed
}

/// Stable custom id for a suggestion button: `"suggestion_<i>_<hash%10000>"`.
fn suggestion_custom_id(index: usize, text: &str) -> String {
    let mut hash: u64 = 0;
    for b in text.as_bytes() {
        hash = hash.wrapping_mul(31).wrapping_add(*b as u64);
    }
    format!("suggestion_{index}_{}", hash % 10000)
}

fn truncate_label(text: &str) -> String {
    if text.chars().count() <= BUTTON_LABEL_MAX_LEN {
        text.to_string()
    } else {
        text.chars().take(BUTTON_LABEL_MAX_LEN).collect()
    }
}

/// Build an action row of up to 5 buttons, one per suggestion.
pub fn render_action_row(suggestions: &[String]) -> Value {
    let components: Vec<Value> = suggestions
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, text)| {
            json!({
                "type": 2,
                "style": 2,
                "label": truncate_label(text),
                "custom_id": suggestion_custom_id(i, text),
            })
        })
        .collect();
    json!({ "type": 1, "components": components })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RichField;

    #[test]
    fn embed_color_defaults_to_blue_for_unknown_kind() {
        let rich = RichPayload { title: None, description: None, kind: Some("mystery".into()), fields: vec![], footer: None, timestamp: None };
        let embed = render_embed(&rich);
        assert_eq!(embed["color"], json!(0x3498DB));
    }

    #[test]
    fn embed_includes_inline_fields() {
        let rich = RichPayload {
            title: Some("t".into()), description: Some("d".into()), kind: Some("success".into()),
            fields: vec![RichField { name: "n".into(), value: "v".into(), inline: true }],
            footer: Some("f".into()), timestamp: None,
        };
        let embed = render_embed(&rich);
        assert_eq!(embed["fields"][0]["inline"], json!(true));
        assert_eq!(embed["color"], json!(0x2ECC71));
    }

    #[test]
    fn action_row_caps_at_five_buttons() {
        let suggestions: Vec<String> = (0..8).map(|i| format!("option {i}")).collect();
        let row = render_action_row(&suggestions);
        assert_eq!(row["components"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn button_label_truncated_to_eighty_chars() {
        let long = "x".repeat(200);
        let row = render_action_row(&[long]);
        let label = row["components"][0]["label"].as_str().unwrap();
        assert_eq!(label.chars().count(), 80);
    }

    #[test]
    fn custom_id_is_stable_for_same_text_and_index() {
        let id1 = suggestion_custom_id(0, "show tasks");
        let id2 = suggestion_custom_id(0, "show tasks");
        assert_eq!(id1, id2);
        assert!(id1.starts_with("suggestion_0_"));
    }
}
