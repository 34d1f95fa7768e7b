//! Adapters: fold an artifact into provider-shaped message sequences.
//!
//! Adapters never catch — malformed content at adapter time is a
//! caller-side bug. Sets are folded by the engine before the adapter
//! runs.

use crate::encode::{strip_data_url, PNG_DATA_URL_PREFIX};
use llmctx_core::{Artifact, Result};
use llmctx_engine::{AdapterParams, Runtime};
use serde_json::{json, Value};

/// Effective prompt: the call parameter wins over `commands.prompt`.
fn effective_prompt<'a>(att: &'a Artifact, params: &'a AdapterParams) -> Option<&'a str> {
    params
        .prompt()
        .filter(|p| !p.is_empty())
        .or_else(|| att.commands.get("prompt").filter(|p| !p.is_empty()))
}

/// Claude message shape: one user message with text and base64 image
/// parts (`media_type: image/png`); data-URL prefixes are stripped and
/// placeholder entries skipped.
pub fn claude(_rt: &Runtime, att: &Artifact, params: &AdapterParams) -> Result<Value> {
    let mut content = Vec::new();

    let prompt = effective_prompt(att, params);
    match (prompt, att.text.is_empty()) {
        (Some(prompt), false) => content.push(json!({
            "type": "text",
            "text": format!("{prompt}\n\n{}", att.text),
        })),
        (Some(prompt), true) => content.push(json!({ "type": "text", "text": prompt })),
        (None, false) => content.push(json!({ "type": "text", "text": att.text })),
        (None, true) => {}
    }

    for image in att.real_images() {
        content.push(json!({
            "type": "image",
            "source": {
                "type": "base64",
                "media_type": "image/png",
                "data": strip_data_url(image),
            },
        }));
    }

    Ok(json!([{ "role": "user", "content": content }]))
}

fn openai_shaped(att: &Artifact, params: &AdapterParams) -> Value {
    let mut content = Vec::new();
    if let Some(prompt) = effective_prompt(att, params) {
        content.push(json!({ "type": "text", "text": prompt }));
    }
    if !att.text.is_empty() {
        content.push(json!({ "type": "text", "text": att.text }));
    }
    for image in att.real_images() {
        let url = if image.starts_with("data:") {
            image.to_string()
        } else {
            format!("{PNG_DATA_URL_PREFIX}{image}")
        };
        content.push(json!({
            "type": "image_url",
            "image_url": { "url": url },
        }));
    }
    json!([{ "role": "user", "content": content }])
}

/// OpenAI chat-completion shape: `{type:text}` / `{type:image_url}`
/// parts; raw base64 is wrapped into a data-URL.
pub fn openai_chat(_rt: &Runtime, att: &Artifact, params: &AdapterParams) -> Result<Value> {
    Ok(openai_shaped(att, params))
}

/// OpenAI responses shape (same part layout as chat).
pub fn openai_response(_rt: &Runtime, att: &Artifact, params: &AdapterParams) -> Result<Value> {
    Ok(openai_shaped(att, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmctx_engine::RuntimeBuilder;

    fn runtime() -> Runtime {
        RuntimeBuilder::new().build()
    }

    #[test]
    fn test_claude_shape_with_prompt_and_image() {
        // Scenario: prompt + text join with a blank line, image emitted
        // as a base64 part.
        let mut att = Artifact::new("x.png");
        att.append_text("hello");
        att.append_image("aGVsbG8=");

        let messages = claude(&runtime(), &att, &AdapterParams::with_prompt("describe")).unwrap();
        let content = &messages[0]["content"];
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "describe\n\nhello");
        assert_eq!(content[1]["type"], "image");
        assert_eq!(content[1]["source"]["type"], "base64");
        assert_eq!(content[1]["source"]["media_type"], "image/png");
        assert_eq!(content[1]["source"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_claude_strips_data_urls_and_skips_placeholders() {
        let mut att = Artifact::new("x.png");
        att.append_image("data:image/png;base64,QUJD");
        att.append_image("page_1_placeholder");

        let messages = claude(&runtime(), &att, &AdapterParams::default()).unwrap();
        let content = messages[0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["source"]["data"], "QUJD");
    }

    #[test]
    fn test_dsl_prompt_is_fallback_only() {
        let mut att = Artifact::new("x.txt[prompt:from dsl]");
        att.append_text("body");

        let messages = claude(&runtime(), &att, &AdapterParams::default()).unwrap();
        assert_eq!(messages[0]["content"][0]["text"], "from dsl\n\nbody");

        let messages =
            claude(&runtime(), &att, &AdapterParams::with_prompt("param wins")).unwrap();
        assert_eq!(messages[0]["content"][0]["text"], "param wins\n\nbody");
    }

    #[test]
    fn test_openai_wraps_raw_base64_and_forwards_data_urls() {
        let mut att = Artifact::new("x.png");
        att.append_text("body");
        att.append_image("QUJD");
        att.append_image("data:image/png;base64,REVG");

        let messages = openai_chat(&runtime(), &att, &AdapterParams::default()).unwrap();
        let content = messages[0]["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "text");
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/png;base64,QUJD"
        );
        assert_eq!(
            content[2]["image_url"]["url"],
            "data:image/png;base64,REVG"
        );
    }
}
