//! Splitters: explode presented text into an ordered set of chunks.
//!
//! Each chunk inherits the parent's commands and records
//! `{chunk_index, chunk_total, split_by}`; token-based chunks also
//! record `estimated_tokens`. An artifact with no text passes through
//! as a single-element set.

use crate::collab::estimate_tokens;
use llmctx_core::{Artifact, ArtifactSet, LlmctxError, Result};
use llmctx_engine::Runtime;
use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").unwrap_or_else(|e| unreachable!("static regex: {e}")));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+\s+").unwrap_or_else(|e| unreachable!("static regex: {e}")));

fn chunk_set(att: &Artifact, chunks: Vec<String>, split_by: &str) -> ArtifactSet {
    if chunks.is_empty() {
        let mut only = att.clone();
        only.set_meta("chunk_index", 0);
        only.set_meta("chunk_total", 1);
        only.set_meta("split_by", split_by);
        return ArtifactSet::new(vec![only]);
    }

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let mut chunk = Artifact::with_commands(att.path(), att.commands.clone());
            chunk.text = text;
            chunk.set_meta("chunk_index", index);
            chunk.set_meta("chunk_total", total);
            chunk.set_meta("split_by", split_by);
            chunk
        })
        .collect()
}

/// Blank-line separated paragraphs.
pub fn paragraphs(_rt: &Runtime, att: Artifact) -> Result<ArtifactSet> {
    let chunks: Vec<String> = PARAGRAPH_BREAK
        .split(&att.text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Ok(chunk_set(&att, chunks, "paragraphs"))
}

/// Terminal-punctuation sentence chunks.
pub fn sentences(_rt: &Runtime, att: Artifact) -> Result<ArtifactSet> {
    let mut chunks = Vec::new();
    let mut last = 0;
    for mat in SENTENCE_END.find_iter(&att.text) {
        let sentence = att.text[last..mat.end()].trim();
        if !sentence.is_empty() {
            chunks.push(sentence.to_string());
        }
        last = mat.end();
    }
    let tail = att.text[last..].trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }
    Ok(chunk_set(&att, chunks, "sentences"))
}

fn split_budget(att: &Artifact, default: usize) -> Result<usize> {
    match att.commands.get("split") {
        None => Ok(default),
        Some(spec) => {
            let budget: usize = spec
                .parse()
                .map_err(|_| LlmctxError::invalid_value("split", spec, "not an integer"))?;
            Ok(budget.max(1))
        }
    }
}

/// Fixed character-budget chunks (`split:N`, default 1000).
pub fn characters(_rt: &Runtime, att: Artifact) -> Result<ArtifactSet> {
    let budget = split_budget(&att, 1000)?;
    let chars: Vec<char> = att.text.chars().collect();
    let chunks: Vec<String> = chars
        .chunks(budget)
        .map(|chunk| chunk.iter().collect())
        .collect();
    Ok(chunk_set(&att, chunks, "characters"))
}

/// Approximate token-budget chunks (`split:N`, default 500), recording
/// `estimated_tokens` per chunk.
pub fn tokens(rt: &Runtime, att: Artifact) -> Result<ArtifactSet> {
    let budget = split_budget(&att, 500)?;
    let estimate = |text: &str| match rt.token_estimator() {
        Some(estimator) => estimator.estimate(text),
        None => estimate_tokens(text),
    };

    let mut chunks = Vec::new();
    let mut current = String::new();
    for word in att.text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && estimate(&candidate) > budget {
            chunks.push(current);
            current = word.to_string();
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    let set = chunk_set(&att, chunks, "tokens");
    let mut out = ArtifactSet::default();
    for mut chunk in set {
        let estimated = estimate(&chunk.text);
        chunk.set_meta("estimated_tokens", estimated);
        out.push(chunk);
    }
    Ok(out)
}

/// Custom-separator chunks (`split:<separator>`).
pub fn custom(_rt: &Runtime, att: Artifact) -> Result<ArtifactSet> {
    let Some(separator) = att.commands.get("split").map(str::to_string) else {
        return Ok(ArtifactSet::new(vec![att]));
    };
    if separator.is_empty() {
        return Err(LlmctxError::invalid_value("split", "", "empty separator"));
    }
    let chunks: Vec<String> = att
        .text
        .split(separator.as_str())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    Ok(chunk_set(&att, chunks, "custom"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmctx_engine::RuntimeBuilder;

    fn runtime() -> Runtime {
        RuntimeBuilder::new().build()
    }

    fn text_artifact(locator: &str, text: &str) -> Artifact {
        let mut att = Artifact::new(locator);
        att.append_text(text);
        att
    }

    #[test]
    fn test_paragraph_chunks_inherit_commands() {
        let att = text_artifact("doc.txt[format:plain]", "first para\n\nsecond para\n\n\nthird");
        let set = paragraphs(&runtime(), att).unwrap();
        assert_eq!(set.len(), 3);
        for (index, chunk) in set.iter().enumerate() {
            assert_eq!(chunk.commands.get("format"), Some("plain"));
            assert_eq!(
                chunk.metadata["chunk_index"].as_u64(),
                Some(index as u64)
            );
            assert_eq!(chunk.metadata["chunk_total"].as_u64(), Some(3));
            assert_eq!(chunk.metadata["split_by"].as_str(), Some("paragraphs"));
        }
    }

    #[test]
    fn test_sentence_chunks() {
        let att = text_artifact("doc.txt", "One. Two! Three? Four");
        let set = sentences(&runtime(), att).unwrap();
        let texts: Vec<&str> = set.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn test_character_budget() {
        let att = text_artifact("doc.txt[split:4]", "abcdefghij");
        let set = characters(&runtime(), att).unwrap();
        let texts: Vec<&str> = set.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_token_chunks_record_estimates() {
        let words = (0..60).map(|n| format!("w{n}")).collect::<Vec<_>>().join(" ");
        let att = text_artifact("doc.txt[split:20]", &words);
        let set = tokens(&runtime(), att).unwrap();
        assert!(set.len() > 1);
        for chunk in set.iter() {
            let estimated = chunk.metadata["estimated_tokens"].as_u64().unwrap();
            assert!(estimated <= 20, "chunk exceeded budget: {estimated}");
        }
    }

    #[test]
    fn test_empty_text_passes_through_as_single_chunk() {
        let att = Artifact::new("doc.txt");
        let set = paragraphs(&runtime(), att).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(0).unwrap().metadata["chunk_total"].as_u64(), Some(1));
    }

    #[test]
    fn test_custom_separator() {
        let att = text_artifact("doc.txt[split:---]", "alpha---beta---gamma");
        let set = custom(&runtime(), att).unwrap();
        let texts: Vec<&str> = set.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
    }
}
