// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use llm_contracts::{LLMError, LLMResult};
use serde_json::Value;
use tracing::{debug, warn};

/// Pulls a JSON document out of a model reply: the whole text, then fenced
/// code blocks, then the outermost balanced `{...}`.
pub fn extract_json_from_text(text: &str) -> LLMResult<Value> {
    let text = text.trim();
    if text.is_empty() {
        return Err(LLMError::Validation("empty response from model".to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        debug!("parsed entire response as JSON");
        return Ok(value);
    }

    for (language, body) in code_fences(text) {
        if language.is_none() || language.as_deref() == Some("json") {
            if let Ok(value) = serde_json::from_str::<Value>(body) {
                debug!("extracted JSON from code fence");
                return Ok(value);
            }
        }
    }

    if let Some(candidate) = find_json_delimiters(text, '{', '}') {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                debug!("extracted JSON object from surrounding text");
                return Ok(value);
            }
            Err(e) => warn!(error = %e, "JSON-like substring failed to parse"),
        }
    }

    Err(LLMError::Serialisation(
        "could not extract JSON from response".to_string(),
    ))
}

/// Fenced blocks as (language tag, body) pairs.
fn code_fences(text: &str) -> Vec<(Option<String>, &str)> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let Some(close) = after_open.find("```") else {
            break;
        };
        let inner = &after_open[..close];
        let (tag, body) = match inner.split_once('\n') {
            Some((first, body)) if !first.trim().contains(char::is_whitespace) => {
                (first.trim(), body)
            }
            _ => ("", inner),
        };
        let language = (!tag.is_empty()).then(|| tag.to_ascii_lowercase());
        blocks.push((language, body.trim()));
        rest = &after_open[close + 3..];
    }
    blocks
}

/// Outermost balanced span starting at the first `start_char`, skipping
/// delimiters inside string literals.
fn find_json_delimiters(text: &str, start_char: char, end_char: char) -> Option<&str> {
    let mut balance = 0usize;
    let mut start_index = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if ch == '"' && start_index.is_some() {
            in_string = true;
        } else if ch == start_char {
            if balance == 0 {
                start_index = Some(i);
            }
            balance += 1;
        } else if ch == end_char && balance > 0 {
            balance -= 1;
            if balance == 0 {
                return start_index.map(|start| &text[start..=i]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_text() {
        let value = extract_json_from_text(r#"{"visualizations": []}"#).unwrap();
        assert_eq!(value, json!({"visualizations": []}));
    }

    #[test]
    fn test_code_fence() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nEnjoy";
        assert_eq!(extract_json_from_text(text).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n{\"a\": [1, 2]}\n```";
        assert_eq!(extract_json_from_text(text).unwrap(), json!({"a": [1, 2]}));
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"Result: {"title": "a } tricky { title", "n": 2} trailing }"#;
        assert_eq!(
            extract_json_from_text(text).unwrap(),
            json!({"title": "a } tricky { title", "n": 2})
        );
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(
            extract_json_from_text("I cannot help with that."),
            Err(LLMError::Serialisation(_))
        ));
        assert!(matches!(
            extract_json_from_text("   "),
            Err(LLMError::Validation(_))
        ));
    }
}
