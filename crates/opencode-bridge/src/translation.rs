//! Request/response translation between OpenAI chat messages and the
//! `opencode run` command line.
//!
//! Main entry points:
//! - [`build_prompt`]: flatten `messages[]` into one transcript-style prompt.
//! - [`wrap_prompt`]: append the output-tag instruction sent to the CLI.
//! - [`extract_reply`]: recover the reply from raw CLI stdout.

use crate::error::BridgeError;
use crate::types::Message;
use regex::Regex;
use std::sync::LazyLock;

pub const OUTPUT_OPEN_TAG: &str = "<opencode_output>";
pub const OUTPUT_CLOSE_TAG: &str = "</opencode_output>";

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ANSI regex"));

/// Convert an OpenAI message list into a single prompt.
///
/// Each message becomes `<Speaker>: <text>`; messages are separated by a
/// blank line and kept in their original order.
pub fn build_prompt(messages: &[Message]) -> Result<String, BridgeError> {
    if messages.is_empty() {
        return Err(BridgeError::invalid_request(
            "messages must contain at least one message",
        ));
    }

    let parts: Vec<String> = messages
        .iter()
        .map(|m| {
            let text = m
                .content
                .as_ref()
                .map(|c| c.to_plaintext())
                .unwrap_or_default();
            format!("{}: {}", m.role.speaker(), text)
        })
        .collect();

    Ok(parts.join("\n\n"))
}

/// Ask the assistant to fence its answer so tool chatter can be discarded.
pub fn wrap_prompt(prompt: &str) -> String {
    format!(
        "{prompt}\n\nIMPORTANT: Wrap your entire response in {OUTPUT_OPEN_TAG}{OUTPUT_CLOSE_TAG} tags. \
         Put ALL your output content inside these tags."
    )
}

pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Text following the first opening tag on `line` that starts a real block.
/// Empty pairs such as an echoed `<opencode_output></opencode_output>` are
/// skipped.
fn after_open_tag(line: &str) -> Option<&str> {
    let mut rest = line;
    loop {
        let idx = rest.find(OUTPUT_OPEN_TAG)?;
        let after = &rest[idx + OUTPUT_OPEN_TAG.len()..];
        match after.find(OUTPUT_CLOSE_TAG) {
            Some(end) if after[..end].trim().is_empty() => {
                rest = &after[end + OUTPUT_CLOSE_TAG.len()..];
            }
            _ => return Some(after),
        }
    }
}

/// Extract the assistant's reply from raw `opencode run` stdout.
///
/// - ANSI colour codes are removed.
/// - When an opening output tag is present, only text between the tags is
///   kept; otherwise the whole output is used.
/// - The `@ provider/model` banner line and leading blank lines are dropped.
/// - Trailing whitespace-only lines are dropped; lines are joined with `\n`.
pub fn extract_reply(raw: &str, model: &str) -> String {
    let cleaned = strip_ansi(raw);
    let provider = model.split('/').next().unwrap_or(model);
    let fenced = cleaned.contains(OUTPUT_OPEN_TAG);

    let mut inside = !fenced;
    let mut lines: Vec<&str> = Vec::new();

    for line in cleaned.lines() {
        let mut line = line.trim_end_matches('\r');

        if !inside {
            let Some(rest) = after_open_tag(line) else {
                continue;
            };
            inside = true;
            line = rest;
            if line.trim().is_empty() {
                continue;
            }
        }

        if fenced {
            if let Some(idx) = line.find(OUTPUT_CLOSE_TAG) {
                let before = &line[..idx];
                if !before.trim().is_empty() {
                    lines.push(before);
                }
                break;
            }
        }

        if line.starts_with('@') && line.contains(provider) {
            continue;
        }
        if lines.is_empty() && line.trim().is_empty() {
            continue;
        }
        lines.push(line);
    }

    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentPart, MessageContent, Role};

    const MODEL: &str = "github-copilot/gpt-4.1";

    #[test]
    fn test_build_prompt_preserves_order_and_speakers() {
        let messages = vec![
            Message::text(Role::System, "You are terse."),
            Message::text(Role::User, "Hello!"),
            Message::text(Role::Assistant, "Hi."),
            Message::text(Role::User, "Bye."),
        ];

        let prompt = build_prompt(&messages).unwrap();
        assert_eq!(
            prompt,
            "System: You are terse.\n\nUser: Hello!\n\nAssistant: Hi.\n\nUser: Bye."
        );
    }

    #[test]
    fn test_build_prompt_rejects_empty_messages() {
        let err = build_prompt(&[]).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidRequest(_)));
    }

    #[test]
    fn test_build_prompt_flattens_parts_with_placeholders() {
        let messages = vec![Message {
            role: Role::User,
            content: Some(MessageContent::Parts(vec![
                ContentPart {
                    kind: "text".to_string(),
                    text: Some("Describe".to_string()),
                },
                ContentPart {
                    kind: "image_url".to_string(),
                    text: None,
                },
                ContentPart {
                    kind: "text".to_string(),
                    text: Some("briefly".to_string()),
                },
            ])),
        }];

        let prompt = build_prompt(&messages).unwrap();
        assert_eq!(prompt, "User: Describe\n[image_url omitted]\nbriefly");
    }

    #[test]
    fn test_build_prompt_with_null_content_is_non_empty() {
        let messages = vec![Message {
            role: Role::Assistant,
            content: None,
        }];
        assert_eq!(build_prompt(&messages).unwrap(), "Assistant: ");
    }

    #[test]
    fn test_wrap_prompt_appends_tag_instruction() {
        let wrapped = wrap_prompt("User: hi");
        assert!(wrapped.starts_with("User: hi\n\n"));
        assert!(wrapped.contains("<opencode_output></opencode_output>"));
    }

    #[test]
    fn test_extract_reply_between_tags() {
        let raw = "\x1b[90m@ github-copilot/gpt-4.1\x1b[0m\n\
                   thinking about it...\n\
                   <opencode_output>\n\
                   \n\
                   Hi there\n\
                   \n\
                   second paragraph\n\
                   </opencode_output>\n\
                   trailing noise\n";

        assert_eq!(extract_reply(raw, MODEL), "Hi there\n\nsecond paragraph");
    }

    #[test]
    fn test_extract_reply_inline_tags() {
        let raw = "<opencode_output>Hi there</opencode_output>\n";
        assert_eq!(extract_reply(raw, MODEL), "Hi there");
    }

    #[test]
    fn test_extract_reply_skips_echoed_instruction() {
        let raw = "IMPORTANT: Wrap your entire response in \
                   <opencode_output></opencode_output> tags.\n\
                   <opencode_output>\n\
                   Hi there\n\
                   </opencode_output>\n";
        assert_eq!(extract_reply(raw, MODEL), "Hi there");
    }

    #[test]
    fn test_extract_reply_empty_pair_then_inline_block() {
        let raw = "<opencode_output></opencode_output> <opencode_output>Hi</opencode_output>\n";
        assert_eq!(extract_reply(raw, MODEL), "Hi");
    }

    #[test]
    fn test_extract_reply_has_no_trailing_newline() {
        let raw = "<opencode_output>\nHi there\n\n</opencode_output>\n";
        assert_eq!(extract_reply(raw, MODEL), "Hi there");
    }

    #[test]
    fn test_extract_reply_without_tags_uses_everything() {
        let raw = "@ github-copilot/gpt-4.1\n\n\x1b[1mBold\x1b[0m answer\nline two\n\n";
        assert_eq!(extract_reply(raw, MODEL), "Bold answer\nline two");
    }

    #[test]
    fn test_extract_reply_keeps_at_lines_for_other_providers() {
        let raw = "<opencode_output>\n@mention someone\n</opencode_output>\n";
        assert_eq!(extract_reply(raw, MODEL), "@mention someone");
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31;1mred\x1b[0m"), "red");
    }
}
