// Copyright (c) 2026 The Runloop Authors
//
// SPDX-License-Identifier: Apache-2.0
use crate::data::ArtifactDoc;

/// Cuts `content` to exactly `min(limit, content.len())` bytes of the raw
/// byte sequence — not decoded code points — then ensures a trailing
/// newline. `limit == 0` means no truncation.
///
/// A cut landing inside a multi-byte character is not rounded back to the
/// nearest boundary: the full byte slice is kept and lossily redecoded
/// (`U+FFFD` stands in for the severed bytes), so the byte budget stays
/// exact regardless of content encoding.
pub fn truncate_bytes(content: &str, limit: usize) -> String {
    let bytes = content.as_bytes();
    let end = if limit == 0 || bytes.len() <= limit {
        bytes.len()
    } else {
        limit
    };
    let body = String::from_utf8_lossy(&bytes[..end]);
    if body.ends_with('\n') {
        body.into_owned()
    } else {
        let mut s = String::with_capacity(body.len() + 1);
        s.push_str(&body);
        s.push('\n');
        s
    }
}

/// Builds the system prompt from an ordered set of documents. Pure
/// and deterministic: the same inputs always produce the same bytes.
pub fn assemble(docs: &[ArtifactDoc], per_file_byte_limit: usize) -> String {
    let mut out = String::new();
    for (i, doc) in docs.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str("## ");
        out.push_str(&doc.name);
        out.push('\n');
        out.push_str(&truncate_bytes(&doc.content, per_file_byte_limit));
    }
    out
}

/// Override point for document-to-prompt assembly. The default
/// implementation is [`assemble`]; callers rarely need to replace it.
pub trait PromptAssembler: Send + Sync {
    fn assemble(&self, docs: &[ArtifactDoc], per_file_byte_limit: usize) -> String;
}

#[derive(Default)]
pub struct DefaultPromptAssembler;

impl PromptAssembler for DefaultPromptAssembler {
    fn assemble(&self, docs: &[ArtifactDoc], per_file_byte_limit: usize) -> String {
        assemble(docs, per_file_byte_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembly_matches_fixed_layout() {
        let docs = vec![
            ArtifactDoc::new("SOUL.md", "alpha"),
            ArtifactDoc::new("RULES.md", "beta"),
            ArtifactDoc::new("DEVPLAN.md", "gamma"),
        ];
        let expected = "## SOUL.md\nalpha\n\n## RULES.md\nbeta\n\n## DEVPLAN.md\ngamma\n";
        assert_eq!(assemble(&docs, 0), expected);
        assert_eq!(assemble(&docs, 0), assemble(&docs, 0));
    }

    #[test]
    fn truncation_caps_at_byte_limit() {
        let content = "0123456789";
        assert_eq!(truncate_bytes(content, 4), "0123\n");
        assert_eq!(truncate_bytes(content, 0), "0123456789\n");
        assert_eq!(truncate_bytes(content, 100), "0123456789\n");
    }

    #[test]
    fn truncation_cutting_inside_a_multibyte_char_keeps_the_byte_budget() {
        // "café" — 'é' is two bytes; limit lands inside it, on byte 4 of 5.
        let content = "caf\u{e9}";
        let truncated = truncate_bytes(content, 4);
        // The severed byte decodes lossily; the 4 original bytes are kept.
        assert_eq!(truncated, "caf\u{fffd}\n");
    }

    #[test]
    fn content_already_ending_in_newline_is_not_doubled() {
        assert_eq!(truncate_bytes("hi\n", 0), "hi\n");
    }
}
