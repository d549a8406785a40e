// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Wildcard pattern matching for opcode patterns and statement forms.
//!
//! `*` captures any span (shortest match wins, with backtracking) and `?`
//! matches exactly one character. Matching is byte-wise and case-sensitive.

/// Match `source` against `pattern` and return the `*` captures in order.
pub fn tokenize(source: &str, pattern: &str) -> Option<Vec<String>> {
    let mut spans = Vec::new();
    if match_inner(source.as_bytes(), pattern.as_bytes(), 0, &mut spans) {
        let bytes = source.as_bytes();
        Some(
            spans
                .iter()
                .map(|&(a, b)| String::from_utf8_lossy(&bytes[a..b]).into_owned())
                .collect(),
        )
    } else {
        None
    }
}

/// Whether `source` matches `pattern`, ignoring captures.
pub fn match_pattern(source: &str, pattern: &str) -> bool {
    let mut spans = Vec::new();
    match_inner(source.as_bytes(), pattern.as_bytes(), 0, &mut spans)
}

fn match_inner(s: &[u8], p: &[u8], offset: usize, spans: &mut Vec<(usize, usize)>) -> bool {
    let Some(&head) = p.first() else {
        return s.is_empty();
    };
    if head == b'*' {
        for length in 0..=s.len() {
            let mark = spans.len();
            if match_inner(&s[length..], &p[1..], offset + length, spans) {
                spans.insert(mark, (offset, offset + length));
                return true;
            }
            spans.truncate(mark);
        }
        return false;
    }
    if s.is_empty() {
        return false;
    }
    if head == b'?' || head == s[0] {
        return match_inner(&s[1..], &p[1..], offset + 1, spans);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_match_exactly() {
        assert_eq!(tokenize("nop", "nop"), Some(vec![]));
        assert_eq!(tokenize("nopx", "nop"), None);
        assert_eq!(tokenize("no", "nop"), None);
    }

    #[test]
    fn wildcards_capture_argument_spans() {
        assert_eq!(tokenize("lda #$42", "lda #*"), Some(vec!["$42".to_string()]));
        assert_eq!(
            tokenize("ld $10,$20", "ld *,*"),
            Some(vec!["$10".to_string(), "$20".to_string()])
        );
    }

    #[test]
    fn wildcard_takes_the_shortest_span() {
        // The first `*` stops at the first `,` the tail can match from.
        assert_eq!(
            tokenize("mov a,b,c", "mov *,*"),
            Some(vec!["a".to_string(), "b,c".to_string()])
        );
    }

    #[test]
    fn trailing_wildcard_may_capture_empty() {
        assert_eq!(tokenize("ret", "ret*"), Some(vec!["".to_string()]));
    }

    #[test]
    fn question_mark_matches_one_character() {
        assert!(match_pattern("include \"x\"", "include \"?*\""));
        assert!(!match_pattern("include \"\"", "include \"?*\""));
    }

    #[test]
    fn statement_forms_for_table_augmentation() {
        assert!(match_pattern("instrument \"nop; $ea\"", "instrument \"*\""));
        assert!(!match_pattern("instrument nop", "instrument \"*\""));
    }
}
