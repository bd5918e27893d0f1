//! Free-text sanitization pipeline.
//!
//! Every piece of user-supplied text that ends up in room state (chat
//! messages, usernames, room names, text strokes) goes through the same
//! stages, in order:
//!
//! 1. trim and cap the length
//! 2. Unicode NFKC normalization
//! 3. strip control and bidi-override characters
//! 4. remove deny-listed markup and protocol patterns
//! 5. strip every remaining tag (nothing but content survives)
//! 6. HTML-escape what is left, never past the length cap

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::{ROOM_NAME_MAX_CHARS, USERNAME_MAX_CHARS};

/// Patterns removed outright, including their content where they wrap any.
static DENY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script\b[^>]*>.*?</script\s*>",
        r"(?is)<style\b[^>]*>.*?</style\s*>",
        r"(?is)<iframe\b[^>]*>.*?</iframe\s*>",
        r"(?is)<object\b[^>]*>.*?</object\s*>",
        r"(?is)<embed\b[^>]*>",
        r#"(?i)\bon[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]*)"#,
        r"(?i)\b(javascript|vbscript|livescript)\s*:",
        r"(?i)\bdata\s*:\s*[a-z]+/[a-z0-9.+-]+",
        r"(?i)\bexpression\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid sanitizer deny pattern"))
    .collect()
});

/// Anything shaped like a tag, comment or doctype. A `<` followed by a
/// space or digit is a comparison and is left for escaping.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:!--.*?--|[/!?]?[A-Za-z][^<>]*)>").expect("invalid tag pattern")
});

/// Run the full pipeline. The result may be empty.
pub fn sanitize_text(input: &str, max_chars: usize) -> String {
    let capped: String = input.trim().chars().take(max_chars).collect();
    let normalized: String = capped.nfkc().collect();
    let visible: String = normalized.chars().filter(|c| !is_stripped_char(*c)).collect();

    let mut text = visible;
    for pattern in DENY_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    let content_only = TAG_PATTERN.replace_all(&text, "");

    escape_html(content_only.trim(), max_chars)
}

pub fn sanitize_username(input: &str) -> String {
    sanitize_text(input, USERNAME_MAX_CHARS)
}

pub fn sanitize_room_name(input: &str) -> String {
    sanitize_text(input, ROOM_NAME_MAX_CHARS)
}

fn is_stripped_char(c: char) -> bool {
    c.is_control()
        || matches!(c,
            '\u{200B}'..='\u{200F}'
            | '\u{2028}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FEFF}')
}

/// Escape markup characters. An entity that would cross `max_chars` is
/// dropped whole, so the output never ends in half an entity.
fn escape_html(input: &str, max_chars: usize) -> String {
    let mut escaped = String::with_capacity(input.len());
    let mut count = 0;
    let mut buf = [0u8; 4];
    for c in input.chars() {
        let piece = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&#x27;",
            _ => c.encode_utf8(&mut buf),
        };
        let width = piece.chars().count();
        if count + width > max_chars {
            break;
        }
        escaped.push_str(piece);
        count += width;
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through_trimmed() {
        // テスト項目: 通常のテキストは前後の空白のみ除去される
        // given (前提条件):
        let input = "  hello world  ";

        // when (操作):
        let result = sanitize_text(input, 100);

        // then (期待する結果):
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_script_tag_and_content_are_removed() {
        // テスト項目: script タグは中身ごと除去される
        // given (前提条件):
        let input = "hi<script>alert('x')</script> there";

        // when (操作):
        let result = sanitize_text(input, 100);

        // then (期待する結果):
        assert_eq!(result, "hi there");
    }

    #[test]
    fn test_tags_and_event_handlers_do_not_survive() {
        // テスト項目: タグと属性は残らず、中身のテキストだけが残る
        // given (前提条件):
        let input = r#"<img src=x onerror="alert(1)"><b>bold</b> <a href="javascript:evil()">link</a>"#;

        // when (操作):
        let result = sanitize_text(input, 200);

        // then (期待する結果):
        assert_eq!(result, "bold link");
    }

    #[test]
    fn test_remaining_markup_characters_are_escaped() {
        // テスト項目: タグにならない記号は HTML エスケープされる
        // given (前提条件):
        let input = "1 < 2 & \"quotes\"";

        // when (操作):
        let result = sanitize_text(input, 100);

        // then (期待する結果):
        assert_eq!(result, "1 &lt; 2 &amp; &quot;quotes&quot;");
    }

    #[test]
    fn test_control_and_bidi_characters_are_stripped() {
        // テスト項目: 制御文字と双方向制御文字が除去される
        // given (前提条件):
        let input = "ab\u{0007}c\u{202E}d\u{200B}e";

        // when (操作):
        let result = sanitize_text(input, 100);

        // then (期待する結果):
        assert_eq!(result, "abcde");
    }

    #[test]
    fn test_fullwidth_characters_are_normalized() {
        // テスト項目: 全角英数字が NFKC 正規化で半角になる
        // given (前提条件):
        let input = "ＡＢＣ１２３";

        // when (操作):
        let result = sanitize_text(input, 100);

        // then (期待する結果):
        assert_eq!(result, "ABC123");
    }

    #[test]
    fn test_length_is_capped_in_characters() {
        // テスト項目: 文字数で上限が適用される
        // given (前提条件):
        let input = "あ".repeat(150);

        // when (操作):
        let result = sanitize_room_name(&input);

        // then (期待する結果):
        assert_eq!(result.chars().count(), ROOM_NAME_MAX_CHARS);
    }

    #[test]
    fn test_markup_only_input_sanitizes_to_empty() {
        // テスト項目: マークアップのみの入力は空文字列になる
        // given (前提条件):
        let input = "<script>x</script><br/>";

        // when (操作):
        let result = sanitize_username(input);

        // then (期待する結果):
        assert!(result.is_empty());
    }

    #[test]
    fn test_escaped_output_stays_within_cap() {
        // テスト項目: エスケープで長くなっても上限を超えず、エンティティの途中で切れない
        // given (前提条件):
        let input = "Tom's room ".repeat(15);

        // when (操作):
        let result = sanitize_room_name(&input);

        // then (期待する結果):
        assert!(result.chars().count() <= ROOM_NAME_MAX_CHARS);
        assert!(result.starts_with("Tom&#x27;s room"));
        assert!(!result.replace("&#x27;", "").contains('&'));
    }

    #[test]
    fn test_username_with_ampersand_fits_username_limit() {
        // テスト項目: 上限付近の長さで & を含むユーザー名も上限内に収まる
        // given (前提条件):
        let input = format!("{}&co", "a".repeat(USERNAME_MAX_CHARS - 5));

        // when (操作):
        let result = sanitize_username(&input);

        // then (期待する結果):
        assert!(result.chars().count() <= USERNAME_MAX_CHARS);
        assert_eq!(result, format!("{}&amp;", "a".repeat(USERNAME_MAX_CHARS - 5)));
    }

    #[test]
    fn test_comparison_signs_in_prose_survive() {
        // テスト項目: 比較記号を含む文章はタグとして削除されずエスケープされる
        // given (前提条件):
        let input = "a < b and c > d";

        // when (操作):
        let result = sanitize_text(input, 100);

        // then (期待する結果):
        assert_eq!(result, "a &lt; b and c &gt; d");
    }

    #[test]
    fn test_data_followed_by_colon_in_prose_survives() {
        // テスト項目: 「data:」の後に MIME タイプが続かない文章は削除されない
        // given (前提条件):
        let prose = "my data: 5";
        let uri = "see data:text/html,hello";

        // when (操作):
        let prose_result = sanitize_text(prose, 100);
        let uri_result = sanitize_text(uri, 100);

        // then (期待する結果):
        assert_eq!(prose_result, "my data: 5");
        assert_eq!(uri_result, "see ,hello");
    }
}
