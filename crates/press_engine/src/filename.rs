use serde::{Deserialize, Serialize};

pub const MAX_FILENAME_CHARS: usize = 100;
/// Used when sanitizing leaves nothing, e.g. a title made only of punctuation.
pub const FALLBACK_FILENAME: &str = "article";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeOptions {
    /// Drop every non-ASCII character before anything else.
    pub strip_non_ascii: bool,
}

/// Download-safe, lowercase filename stem for `title`. Never empty.
pub fn safe_filename(title: &str, options: &SanitizeOptions) -> String {
    let sanitized = sanitize_filename(title, options);
    if sanitized.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Strip illegal characters, turn whitespace into single underscores, trim,
/// lowercase and bound to [`MAX_FILENAME_CHARS`]. May return an empty string.
pub fn sanitize_filename(input: &str, options: &SanitizeOptions) -> String {
    let mut compacted = String::with_capacity(input.len());
    let mut prev_underscore = false;
    for c in input.chars() {
        if options.strip_non_ascii && !c.is_ascii() {
            continue;
        }
        if is_forbidden(c) {
            continue;
        }
        if c == '_' || c.is_whitespace() {
            if !prev_underscore {
                compacted.push('_');
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    // Lowercasing can lengthen a string, so it runs before the length cut.
    let lowered = compacted.trim_matches('_').to_lowercase();
    let truncated: String = lowered.chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim_end_matches('_').to_string()
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\'' | '\u{2018}' | '\u{2019}' | '"' | '\u{201C}' | '\u{201D}'
        | '(' | ')' | '<' | '>' | ':' | '/' | '\\' | '|' | '?' | '*'
        | '\0'..='\u{1F}' | '\u{7F}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLES: &[&str] = &[
        "",
        "Hello World",
        "  __Leading and trailing__  ",
        "What's \"new\" in (Rust) <2024>: a/b\\c|d?e*f",
        "tabs\tand\nnewlines\r\nhere",
        "Ünïcödé Tïtlé — with dashes",
        "日本語のタイトル：テスト",
        "İstanbul ΣΊΣΥΦΟΣ",
        "\u{0}\u{1}\u{1f}",
        "a_____b     c",
        "'\"()<>:/\\|?*",
    ];

    fn default_opts() -> SanitizeOptions {
        SanitizeOptions::default()
    }

    #[test]
    fn basic_title_becomes_lowercase_underscored() {
        assert_eq!(sanitize_filename("My Great Article", &default_opts()), "my_great_article");
    }

    #[test]
    fn illegal_characters_are_removed_not_replaced() {
        assert_eq!(
            sanitize_filename("Rust: The (Good) Parts?", &default_opts()),
            "rust_the_good_parts"
        );
        assert_eq!(sanitize_filename("It’s a/b", &default_opts()), "its_ab");
    }

    #[test]
    fn underscores_and_whitespace_collapse_together() {
        assert_eq!(sanitize_filename("a _ _  b__c", &default_opts()), "a_b_c");
    }

    #[test]
    fn non_ascii_is_kept_unless_configured() {
        assert_eq!(sanitize_filename("Café Crème", &default_opts()), "café_crème");
        let strict = SanitizeOptions {
            strip_non_ascii: true,
        };
        assert_eq!(sanitize_filename("Café Crème", &strict), "caf_crme");
        assert_eq!(sanitize_filename("日本語", &strict), "");
    }

    #[test]
    fn length_is_bounded_without_trailing_underscore() {
        let title = format!("{} tail", "x".repeat(99));
        let out = sanitize_filename(&title, &default_opts());
        assert_eq!(out, "x".repeat(99));

        let long = "word ".repeat(60);
        let out = sanitize_filename(&long, &default_opts());
        assert!(out.chars().count() <= MAX_FILENAME_CHARS);
        assert!(!out.ends_with('_'));
    }

    #[test]
    fn empty_result_falls_back_for_filenames() {
        assert_eq!(sanitize_filename("'\"()<>", &default_opts()), "");
        assert_eq!(safe_filename("'\"()<>", &default_opts()), FALLBACK_FILENAME);
        assert_eq!(safe_filename("Hello", &default_opts()), "hello");
    }

    fn check_properties(input: &str, options: &SanitizeOptions) -> Result<(), TestCaseError> {
        let out = sanitize_filename(input, options);
        prop_assert!(out.chars().count() <= MAX_FILENAME_CHARS, "{input:?}");
        prop_assert!(!out.chars().any(is_forbidden), "{input:?} -> {out:?}");
        prop_assert!(!out.chars().any(char::is_whitespace), "{input:?} -> {out:?}");
        prop_assert!(!out.starts_with('_') && !out.ends_with('_'), "{input:?} -> {out:?}");
        prop_assert!(!out.contains("__"), "{input:?} -> {out:?}");
        prop_assert_eq!(&out, &out.to_lowercase(), "{:?}", input);
        if options.strip_non_ascii {
            prop_assert!(out.is_ascii(), "{input:?} -> {out:?}");
        }
        prop_assert_eq!(sanitize_filename(&out, options), out, "not idempotent for {:?}", input);
        Ok(())
    }

    fn both_options() -> [SanitizeOptions; 2] {
        [
            default_opts(),
            SanitizeOptions {
                strip_non_ascii: true,
            },
        ]
    }

    #[test]
    fn output_properties_hold_for_samples() {
        for options in both_options() {
            for sample in SAMPLES {
                check_properties(sample, &options).unwrap();
            }
        }
    }

    proptest! {
        #[test]
        fn output_properties_hold_for_any_title(input in any::<String>(), strip in any::<bool>()) {
            check_properties(&input, &SanitizeOptions { strip_non_ascii: strip })?;
        }

        #[test]
        fn output_properties_hold_around_length_bound(
            input in r#"[a-zA-Z0-9 _,;=.'"()<>:/\\|?*\tÉéİıΣσςßẞ日本語—-]{90,130}"#,
            strip in any::<bool>(),
        ) {
            check_properties(&input, &SanitizeOptions { strip_non_ascii: strip })?;
        }
    }
}
