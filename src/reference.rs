//! Scripture reference resolution
//!
//! Turns free-text assistant answers into scripture references and builds
//! canonical display strings and passage deep links from them. Every function
//! here is pure and total: malformed input yields no match or passes through
//! unchanged.
//!
//! [`parse_citations`] is a best-effort fallback used only when the backend
//! does not send structured citations. It can pick up incidental `Word N:M`
//! text and it misses multi-word book names; callers should not treat it as
//! authoritative.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::models::{Citation, Locale, Span};

/// Deep link prefix for the passage viewer
pub const PASSAGE_DEEPLINK_PREFIX: &str = "app://passage/";

/// Default display length for citation chips
pub const DEFAULT_CITATION_LENGTH: usize = 25;

/// Most highlight ranges rendered in a passage
pub const MAX_HIGHLIGHTS: usize = 3;

const ELLIPSIS: char = '…';

// "John 3:16", "1 Corinthians 10:13", "Psalm 23:1-4"
static EN_CITATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"([1-3]?\s?[A-Za-z]+)\s+(\d{1,3}):(\d{1,3}(?:-\d{1,3})?)").ok()
});

// "Иоанна 3:16", "1 Коринфянам 10:13", "Псалом 23:1-4"
static RU_CITATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"([1-3]?\s?[А-ЯЁ][а-яё]+)\s+(\d{1,3}):(\d{1,3}(?:-\d{1,3})?)").ok()
});

const EN_ALIASES: &[(&str, &str)] = &[
    ("Jn", "John"),
    ("Mt", "Matthew"),
    ("Mk", "Mark"),
    ("Lk", "Luke"),
    ("Ps", "Psalms"),
    ("Phil", "Philippians"),
    ("Rom", "Romans"),
    ("Prov", "Proverbs"),
    ("Isa", "Isaiah"),
    ("Jer", "Jeremiah"),
    ("Jas", "James"),
    ("Tim", "Timothy"),
    ("Cor", "Corinthians"),
];

const RU_ALIASES: &[(&str, &str)] = &[
    ("Ин", "Иоанна"),
    ("Мф", "Матфея"),
    ("Мк", "Марка"),
    ("Лк", "Луки"),
    ("Пс", "Псалом"),
    ("Флп", "Филиппийцам"),
    ("Рим", "Римлянам"),
    ("Прит", "Притчи"),
    ("Ис", "Исайя"),
    ("Иер", "Иеремия"),
    ("Иак", "Иакова"),
];

fn citation_pattern(locale: Locale) -> &'static LazyLock<Option<Regex>> {
    match locale {
        Locale::En => &EN_CITATION,
        Locale::Ru => &RU_CITATION,
    }
}

const fn aliases(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => EN_ALIASES,
        Locale::Ru => RU_ALIASES,
    }
}

/// Extract up to five distinct references from `text`, in first-seen order
pub fn parse_citations(text: &str, locale: Locale) -> Vec<String> {
    let Some(re) = citation_pattern(locale).as_ref() else {
        return Vec::new();
    };

    let mut refs: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        // The optional leading `\s?` can swallow the separator before the book
        let found = m.as_str().trim();
        if !refs.iter().any(|r| r == found) {
            refs.push(found.to_string());
            if refs.len() == Citation::MAX_PER_ANSWER {
                break;
            }
        }
    }
    refs
}

/// Expand a book abbreviation (`Jn 3:16` -> `John 3:16`).
///
/// Only the first space-separated word is looked up; unknown books and
/// references without a space come back unchanged.
pub fn normalize_ref(reference: &str, locale: Locale) -> String {
    let Some((book, rest)) = reference.split_once(' ') else {
        return reference.to_string();
    };

    let book = aliases(locale)
        .iter()
        .find(|(alias, _)| *alias == book)
        .map_or(book, |&(_, full)| full);

    format!("{book} {rest}")
}

/// Build the passage viewer deep link for a reference
pub fn build_passage_deeplink(reference: &str, locale: Locale) -> String {
    let normalized = normalize_ref(reference, locale);
    format!("{PASSAGE_DEEPLINK_PREFIX}{}", urlencoding::encode(&normalized))
}

/// Extract the reference from a passage deep link.
///
/// Any query string (`?from=daily_verse`) is ignored.
pub fn parse_passage_deeplink(link: &str) -> Option<String> {
    let rest = link.strip_prefix(PASSAGE_DEEPLINK_PREFIX)?;
    let encoded = rest.split('?').next().unwrap_or_default();
    let decoded = urlencoding::decode(encoded).ok()?;
    let decoded = decoded.trim();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.to_string())
    }
}

/// Shorten a reference for display.
///
/// Returns `reference` untouched when it has at most `max_len` characters,
/// otherwise its first `max_len - 1` characters followed by `…`.
/// Callers must pass `max_len >= 1`; with zero the result is a lone `…`.
pub fn truncate_citation(reference: &str, max_len: usize) -> Cow<'_, str> {
    if reference.chars().count() <= max_len {
        return Cow::Borrowed(reference);
    }
    let mut out: String = reference.chars().take(max_len.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Locate `query` in `text` ignoring case.
///
/// A whole-word occurrence wins over an earlier occurrence embedded in a
/// longer word. Offsets are in characters.
///
/// Surrounding whitespace in `query` is ignored, so a blank query finds
/// nothing. Case is compared one character at a time: letters whose
/// lowercase form is several characters (`İ` lowercases to `i̇`) only match
/// themselves, and a query spelled with the expanded form will not find them.
pub fn find_first_match(text: &str, query: &str) -> Option<Span> {
    let query: Vec<char> = query.trim().chars().collect();
    if query.is_empty() {
        return None;
    }
    let text: Vec<char> = text.chars().collect();
    if query.len() > text.len() {
        return None;
    }

    let mut first_raw = None;
    for start in 0..=text.len() - query.len() {
        let end = start + query.len();
        let hit = text[start..end]
            .iter()
            .zip(&query)
            .all(|(a, b)| chars_eq_ignore_case(*a, *b));
        if !hit {
            continue;
        }

        let left_ok = start == 0 || !is_word_char(text[start - 1]);
        let right_ok = end == text.len() || !is_word_char(text[end]);
        if left_ok && right_ok {
            return Some(Span::new(start, end));
        }
        first_raw.get_or_insert(Span::new(start, end));
    }
    first_raw
}

/// A piece of passage text, highlighted or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment text
    pub text: String,
    /// Whether it falls inside a highlight span
    pub highlighted: bool,
}

/// Split `text` into plain and highlighted segments.
///
/// At most [`MAX_HIGHLIGHTS`] spans are used. Spans that fall outside the
/// text or overlap an earlier span are skipped.
pub fn highlight_segments(text: &str, spans: &[Span]) -> Vec<Segment> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans: Vec<Span> = spans.iter().take(MAX_HIGHLIGHTS).copied().collect();
    spans.sort_by_key(|s| s.start);

    let slice = |from: usize, to: usize| chars[from..to].iter().collect::<String>();
    let mut segments = Vec::new();
    let mut last = 0;

    for span in spans {
        if !span.fits(chars.len()) || span.start < last {
            tracing::debug!("Skipping highlight {}..{}", span.start, span.end);
            continue;
        }
        if span.start > last {
            segments.push(Segment {
                text: slice(last, span.start),
                highlighted: false,
            });
        }
        segments.push(Segment {
            text: slice(span.start, span.end),
            highlighted: true,
        });
        last = span.end;
    }

    if last < chars.len() {
        segments.push(Segment {
            text: slice(last, chars.len()),
            highlighted: false,
        });
    }
    segments
}

/// Final citation list for an answer.
///
/// Uses the backend's citations, or the regex fallback when it sent none.
/// Empty references and out-of-range spans are dropped, then the list is
/// deduplicated by reference and capped.
pub fn resolve_citations(backend: Vec<Citation>, answer: &str, locale: Locale) -> Vec<Citation> {
    let candidates = if backend.is_empty() {
        parse_citations(answer, locale)
            .into_iter()
            .map(Citation::from_ref)
            .collect()
    } else {
        backend
    };

    let answer_len = answer.chars().count();
    Citation::dedupe(candidates.into_iter().map(|mut c| {
        c.spans.retain(|s| s.fits(answer_len));
        c
    }))
}

/// Chat prompt asking about a reference
pub fn ask_prompt(reference: &str, locale: Locale) -> String {
    match locale {
        Locale::En => format!("What does {reference} mean?"),
        Locale::Ru => format!("Что означает {reference}?"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        let refs = parse_citations("As written in John 3:16, God loved the world.", Locale::En);
        assert_eq!(refs, vec!["John 3:16"]);
    }

    #[test]
    fn test_parse_dedupes_repeats() {
        let text = "John 3:16. Again John 3:16! And once more: John 3:16";
        assert_eq!(parse_citations(text, Locale::En), vec!["John 3:16"]);
    }

    #[test]
    fn test_parse_caps_at_five_in_order() {
        let text = "Genesis 1:1, Exodus 3:14, Psalms 23:1-4, Proverbs 3:5, \
                    Isaiah 40:31, Matthew 11:28, Romans 8:28";
        let refs = parse_citations(text, Locale::En);
        assert_eq!(
            refs,
            vec![
                "Genesis 1:1",
                "Exodus 3:14",
                "Psalms 23:1-4",
                "Proverbs 3:5",
                "Isaiah 40:31"
            ]
        );
    }

    #[test]
    fn test_parse_numbered_book_and_russian() {
        let refs = parse_citations("See 1 Corinthians 13:4-7.", Locale::En);
        assert_eq!(refs, vec!["1 Corinthians 13:4-7"]);

        let refs = parse_citations("Читайте Иоанна 3:16 и Псалом 22:1.", Locale::Ru);
        assert_eq!(refs, vec!["Иоанна 3:16", "Псалом 22:1"]);
    }

    #[test]
    fn test_parse_no_match() {
        assert!(parse_citations("No references here.", Locale::En).is_empty());
        assert!(parse_citations("", Locale::Ru).is_empty());
        // Latin book names are not picked up by the Russian pattern
        assert!(parse_citations("John 3:16", Locale::Ru).is_empty());
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref("Jn 3:16", Locale::En), "John 3:16");
        assert_eq!(normalize_ref("Unknown 1:1", Locale::En), "Unknown 1:1");
        assert_eq!(normalize_ref("Ин 3:16", Locale::Ru), "Иоанна 3:16");
        assert_eq!(normalize_ref("Ps", Locale::En), "Ps");
        // Aliases are per locale
        assert_eq!(normalize_ref("Jn 3:16", Locale::Ru), "Jn 3:16");
    }

    #[test]
    fn test_deeplink_round_trip() {
        let link = build_passage_deeplink("Jn 3:16", Locale::En);
        assert_eq!(link, "app://passage/John%203%3A16");
        assert_eq!(parse_passage_deeplink(&link).as_deref(), Some("John 3:16"));

        let link = build_passage_deeplink("Ин 3:16", Locale::Ru);
        assert_eq!(parse_passage_deeplink(&link).as_deref(), Some("Иоанна 3:16"));
    }

    #[test]
    fn test_parse_deeplink_rejects_other_links() {
        assert_eq!(parse_passage_deeplink("https://example.com/John"), None);
        assert_eq!(parse_passage_deeplink("app://passage/"), None);
        assert_eq!(
            parse_passage_deeplink("app://passage/Psalms%2023%3A1?from=daily_verse").as_deref(),
            Some("Psalms 23:1")
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_citation("1 Corinthians 13:4-7", 10), "1 Corinth…");
        assert_eq!(truncate_citation("1 Corinthians 13:4-7", 10).chars().count(), 10);
        assert_eq!(truncate_citation("Jn 3:16", DEFAULT_CITATION_LENGTH), "Jn 3:16");
        assert_eq!(truncate_citation("", 5), "");
        assert_eq!(truncate_citation("Иоанна 3:16", 5), "Иоан…");
    }

    #[test]
    fn test_find_first_match() {
        assert_eq!(find_first_match("Jesus wept.", "JESUS"), Some(Span::new(0, 5)));
        // Whole word beats an earlier embedded occurrence
        assert_eq!(find_first_match("loved love", "love"), Some(Span::new(6, 10)));
        // Falls back to the substring
        assert_eq!(find_first_match("beloved", "love"), Some(Span::new(2, 6)));
        assert_eq!(find_first_match("Бог есть любовь", "ЛЮБОВЬ"), Some(Span::new(9, 15)));
        assert_eq!(find_first_match("text", ""), None);
        assert_eq!(find_first_match("text", "   "), None);
        assert_eq!(find_first_match("grace and peace", " peace "), Some(Span::new(10, 15)));
        assert_eq!(find_first_match("short", "much longer query"), None);
    }

    #[test]
    fn test_highlight_segments() {
        let segments = highlight_segments("For God so loved", &[Span::new(4, 7), Span::new(11, 16)]);
        let texts: Vec<_> = segments.iter().map(|s| (s.text.as_str(), s.highlighted)).collect();
        assert_eq!(
            texts,
            vec![("For ", false), ("God", true), (" so ", false), ("loved", true)]
        );
    }

    #[test]
    fn test_highlight_skips_bad_spans_and_caps() {
        let spans = [
            Span::new(0, 1),
            Span::new(0, 2),
            Span::new(5, 99),
            Span::new(3, 4),
        ];
        let segments = highlight_segments("abcdef", &spans);
        let highlighted: Vec<_> = segments
            .iter()
            .filter(|s| s.highlighted)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(highlighted, vec!["a"]);
        assert_eq!(segments.iter().map(|s| s.text.as_str()).collect::<String>(), "abcdef");
    }

    #[test]
    fn test_resolve_citations_fallback_and_backend() {
        let answer = "Consider Romans 8:28 and Romans 8:28.";
        let resolved = resolve_citations(Vec::new(), answer, Locale::En);
        assert_eq!(resolved, vec![Citation::from_ref("Romans 8:28")]);

        let mut with_span = Citation::from_ref("John 3:16");
        with_span.spans = vec![Span::new(0, 4), Span::new(10, 500)];
        let backend = vec![with_span, Citation::from_ref(""), Citation::from_ref("John 3:16")];
        let resolved = resolve_citations(backend, answer, Locale::En);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].spans, vec![Span::new(0, 4)]);
    }

    #[test]
    fn test_ask_prompt() {
        assert_eq!(ask_prompt("John 3:16", Locale::En), "What does John 3:16 mean?");
        assert_eq!(ask_prompt("Иоанна 3:16", Locale::Ru), "Что означает Иоанна 3:16?");
    }
}
