use lazy_regex::{lazy_regex, Lazy, Regex};

const MIN_PAGE_CHARS: usize = 100;

static RE_PAGE_FINGERPRINT: Lazy<Regex> = lazy_regex!(
    r#"<span class="h2">[A-Z] - |<div class="part">|<h3>入力例|<h3>出力例|<a href="/contests/abc\d+"#
);

/// Cheap check whether `content` is worth handing to [`crate::extract`].
///
/// Short strings never qualify; otherwise any one of the page fingerprints is enough.
pub fn looks_like_problem_markup(content: &str) -> bool {
    content.chars().count() >= MIN_PAGE_CHARS && RE_PAGE_FINGERPRINT.is_match(content)
}
