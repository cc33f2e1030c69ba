use once_cell::sync::Lazy;
use regex::Regex;

static INSECURE_SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^http://").expect("Scheme regex is invalid!"));

/// Query parameters that only record how a link was shared.
static TRACKING_PARAM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"feature=(?:g-u|youtu\.be|youtube_gdata)").expect("Tracking regex is invalid!")
});

static AMPERSANDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&+").expect("Ampersand regex is invalid!"));

/// Normalise `url` into a key under which re-saved copies of the same page
/// compare equal.
///
/// The rules are applied until nothing changes, so the result is a fixpoint:
/// `canonicalize(&canonicalize(u)) == canonicalize(u)`.
pub fn canonicalize(url: &str) -> String {
    let mut current = url.to_owned();
    loop {
        let next = pass(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn pass(url: &str) -> String {
    let url = INSECURE_SCHEME_RE.replace(url, "https://");
    let url = TRACKING_PARAM_RE.replace_all(&url, "");
    let url = AMPERSANDS_RE.replace_all(&url, "&");
    let mut url = url.replace("?&", "?");

    loop {
        let trimmed = url
            .strip_suffix("&a")
            .unwrap_or(&url)
            .trim_end_matches(['&', '?', '/']);
        if trimmed.len() == url.len() {
            return url;
        }
        url = trimmed.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tracking_param_and_scheme_do_not_matter() {
        assert_eq!(
            canonicalize("http://example.com/a?feature=youtu.be&x=1"),
            canonicalize("https://example.com/a?x=1"),
        );
        assert_eq!(
            canonicalize("https://example.com/a?x=1"),
            "https://example.com/a?x=1"
        );
    }

    #[test]
    fn collapses_separators_and_trims() {
        assert_eq!(canonicalize("https://h/p?a&&&b"), "https://h/p?a&b");
        assert_eq!(canonicalize("https://h/p?a&"), "https://h/p?a");
        assert_eq!(canonicalize("https://h/p/"), "https://h/p");
        assert_eq!(canonicalize("https://h/p?x=1&/"), "https://h/p?x=1");
    }

    #[test]
    fn youtube_share_suffixes() {
        assert_eq!(
            canonicalize("http://www.youtube.com/watch?v=abc&feature=g-u&a"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(
            canonicalize("https://www.youtube.com/watch?feature=youtube_gdata&v=abc"),
            "https://www.youtube.com/watch?v=abc"
        );
    }

    #[test]
    fn only_the_leading_scheme_is_upgraded() {
        assert_eq!(
            canonicalize("HTTP://a.com/?next=http://b.com"),
            "https://a.com/?next=http://b.com"
        );
    }

    proptest! {
        #[test]
        fn idempotent(url in ".{0,64}") {
            let once = canonicalize(&url);
            prop_assert_eq!(canonicalize(&once), once);
        }

        #[test]
        fn idempotent_on_url_shaped_input(
            url in "(https?://)?[a-z./?&=_-]{0,24}(feature=(g-u|youtu\\.be|youtube_gdata))?[a-z&/?=]{0,12}"
        ) {
            let once = canonicalize(&url);
            prop_assert_eq!(canonicalize(&once), once);
        }
    }
}
