//! Finds image URLs in free-form text returned by the provider. A URL candidate
//! starts at `https://` and runs until whitespace or a quote.

const SCHEME: &str = "https://";
const DELIVERY_HOST: &str = "replicate.delivery/";
const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPattern {
    /// Files served from the provider's delivery CDN
    Delivery,
    /// Anything ending in a common image extension, case-insensitive
    ImageExtension,
    /// Any URL mentioning the provider, case-insensitive
    MentionsReplicate,
    AnyHttps,
}

pub const DELIVERY_ONLY: &[UrlPattern] = &[UrlPattern::Delivery];

pub const ALL_PATTERNS: &[UrlPattern] = &[
    UrlPattern::Delivery,
    UrlPattern::ImageExtension,
    UrlPattern::MentionsReplicate,
    UrlPattern::AnyHttps,
];

/// Tries the patterns in order, the first one that matches anywhere wins.
pub fn find_first<'t>(text: &'t str, patterns: &[UrlPattern]) -> Option<(UrlPattern, &'t str)> {
    patterns
        .iter()
        .find_map(|&pattern| pattern.find(text).map(|url| (pattern, url)))
}

impl UrlPattern {
    fn case_insensitive(self) -> bool {
        matches!(self, Self::ImageExtension | Self::MentionsReplicate)
    }

    /// Leftmost match of this pattern in `text`
    pub fn find(self, text: &str) -> Option<&str> {
        candidates(text, self.case_insensitive()).find_map(|token| self.match_token(token))
    }

    fn match_token(self, token: &str) -> Option<&str> {
        let rest = &token[SCHEME.len()..];
        match self {
            Self::Delivery => rest
                .strip_prefix(DELIVERY_HOST)
                .filter(|path| !path.is_empty())
                .map(|_| token),
            Self::ImageExtension => {
                let lower = token.to_ascii_lowercase();
                // the longest match wins, so search for the last extension
                (SCHEME.len()..lower.len())
                    .rev()
                    .filter(|&i| lower.is_char_boundary(i))
                    .find_map(|i| {
                        IMAGE_EXTENSIONS
                            .iter()
                            .find(|ext| lower[i..].starts_with(*ext))
                            .map(|ext| &token[..i + ext.len()])
                    })
            }
            Self::MentionsReplicate => rest
                .to_ascii_lowercase()
                .contains("replicate")
                .then_some(token),
            Self::AnyHttps => (!rest.is_empty()).then_some(token),
        }
    }
}

fn is_terminator(ch: char) -> bool {
    ch.is_whitespace() || ch == '"' || ch == '\''
}

/// Every substring that starts with the scheme and runs to the next terminator,
/// in order of their start position. Candidates may overlap.
fn candidates(text: &str, case_insensitive: bool) -> impl Iterator<Item = &str> {
    // ascii lowercasing keeps byte offsets intact
    let haystack = if case_insensitive {
        text.to_ascii_lowercase()
    } else {
        text.to_string()
    };

    let starts: Vec<usize> = haystack.match_indices(SCHEME).map(|(i, _)| i).collect();
    starts.into_iter().map(move |start| {
        let token = &text[start..];
        let end = token[SCHEME.len()..]
            .find(is_terminator)
            .map_or(token.len(), |pos| pos + SCHEME.len());
        &token[..end]
    })
}
