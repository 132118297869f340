//! Best-effort scraping of Pixabay sound-effect pages.
//!
//! Everything here depends on the site's current markup and may stop matching
//! at any time; callers treat a miss as "skip this item".

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::error::ItemError;

static OG_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta\s+property\s*=\s*"og:title"\s+content\s*=\s*"([^"]+)""#).unwrap()
});
static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static LD_JSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .unwrap()
});
static CDN_AUDIO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https://cdn\.pixabay\.com/download/audio/[^\s"'&<>]+\.(?:mp3|wav|flac|m4a|ogg)"#)
        .unwrap()
});
static HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"audio_([a-f0-9]+)").unwrap());
static CATEGORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)/sound-effects/search/([^/"'?#<>\s]+)/"#).unwrap());
static DETAIL_REL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)"(/sound-effects/[a-z0-9\-]+-\d+/)""#).unwrap());
static DETAIL_ABS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https://pixabay\.com/sound-effects/[a-z0-9\-]+-\d+/").unwrap());

/// A resource found on a detail page, consumed once to trigger its download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub detail_url: String,
    /// Scraped title; empty when the page had none.
    pub title: String,
    pub source_url: String,
    /// Lower-case extension of the source URL path, with leading dot.
    pub extension_hint: Option<String>,
    pub hash_hint: Option<String>,
    pub categories: Vec<String>,
}

impl DownloadTarget {
    /// Whether the title or a category mentions one of `keywords`. No keywords
    /// means no filtering.
    pub fn matches_keywords(&self, keywords: &[String]) -> bool {
        if keywords.is_empty() {
            return true;
        }
        let title = self.title.to_lowercase();
        let categories = self.categories.join(", ").to_lowercase();
        keywords.iter().map(|k| k.to_lowercase()).any(|k| {
            !k.is_empty() && (title.contains(&k) || categories.contains(&k))
        })
    }
}

/// Builds a [`DownloadTarget`] from a detail page's markup.
pub fn extract_target(detail_url: &str, html: &str) -> Result<DownloadTarget, ItemError> {
    let source_url = extract_audio_url(html).ok_or_else(|| ItemError::ExtractionMiss {
        detail_url: detail_url.to_string(),
    })?;

    Ok(DownloadTarget {
        detail_url: detail_url.to_string(),
        title: extract_title(html).unwrap_or_default(),
        extension_hint: extension_from_url(&source_url),
        hash_hint: hash_hint(&source_url),
        categories: extract_categories(html),
        source_url,
    })
}

/// Page title from `og:title`, then JSON-LD `name`, then the first `<h1>`.
pub fn extract_title(html: &str) -> Option<String> {
    let og = OG_TITLE_RE
        .captures(html)
        .map(|c| decode_entities(c[1].trim()));
    let ld = || json_ld_blocks(html).find_map(|v| find_json_str(&v, "name"));
    let h1 = || {
        H1_RE.captures(html).map(|c| {
            let text = TAG_RE.replace_all(&c[1], "");
            decode_entities(text.trim())
        })
    };

    og.filter(|t| !t.is_empty())
        .or_else(|| ld().filter(|t| !t.is_empty()))
        .or_else(|| h1().filter(|t| !t.is_empty()))
}

/// First direct CDN audio URL, falling back to JSON-LD `contentUrl`.
pub fn extract_audio_url(html: &str) -> Option<String> {
    CDN_AUDIO_RE
        .find(html)
        .map(|m| decode_entities(m.as_str()))
        .or_else(|| {
            json_ld_blocks(html)
                .find_map(|v| find_json_str(&v, "contentUrl"))
                .filter(|u| u.starts_with("http"))
        })
}

/// Search tags linked from the page, `-` turned into spaces, first occurrence order.
pub fn extract_categories(html: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cap in CATEGORY_RE.captures_iter(html) {
        let category = cap[1].replace('-', " ").trim().to_string();
        if !category.is_empty() && !out.contains(&category) {
            out.push(category);
        }
    }
    out
}

/// Detail-page links on a search result page, de-duplicated in order.
///
/// Relative links are resolved against `origin` (e.g. `https://pixabay.com`).
pub fn collect_detail_links(html: &str, origin: &str) -> Vec<String> {
    let origin = origin.trim_end_matches('/');
    let relative = DETAIL_REL_RE
        .captures_iter(html)
        .map(|c| format!("{origin}{}", &c[1]));
    let absolute = DETAIL_ABS_RE.find_iter(html).map(|m| m.as_str().to_string());

    let mut out: Vec<String> = Vec::new();
    for link in relative.chain(absolute) {
        if !out.contains(&link) {
            out.push(link);
        }
    }
    out
}

/// Search result URL for `query`; pages after the first use `?pagi=`.
pub fn search_page_url(base_url: &str, query: &str, page: u32) -> String {
    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    let slug = query.split_whitespace().collect::<Vec<_>>().join("-");
    let url = format!("{base}sound-effects/search/{slug}/");
    if page <= 1 {
        url
    } else {
        format!("{url}?pagi={page}")
    }
}

/// Lower-case extension (with dot) of the URL's path, ignoring query and fragment.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let ext = Path::new(parsed.path()).extension()?.to_str()?;
    Some(format!(".{}", ext.to_lowercase()))
}

/// First six hex chars of the CDN `audio_<hex>` token.
pub fn hash_hint(url: &str) -> Option<String> {
    HASH_RE
        .captures(url)
        .map(|c| c[1].chars().take(6).collect::<String>())
}

fn json_ld_blocks(html: &str) -> impl Iterator<Item = Value> + '_ {
    LD_JSON_RE
        .captures_iter(html)
        .filter_map(|c| serde_json::from_str::<Value>(c[1].trim()).ok())
}

fn find_json_str(value: &Value, key: &str) -> Option<String> {
    match value {
        Value::Object(map) => map
            .get(key)
            .and_then(Value::as_str)
            .map(|s| decode_entities(s.trim()))
            .or_else(|| map.values().find_map(|v| find_json_str(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_json_str(v, key)),
        _ => None,
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
