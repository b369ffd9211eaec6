//! Web page fetching and HTML-to-text extraction.

use std::sync::LazyLock;
use std::time::Duration;

use qa_core::{AppError, AppResult};
use regex::{Captures, Regex};

/// User agent sent when fetching pages.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; QA-Agent/1.0)";

/// Page fetch timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Elements dropped together with everything inside them.
const STRIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "noscript"];

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

static STRIPPED_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    STRIPPED_ELEMENTS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>"))
                .expect("valid element regex")
        })
        .collect()
});

static BLOCK_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:address|article|aside|blockquote|body|br|dd|div|dl|dt|figcaption|figure|form|h[1-6]|head|header|hr|html|li|main|ol|p|pre|section|table|tbody|td|tfoot|th|thead|title|tr|ul)\b[^>]*>",
    )
    .expect("valid block tag regex")
});

static ANY_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid entity regex")
});

static HSPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0B\x0C\r\u{00A0}]+").expect("valid space regex"));

/// Fetch a page and return its visible text.
///
/// Follows redirects. Any transport failure or non-success status is a
/// `FetchError`. There is no retry.
pub async fn fetch_html_text(url: &str) -> AppResult<String> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| AppError::Fetch(format!("Failed to build HTTP client: {}", e)))?;

    tracing::info!(url, "Fetching page");

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::Fetch(format!("Failed to fetch {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::Fetch(format!("{} returned status {}", url, status)));
    }

    let html = response
        .text()
        .await
        .map_err(|e| AppError::Fetch(format!("Failed to read body of {}: {}", url, e)))?;

    let text = html_to_text(&html);
    tracing::debug!(url, html_bytes = html.len(), text_chars = text.chars().count(), "Extracted page text");

    Ok(text)
}

/// Convert HTML into newline-separated visible text.
///
/// Scripts, styles, navigation, footers and `noscript` blocks are removed.
/// Block-level tags become line breaks, other tags become spaces. Every line
/// is trimmed and blank lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let mut text = COMMENT_RE.replace_all(html, "").into_owned();

    for re in STRIPPED_RES.iter() {
        text = re.replace_all(&text, "").into_owned();
    }

    let text = BLOCK_TAG_RE.replace_all(&text, "\n");
    let text = ANY_TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| HSPACE_RE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode named and numeric character references in one pass.
fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };

            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{00A0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "laquo" => '«',
        "raquo" => '»',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "middot" => '·',
        _ => return None,
    };
    Some(c)
}
