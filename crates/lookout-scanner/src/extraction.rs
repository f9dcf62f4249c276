//! In-page extraction scripts.
//!
//! An [`ExtractionSpec`] is compiled into one self-contained JavaScript
//! expression. Selectors are embedded as JSON string literals, so no
//! selector can break out of the script. The expression evaluates to an
//! array of [`RawItem`]s; everything past link discovery (filtering,
//! validation, dedup) happens on the Rust side.

use crate::definition::{ExtractionSpec, FollowSpec, LinkFallback};
use lookout_core::PostKind;
use serde::Deserialize;
use serde_json::{json, Value};

/// Leading comment of every generated script.
pub const EXTRACT_MARKER: &str = "/* lookout:extract */";

/// Leading comment of link-gathering scripts.
pub const FOLLOW_MARKER: &str = "/* lookout:follow */";

/// One candidate item as reported by the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawItem {
    pub content: String,
    pub link: String,
    pub profile_link: String,
    pub promoted: bool,
    pub kind: Option<PostKind>,
}

impl RawItem {
    /// Apply the recipe's URL clean-ups.
    pub fn normalize(&mut self, spec: &ExtractionSpec) {
        if spec.strip_query {
            self.link = strip_query(&self.link);
            self.profile_link = strip_query(&self.profile_link);
        }
        if let Some(marker) = spec.profile_truncate_at.as_deref() {
            if let Some(idx) = self.profile_link.find(marker) {
                self.profile_link.truncate(idx);
            }
        }
    }
}

fn strip_query(url: &str) -> String {
    match url.find('?') {
        Some(idx) => {
            let fragment = url[idx..].find('#').map(|f| &url[idx + f..]).unwrap_or("");
            format!("{}{fragment}", &url[..idx])
        }
        None => url.to_string(),
    }
}

/// Compile a recipe into a page-evaluable expression.
#[must_use]
pub fn build_extraction_script(spec: &ExtractionSpec) -> String {
    let fallback = match spec.link_fallback {
        LinkFallback::None => "none",
        LinkFallback::Page => "page",
        LinkFallback::Profile => "profile",
    };
    let config = json!({
        "item": spec.item_selector,
        "title": spec.title_selector,
        "content": spec.content_selectors,
        "links": spec.link_selectors,
        "linkContains": spec.link_contains,
        "fallback": fallback,
        "fragment": spec.link_fragment.clone().unwrap_or_default(),
        "profiles": spec.profile_selectors,
        "promoted": spec.promoted_selectors,
        "promotedLabel": spec.promoted_label,
        "maxItems": spec.max_items,
        "kind": spec.kind,
    });

    format!(
        r#"{EXTRACT_MARKER}
(() => {{
  const cfg = {config};
  const text = (el) => (el ? (el.innerText || el.textContent || '').trim() : '');
  const hrefOf = (el) => {{
    if (!el) return '';
    if (el.href) return String(el.href);
    const anchor = el.closest('a');
    return anchor && anchor.href ? String(anchor.href) : '';
  }};
  const first = (root, selectors) => {{
    for (const selector of selectors) {{
      const el = root.querySelector(selector);
      if (el && text(el)) return el;
    }}
    return null;
  }};
  let items = Array.from(document.querySelectorAll(cfg.item));
  if (cfg.maxItems !== null) items = items.slice(0, cfg.maxItems);
  const out = [];
  for (const item of items) {{
    try {{
      const title = cfg.title ? text(item.querySelector(cfg.title)) : '';
      const body = text(first(item, cfg.content));
      const content = title && body ? title + '\n\n' + body : title || body;
      let link = '';
      for (const selector of cfg.links) {{
        for (const el of item.querySelectorAll(selector)) {{
          const href = hrefOf(el);
          if (href && (!cfg.linkContains || href.includes(cfg.linkContains))) {{
            link = href;
            break;
          }}
        }}
        if (link) break;
      }}
      let profileLink = '';
      for (const selector of cfg.profiles) {{
        const href = hrefOf(item.querySelector(selector));
        if (href) {{
          profileLink = href;
          break;
        }}
      }}
      if (!link && cfg.fallback === 'page') link = window.location.href.split('#')[0] + cfg.fragment;
      if (!link && cfg.fallback === 'profile' && profileLink) link = profileLink + cfg.fragment;
      const promoted = cfg.promoted.some((selector) => {{
        const el = item.querySelector(selector);
        return !!el && (!cfg.promotedLabel || text(el).includes(cfg.promotedLabel));
      }});
      if (content && link) out.push({{ content, link, profileLink, promoted, kind: cfg.kind }});
    }} catch (e) {{}}
  }}
  return out;
}})()"#
    )
}

/// Compile a follow spec into an expression returning the hrefs to open.
#[must_use]
pub fn build_follow_script(follow: &FollowSpec) -> String {
    let selector = Value::String(follow.selector.clone());
    format!(
        r#"{FOLLOW_MARKER}
(() => {{
  const seen = new Set();
  const out = [];
  for (const el of document.querySelectorAll({selector})) {{
    const href = el.href ? String(el.href).split('#')[0] : '';
    if (!/^https?:/.test(href) || seen.has(href)) continue;
    seen.add(href);
    out.push(href);
    if (out.length >= {limit}) break;
  }}
  return out;
}})()"#,
        limit = follow.limit,
    )
}

/// Decode a link list, keeping the first `limit` distinct http(s) URLs.
pub fn parse_links(value: Value, limit: usize) -> Result<Vec<String>, serde_json::Error> {
    let links: Vec<String> = match value {
        Value::Null => Vec::new(),
        other => serde_json::from_value(other)?,
    };
    let mut out: Vec<String> = Vec::with_capacity(limit);
    for link in links {
        if out.len() == limit {
            break;
        }
        let is_http = link.starts_with("https://") || link.starts_with("http://");
        if is_http && !out.contains(&link) {
            out.push(link);
        }
    }
    Ok(out)
}

/// Decode a script result. `null` (nothing matched on the page) reads as empty.
pub fn parse_items(value: Value) -> Result<Vec<RawItem>, serde_json::Error> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ExtractionSpec {
        toml::from_str(
            r#"
item_selector = '[data-testid="tweet"]'
content_selectors = ['[data-testid="tweetText"]']
link_selectors = ["time"]
profile_selectors = ['[data-testid="User-Name"] a']
promoted_selectors = ['[data-testid="socialContext"]']
promoted_label = "Promoted"
"#,
        )
        .expect("parse spec")
    }

    #[test]
    fn test_script_embeds_selectors_as_json() {
        let script = build_extraction_script(&spec());
        assert!(script.starts_with(EXTRACT_MARKER));
        assert!(script.contains(r#""item":"[data-testid=\"tweet\"]""#));
        assert!(script.contains(r#""promotedLabel":"Promoted""#));
        assert!(script.contains(r#""kind":"post""#));
    }

    #[test]
    fn test_hostile_selector_stays_quoted() {
        let mut spec = spec();
        spec.item_selector = "'); alert(1); ('".to_string();
        let script = build_extraction_script(&spec);
        assert!(script.contains(r#""item":"'); alert(1); ('""#));
    }

    #[test]
    fn test_parse_items() {
        let value = json!([
            {"content": "need a new CRM", "link": "https://x.com/a/status/1", "profileLink": "https://x.com/a", "promoted": false, "kind": "post"},
            {"content": "ad", "link": "https://x.com/b/status/2", "promoted": true}
        ]);
        let items = parse_items(value).expect("parse");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].profile_link, "https://x.com/a");
        assert_eq!(items[0].kind, Some(PostKind::Post));
        assert!(items[1].promoted);
        assert!(items[1].profile_link.is_empty());
    }

    #[test]
    fn test_follow_script_quotes_selector() {
        let follow: FollowSpec =
            toml::from_str("selector = 'a[title=\"x\"]'\nlimit = 2").expect("parse follow");
        let script = build_follow_script(&follow);
        assert!(script.starts_with(FOLLOW_MARKER));
        assert!(script.contains(r#"querySelectorAll("a[title=\"x\"]")"#));
        assert!(script.contains("out.length >= 2"));
    }

    #[test]
    fn test_parse_links_dedups_and_limits() {
        let value = json!([
            "https://www.youtube.com/watch?v=a",
            "javascript:void(0)",
            "https://www.youtube.com/watch?v=a",
            "https://www.youtube.com/watch?v=b",
            "https://www.youtube.com/watch?v=c",
        ]);
        let links = parse_links(value, 2).expect("parse");
        assert_eq!(
            links,
            ["https://www.youtube.com/watch?v=a", "https://www.youtube.com/watch?v=b"]
        );
        assert!(parse_links(Value::Null, 3).expect("null").is_empty());
        assert!(parse_links(json!({"href": 1}), 3).is_err());
    }

    #[test]
    fn test_parse_null_is_empty() {
        assert!(parse_items(Value::Null).expect("null").is_empty());
        assert!(parse_items(json!({"oops": 1})).is_err());
    }

    #[test]
    fn test_normalize_strips_query_and_truncates_profile() {
        let mut spec = spec();
        spec.strip_query = true;
        spec.profile_truncate_at = Some("/posts/".to_string());

        let mut item = RawItem {
            content: "x".to_string(),
            link: "https://www.linkedin.com/feed/update/urn:li:activity:1?utm=feed#c".to_string(),
            profile_link: "https://www.facebook.com/jane/posts/123?ref=x".to_string(),
            promoted: false,
            kind: None,
        };
        item.normalize(&spec);

        assert_eq!(item.link, "https://www.linkedin.com/feed/update/urn:li:activity:1#c");
        assert_eq!(item.profile_link, "https://www.facebook.com/jane");
    }
}
