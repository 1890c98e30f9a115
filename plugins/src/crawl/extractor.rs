//! HTML text extraction.
//!
//! `scraper` trees are immutable, so boilerplate is skipped while walking the tree
//! instead of being removed up front. Everything here is synchronous: the parsed
//! document is not `Send` and must never live across an await point.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use prospector_core::api::{collapse_whitespace, truncate_chars};

const NOISE_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript",
];

const NOISE_CLASSES: &[&str] = &[
    "nav",
    "navigation",
    "menu",
    "sidebar",
    "breadcrumb",
    "pagination",
    "social",
    "share",
    "ad",
    "advertisement",
];

const MAIN_SELECTORS: &[&str] = &[
    "main",
    "article",
    ".content",
    ".main-content",
    ".page-content",
    ".post-content",
    "#content",
    "#main",
];

/// Keyword groups for key pages, tried in this order; at most one link per group.
pub const KEY_PAGE_GROUPS: &[(&str, &[&str])] = &[
    ("about", &["about", "关于", "about-us", "company", "公司"]),
    ("products", &["product", "产品", "products", "catalog", "目录"]),
    ("services", &["service", "服务", "services", "solution", "解决方案"]),
    ("contact", &["contact", "联系", "contact-us", "联系我们"]),
    ("news", &["news", "新闻", "blog", "资讯", "press"]),
];

const COMPANY_INFO_LIMIT: usize = 500;
const FOOTER_LIMIT: usize = 300;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").unwrap();
    static ref H1: Selector = Selector::parse("h1").unwrap();
    static ref BODY: Selector = Selector::parse("body").unwrap();
    static ref META_DESCRIPTION: Selector = Selector::parse(r#"meta[name="description"]"#).unwrap();
    static ref META_OG_DESCRIPTION: Selector =
        Selector::parse(r#"meta[property="og:description"]"#).unwrap();
    static ref META_KEYWORDS: Selector = Selector::parse(r#"meta[name="keywords"]"#).unwrap();
    static ref COMPANY_INFO: Selector =
        Selector::parse(".company, .about, .intro, .description, .overview").unwrap();
    static ref FOOTER: Selector =
        Selector::parse("footer, .footer, .copyright, .contact-info").unwrap();
    static ref NAV_LINKS: Selector =
        Selector::parse("nav a, .nav a, .navigation a, .menu a, header a").unwrap();
    static ref ALL_LINKS: Selector = Selector::parse("a[href]").unwrap();
    static ref MAIN: Vec<Selector> = MAIN_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLink {
    pub kind: &'static str,
    pub url: Url,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageExtract {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub content: String,
    pub company_info: String,
    pub footer_content: String,
    pub key_links: Vec<KeyLink>,
}

/// Extracts one page. `max_key_links == 0` skips link discovery.
pub fn extract_page(html: &str, base: &Url, page_char_limit: usize, max_key_links: usize) -> PageExtract {
    let doc = Html::parse_document(html);

    let title = first_text(&doc, &TITLE)
        .or_else(|| first_text(&doc, &H1))
        .unwrap_or_default();

    let keywords = meta_content(&doc, &META_KEYWORDS).unwrap_or_default();
    let description = meta_content(&doc, &META_DESCRIPTION)
        .or_else(|| meta_content(&doc, &META_OG_DESCRIPTION))
        .unwrap_or_else(|| keywords.clone());

    PageExtract {
        title,
        description,
        keywords,
        content: truncate_chars(&main_text(&doc), page_char_limit),
        company_info: truncate_chars(&joined_text(&doc, &COMPANY_INFO), COMPANY_INFO_LIMIT),
        footer_content: truncate_chars(&joined_text(&doc, &FOOTER), FOOTER_LIMIT),
        key_links: if max_key_links == 0 {
            Vec::new()
        } else {
            find_key_links(&doc, base, max_key_links)
        },
    }
}

fn first_text(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn meta_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn joined_text(doc: &Html, sel: &Selector) -> String {
    let parts: Vec<String> = doc
        .select(sel)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .collect();
    collapse_whitespace(&parts.join(" "))
}

fn is_noise(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    NOISE_TAGS.contains(&value.name()) || value.classes().any(|c| NOISE_CLASSES.contains(&c))
}

fn visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_noise(&child_el) {
                        visible_text(child_el, out);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Text of the first non-empty main-content container, else the body.
fn main_text(doc: &Html) -> String {
    for sel in MAIN.iter() {
        if let Some(el) = doc.select(sel).find(|el| !is_noise(el)) {
            let mut raw = String::new();
            visible_text(el, &mut raw);
            let text = collapse_whitespace(&raw);
            if !text.is_empty() {
                return text;
            }
        }
    }

    doc.select(&BODY)
        .next()
        .map(|body| {
            let mut raw = String::new();
            visible_text(body, &mut raw);
            collapse_whitespace(&raw)
        })
        .unwrap_or_default()
}

fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
    {
        return None;
    }
    let mut url = base.join(href).ok()?;
    url.set_fragment(None);
    if url.host_str() != base.host_str() || !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    Some(url)
}

fn same_page(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

/// Navigation links are checked before the rest of the page's links.
fn find_key_links(doc: &Html, base: &Url, max: usize) -> Vec<KeyLink> {
    let candidates: Vec<(String, String)> = doc
        .select(&NAV_LINKS)
        .chain(doc.select(&ALL_LINKS))
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let text = collapse_whitespace(&el.text().collect::<String>()).to_lowercase();
            Some((href.to_string(), text))
        })
        .collect();

    let mut found: Vec<KeyLink> = Vec::new();
    for &(kind, patterns) in KEY_PAGE_GROUPS {
        if found.len() >= max {
            break;
        }
        let hit = candidates.iter().find_map(|(href, text)| {
            let href_lower = href.to_lowercase();
            let matches = patterns
                .iter()
                .any(|p| text.contains(p) || href_lower.contains(p));
            if !matches {
                return None;
            }
            let url = resolve_link(base, href)?;
            let duplicate = same_page(&url, base) || found.iter().any(|k| same_page(&k.url, &url));
            (!duplicate).then_some(url)
        });
        if let Some(url) = hit {
            found.push(KeyLink { kind, url });
        }
    }
    found
}
