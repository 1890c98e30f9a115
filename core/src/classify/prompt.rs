//! Prompt templating for classification and extraction requests.

use crate::pipeline::CrawledSite;

pub const DEFAULT_CLASSIFY_TEMPLATE: &str = "\
Decide whether the following website belongs to a target customer.

URL: {url}
Title: {title}
Description: {description}
Keywords: {keywords}
Company: {companyInfo}
Pages crawled:
{pages}

Content:
{content}

Footer:
{footerContent}

Reply with JSON only: {\"result\": \"Y\" or \"N\", \"reason\": \"short explanation\"}";

pub const DEFAULT_COMPANY_PROMPT: &str = "\
Extract the company names from the website content below. Reply with JSON only:
{\"primaryName\": \"\", \"names\": [], \"founderNames\": [], \"brandNames\": [], \"fullName\": \"\"}

Content:
{content}";

pub const DEFAULT_EMAIL_PROMPT: &str = "\
Extract every contact email address from the website content below. Reply with JSON only:
{\"emails\": [{\"email\": \"\", \"source\": \"\", \"context\": \"\"}]}

Content:
{content}";

/// Substitutes every placeholder occurrence with the matching site field. Empty
/// fields get a readable fallback so the model never sees a bare placeholder.
pub fn render_template(template: &str, site: &CrawledSite) -> String {
    let template = if template.trim().is_empty() {
        DEFAULT_CLASSIFY_TEMPLATE
    } else {
        template
    };

    let pages = if site.pages.is_empty() {
        "Only the home page was crawled".to_string()
    } else {
        site.pages
            .iter()
            .map(|p| format!("{}: {} ({})", p.kind, p.url, p.title))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let or = |value: &str, fallback: &str| -> String {
        if value.trim().is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };

    template
        .replace("{title}", &or(&site.title, "No title"))
        .replace("{description}", &or(&site.description, "No description"))
        .replace("{content}", &or(&site.content, "No content"))
        .replace(
            "{footerContent}",
            &or(&site.footer_content, "No footer information"),
        )
        .replace("{pages}", &pages)
        .replace("{keywords}", &or(&site.keywords, "None"))
        .replace("{companyInfo}", &or(&site.company_info, "None"))
        .replace("{url}", &site.url)
}

/// Fills `{content}` in an extraction prompt, falling back to `default` when unset.
pub fn render_content_prompt(template: Option<&str>, default: &str, content: &str) -> String {
    let template = template.filter(|t| !t.trim().is_empty()).unwrap_or(default);
    template.replace("{content}", content)
}
