//! Parsing of company-name and email extraction replies.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::parse::extract_json_object;
use crate::error::ClassifyError;
use crate::pipeline::{CompanyInfo, EmailInfo};

lazy_static! {
    static ref INVALID_EMAIL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\.(png|jpg|jpeg|gif|webp|svg|ico)$").unwrap(),
        Regex::new(r"(?i)cdn\.").unwrap(),
        Regex::new(r"(?i)example\.com$").unwrap(),
        Regex::new(r"(?i)test@").unwrap(),
        Regex::new(r"(?i)demo@").unwrap(),
    ];
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EmailEntry {
    Bare(String),
    Detailed(EmailInfo),
}

impl From<EmailEntry> for EmailInfo {
    fn from(entry: EmailEntry) -> Self {
        match entry {
            EmailEntry::Bare(email) => EmailInfo {
                email,
                source: None,
                context: None,
            },
            EmailEntry::Detailed(info) => info,
        }
    }
}

pub fn parse_company_info(raw: &str) -> Result<CompanyInfo, ClassifyError> {
    let map = extract_json_object(raw)
        .ok_or_else(|| ClassifyError::Parse("no JSON object in company info reply".into()))?;
    serde_json::from_value(Value::Object(map))
        .map_err(|e| ClassifyError::Parse(format!("company info: {e}")))
}

/// Parses `{"emails": [...]}` where entries are strings or objects, then drops
/// asset names and placeholder addresses.
pub fn parse_emails(raw: &str) -> Result<Vec<EmailInfo>, ClassifyError> {
    let map = extract_json_object(raw)
        .ok_or_else(|| ClassifyError::Parse("no JSON object in email reply".into()))?;
    let entries = match map.get("emails") {
        Some(v @ Value::Array(_)) => serde_json::from_value::<Vec<EmailEntry>>(v.clone())
            .map_err(|e| ClassifyError::Parse(format!("emails: {e}")))?,
        _ => Vec::new(),
    };
    Ok(filter_emails(entries.into_iter().map(EmailInfo::from)))
}

pub fn filter_emails<I>(emails: I) -> Vec<EmailInfo>
where
    I: IntoIterator<Item = EmailInfo>,
{
    emails
        .into_iter()
        .filter(|e| is_plausible_email(&e.email))
        .collect()
}

pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty()
        && email.contains('@')
        && !INVALID_EMAIL_PATTERNS.iter().any(|re| re.is_match(email))
}
