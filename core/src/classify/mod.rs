pub mod extract;
pub mod parse;
pub mod prompt;
pub mod types;

pub use extract::{filter_emails, parse_company_info, parse_emails};
pub use parse::{extract_json_object, parse_verdict, strip_code_fence};
pub use prompt::{render_content_prompt, render_template};
pub use types::{AiConfig, Classification, Verdict};
