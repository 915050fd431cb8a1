// File: propcast-core/src/integrations/templates.rs
//
// HTML bodies for outbound mail. Values typed by users (addresses, names,
// messages) are escaped; the analysis content is already HTML and is
// inserted unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

const PREVIEW_CHARS: usize = 500;

static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<style[^>]*>.*?</style>|<[^>]+>").expect("valid regex"));
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Plain-text alternative of an HTML body.
pub fn strip_tags(html: &str) -> String {
    let text = TAG_RE.replace_all(html, "");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");
    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// First 500 characters of the analysis, with `...` when cut.
pub fn content_preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }
.header { background: linear-gradient(90deg, #5B3DFF 0%, #00C4FF 100%); color: white; padding: 20px; border-radius: 10px; margin-bottom: 20px; }
.content { background: #f9f9f9; padding: 20px; border-radius: 10px; margin-bottom: 20px; }
.message { background: #e3f2fd; padding: 15px; border-left: 4px solid #2196f3; margin-bottom: 20px; }
.cta-button { display: inline-block; background: linear-gradient(90deg, #0066CC 0%, #00C4FF 100%); color: white !important; padding: 12px 24px; text-decoration: none; border-radius: 6px; font-weight: bold; margin: 10px 0; }
.analysis-preview { background: white; padding: 15px; border-radius: 8px; border: 1px solid #ddd; margin: 15px 0; max-height: 300px; overflow-y: auto; }
.footer { text-align: center; color: #666; font-size: 12px; margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; }
"#;

pub fn share_email(
    address: &str,
    shared_by: &str,
    message: &str,
    content: &str,
    link: &str,
) -> RenderedEmail {
    let address_html = escape_html(address);
    let sharer = escape_html(shared_by);
    let message_block = if message.trim().is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="message"><strong>Message from {sharer}:</strong><br>{}</div>"#,
            escape_html(message)
        )
    };
    let preview = content_preview(content);
    let href = escape_html(link);

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Property Analysis</title>
<style>{STYLE}</style>
</head>
<body>
<div class="header"><h1>Property Analysis Report</h1></div>
<div class="content">
<h2>{address_html}</h2>
{message_block}
<p>Below is a preview of the property analysis. Click the button below to view the full report online.</p>
<div class="analysis-preview">{preview}</div>
<a href="{href}" class="cta-button">View Full Analysis Report</a>
<p><small>This link will take you to the complete property analysis with detailed insights and recommendations.</small></p>
</div>
<div class="footer">
<p>This email was sent from the Real Estate Analysis Platform</p>
<p>If you have any questions, please contact {sharer}</p>
</div>
</body>
</html>"#
    );

    RenderedEmail {
        subject: format!("Property Analysis: {address}"),
        html,
    }
}

pub fn welcome_email(user_name: &str) -> RenderedEmail {
    let name = escape_html(user_name);
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Welcome</title>
<style>{STYLE}</style>
</head>
<body>
<div class="header"><h1>Welcome to Real Estate Analysis Platform!</h1></div>
<div class="content">
<h2>Hello {name},</h2>
<p>Thank you for joining our Real Estate Analysis Platform! We're excited to help you create comprehensive property analysis reports.</p>
<h3>What you can do:</h3>
<ul>
<li>Generate detailed property analysis reports</li>
<li>Share reports with clients and colleagues</li>
<li>Track market insights and trends</li>
<li>Download reports as PDF</li>
</ul>
<p>If you have any questions or need assistance, don't hesitate to reach out to our support team.</p>
</div>
<div class="footer"><p>Real Estate Analysis Platform</p></div>
</body>
</html>"#
    );

    RenderedEmail {
        subject: "Welcome to Real Estate Analysis Platform".to_string(),
        html,
    }
}
