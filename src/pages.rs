use serde::{Deserialize, Serialize};

const NOTICE_TITLE: &str = "Error";
const NOTICE_DESCRIPTION: &str = "Could not possible load your data.";
const NOTICE_DURATION_MS: u64 = 5000;

/// Transient, dismissible notification shown in the corner of a screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub duration_ms: u64,
    pub closable: bool,
}

impl Notice {
    /// The one notification both screens show when loading or joining fails.
    pub fn load_error() -> Self {
        Notice {
            title: NOTICE_TITLE.to_string(),
            description: NOTICE_DESCRIPTION.to_string(),
            duration_ms: NOTICE_DURATION_MS,
            closable: true,
        }
    }

    pub fn render(&self) -> String {
        let mut html = format!(
            r#"<div class="toast toast-error" role="alert" data-duration="{}"><strong>{}</strong><p>{}</p>"#,
            self.duration_ms,
            escape(&self.title),
            escape(&self.description)
        );
        if self.closable {
            html.push_str(r#"<button type="button" class="toast-close" aria-label="Close">&times;</button>"#);
        }
        html.push_str("</div>");
        html
    }
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wraps a screen body in the shared document shell.
pub fn layout(title: &str, body: &str, notice: Option<&Notice>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{}</title>
<link rel="stylesheet" href="/public/styles.css">
</head>
<body>
<div id="toasts">{}</div>
{}
<script src="/public/app.js"></script>
</body>
</html>
"#,
        escape(title),
        notice.map(Notice::render).unwrap_or_default(),
        body
    )
}
