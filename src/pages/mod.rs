//! HTML pages served by the gate.

pub mod error;
pub mod health;
pub mod index;
pub mod welcome;

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Escape text for an HTML body or attribute.
pub fn escape_html(text: &str) -> String {
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

/// Icon shown above the page heading.
#[derive(Debug, Clone, Copy)]
pub enum Icon {
    Check,
    Cross,
    Key,
}

impl Icon {
    fn color(self) -> &'static str {
        match self {
            Self::Check => "#10B981",
            Self::Cross => "#EF4444",
            Self::Key => "#667eea",
        }
    }

    fn svg(self) -> &'static str {
        match self {
            Self::Check => r#"<polyline points="20 6 9 17 4 12"></polyline>"#,
            Self::Cross => {
                r#"<line x1="18" y1="6" x2="6" y2="18"></line><line x1="6" y1="6" x2="18" y2="18"></line>"#
            }
            Self::Key => {
                r#"<circle cx="8" cy="15" r="4"></circle><line x1="11" y1="12" x2="20" y2="3"></line><line x1="17" y1="6" x2="20" y2="9"></line>"#
            }
        }
    }
}

/// Render a page in the shared card layout. `body` is inserted as-is.
pub fn layout(title: &str, icon: Icon, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            min-height: 100vh;
            display: flex;
            align-items: center;
            justify-content: center;
        }}
        .container {{
            background: white;
            padding: 3rem;
            border-radius: 1rem;
            box-shadow: 0 25px 50px -12px rgba(0, 0, 0, 0.25);
            text-align: center;
            max-width: 420px;
        }}
        .icon {{
            width: 80px;
            height: 80px;
            background: {color};
            border-radius: 50%;
            display: flex;
            align-items: center;
            justify-content: center;
            margin: 0 auto 1.5rem;
        }}
        .icon svg {{
            width: 40px;
            height: 40px;
            stroke: white;
            stroke-width: 3;
            fill: none;
        }}
        h1 {{ color: #1F2937; font-size: 1.5rem; margin-bottom: 0.5rem; }}
        p {{ color: #6B7280; margin-bottom: 1.5rem; }}
        .hint {{ font-size: 0.875rem; color: #9CA3AF; }}
        a.button {{
            display: inline-block;
            background: #667eea;
            color: white;
            padding: 0.75rem 1.5rem;
            border-radius: 0.5rem;
            text-decoration: none;
        }}
    </style>
</head>
<body>
    <div class="container">
        <div class="icon">
            <svg viewBox="0 0 24 24">{svg}</svg>
        </div>
        <h1>{title}</h1>
        {body}
    </div>
</body>
</html>"#,
        title = escape_html(title),
        color = icon.color(),
        svg = icon.svg(),
        body = body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape_html("Tom & Jerry's"), "Tom &amp; Jerry&#39;s");
    }

    #[test]
    fn test_found() {
        let response = found("/Error");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/Error");
    }

    #[test]
    fn test_layout_escapes_title() {
        let Html(page) = layout("<b>", Icon::Key, "<p>ok</p>");
        assert!(page.contains("<h1>&lt;b&gt;</h1>"));
        assert!(page.contains("<p>ok</p>"));
    }
}
