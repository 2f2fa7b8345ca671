use axum::{
    debug_handler,
    extract::Path,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;

use crate::db::users::User;

#[macro_export]
macro_rules! include_res {
    (bytes, $p:expr) => {
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
    (str, $p:expr) => {
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/res", $p))
    };
}

/// Fills `{key}` placeholders in one pass. Substituted values are never
/// rescanned, so user text that looks like a placeholder stays as typed.
/// Braces that don't name a known key (css, js) are left alone.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let value = after
            .find('}')
            .map(|close| &after[..close])
            .and_then(|key| vars.iter().find(|(k, _)| *k == key).map(|(k, v)| (k.len(), *v)));

        match value {
            Some((key_len, value)) => {
                out.push_str(value);
                rest = &after[key_len + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Percent-encodes a query string value.
pub fn query_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Markdown to html. Raw html in the source is shown as text.
pub fn markdown(source: &str) -> String {
    use pulldown_cmark::{Event, Parser};

    let parser = Parser::new(source).map(|event| match event {
        Event::Html(html) | Event::InlineHtml(html) => Event::Text(html),
        _ => event,
    });

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

/// "3 minutes ago" style age of `then`.
pub fn timesince(then: OffsetDateTime) -> String {
    timesince_at(then, OffsetDateTime::now_utc())
}

pub(crate) fn timesince_at(then: OffsetDateTime, now: OffsetDateTime) -> String {
    let seconds = (now - then).whole_seconds().max(0);

    let units = [
        (365 * 24 * 60 * 60, "year"),
        (30 * 24 * 60 * 60, "month"),
        (7 * 24 * 60 * 60, "week"),
        (24 * 60 * 60, "day"),
        (60 * 60, "hour"),
        (60, "minute"),
    ];

    for (size, unit) in units {
        let n = seconds / size;
        if n > 0 {
            let s = if n == 1 { "" } else { "s" };
            return format!("{n} {unit}{s} ago");
        }
    }

    "just now".to_owned()
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

pub fn not_allowed() -> Response {
    (StatusCode::FORBIDDEN, "Not allowed").into_response()
}

/// Wraps page content in the site chrome.
pub fn layout(title: &str, user: Option<&User>, flashes: &[String], content: &str) -> String {
    let nav = match user {
        Some(user) => render(include_res!(str, "/pages/nav_user.html"), &[
            ("id", &user.id.to_string()),
            ("avatar", &escape(&user.avatar_url())),
            ("username", &escape(&user.username)),
        ]),
        None => include_res!(str, "/pages/nav_anon.html").to_owned(),
    };

    let flashes: String = flashes
        .iter()
        .map(|flash| format!("<li class=\"flash\">{}</li>", escape(flash)))
        .collect();

    render(include_res!(str, "/pages/base.html"), &[
        ("title", &escape(title)),
        ("nav", &nav),
        ("flashes", &flashes),
        ("content", content),
    ])
}

#[debug_handler]
pub async fn static_file(Path(file): Path<String>) -> Response {
    match file.as_str() {
        "style.css" => (
            [(header::CONTENT_TYPE, "text/css")],
            include_res!(str, "/static/style.css"),
        ).into_response(),
        "avatar.svg" => (
            [(header::CONTENT_TYPE, "image/svg+xml")],
            include_res!(bytes, "/static/avatar.svg").as_slice(),
        ).into_response(),
        _ => not_found(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_fills_known_placeholders_once() {
        let out = render("<h1>{name}</h1><p>{description}</p>", &[
            ("name", "{description}"),
            ("description", "desc"),
        ]);
        assert_eq!(out, "<h1>{description}</h1><p>desc</p>");
    }

    #[test]
    fn render_leaves_unknown_braces() {
        let out = render("a { color: red; } {x} {missing", &[("x", "1")]);
        assert_eq!(out, "a { color: red; } 1 {missing");
    }

    #[test]
    fn escape_html() {
        assert_eq!(escape(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;");
    }

    #[test]
    fn query_encoding() {
        assert_eq!(query_encode("Rock & Roll"), "Rock+%26+Roll");
        assert_eq!(query_encode("café"), "caf%C3%A9");
    }

    #[test]
    fn markdown_suppresses_raw_html() {
        let html = markdown("**hi** <script>alert(1)</script>");
        assert!(html.contains("<strong>hi</strong>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn timesince_units() {
        let now = OffsetDateTime::now_utc();
        let ago = |d: time::Duration| timesince_at(now - d, now);
        assert_eq!(ago(time::Duration::seconds(10)), "just now");
        assert_eq!(ago(time::Duration::minutes(1)), "1 minute ago");
        assert_eq!(ago(time::Duration::hours(5)), "5 hours ago");
        assert_eq!(ago(time::Duration::days(15)), "2 weeks ago");
        assert_eq!(ago(time::Duration::days(800)), "2 years ago");
        assert_eq!(timesince_at(now + time::Duration::minutes(5), now), "just now");
    }
}
