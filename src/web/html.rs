//! Markup helpers for the server-rendered pages.

use std::fmt::Write;

use axum::response::Html;
use chrono::{DateTime, Local, Utc};

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Timestamps are shown in the server's local zone.
pub fn timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string()
}

pub fn layout(title: &str, signed_in: Option<&str>, body: &str) -> Html<String> {
    let mut nav = String::from(
        r#"<a href="/">Задачи</a> <a href="/project/list">Проекты</a> <a href="/status/list">Статусы</a>"#,
    );
    if let Some(username) = signed_in {
        let _ = write!(
            nav,
            r#" <form method="post" action="/logout" class="inline"><span>{}</span> <button>Выйти</button></form>"#,
            escape(username)
        );
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="ru">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<nav>{nav}</nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav = nav,
        body = body,
    ))
}

/// A table with escaped header cells. Row cells are inserted as given.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::from("<table><thead><tr>");
    for h in headers {
        let _ = write!(out, "<th>{}</th>", escape(h));
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            let _ = write!(out, "<td>{}</td>", cell);
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

pub fn link(href: &str, text: &str) -> String {
    format!(r#"<a href="{}">{}</a>"#, escape(href), escape(text))
}
