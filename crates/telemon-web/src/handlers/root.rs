//! 메트릭 목록 HTML 페이지.

use axum::extract::State;
use axum::response::Html;
use std::fmt::Write;
use telemon_core::models::snapshot::StorageSnapshot;

use crate::error::ApiError;
use crate::AppState;

/// HTML 특수문자 이스케이프
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn render(snapshot: &StorageSnapshot) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Metrics</title></head><body>\n",
    );

    page.push_str("<h2>Gauges</h2>\n<ul>\n");
    for (name, value) in &snapshot.gauges {
        let _ = writeln!(page, "<li>{}: {value}</li>", escape(name));
    }
    page.push_str("</ul>\n<h2>Counters</h2>\n<ul>\n");
    for (name, value) in &snapshot.counters {
        let _ = writeln!(page, "<li>{}: {value}</li>", escape(name));
    }
    page.push_str("</ul>\n</body></html>\n");
    page
}

/// GET /
pub async fn list_metrics(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let snapshot = state.store.list_all().await?;
    Ok(Html(render(&snapshot)))
}
