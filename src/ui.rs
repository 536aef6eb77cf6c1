use axum::response::Html;

/// Single-page UI; the summary markup it inserts is rendered server side by `render::render_summary`
const INDEX_HTML: &str = include_str!("../assets/index.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_uses_rendered_summary() {
        assert!(INDEX_HTML.contains("summaryHtml"));
        assert!(INDEX_HTML.contains("Invalid YouTube URL"));
        assert!(INDEX_HTML.contains("No transcript available"));
    }
}
