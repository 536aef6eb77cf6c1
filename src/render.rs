use std::sync::LazyLock;

use regex::Regex;

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));

/// Render model output as HTML.
///
/// Summary text is untrusted, so it is escaped first; fenced regions are then
/// rewritten to `<pre><code>` blocks. Everything else passes through as-is.
pub fn render_summary(summary: &str) -> String {
    let escaped = html_escape::encode_text(summary);
    FENCE.replace_all(&escaped, "<pre><code>$1</code></pre>").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fenced_code() {
        let rendered = render_summary("Run this: ```print(\"hi\")``` then stop.");
        assert_eq!(rendered, "Run this: <pre><code>print(\"hi\")</code></pre> then stop.");
    }

    #[test]
    fn test_render_multiline_fence() {
        let rendered = render_summary("Intro\n```\nfn main() {}\n```\nOutro");
        assert_eq!(rendered, "Intro\n<pre><code>\nfn main() {}\n</code></pre>\nOutro");
    }

    #[test]
    fn test_render_multiple_fences() {
        let rendered = render_summary("```a``` and ```b```");
        assert_eq!(rendered, "<pre><code>a</code></pre> and <pre><code>b</code></pre>");
    }

    #[test]
    fn test_render_escapes_markup() {
        let rendered = render_summary("<script>alert(1)</script> & ```x < y```");
        assert_eq!(
            rendered,
            "&lt;script&gt;alert(1)&lt;/script&gt; &amp; <pre><code>x &lt; y</code></pre>"
        );
    }

    #[test]
    fn test_render_unterminated_fence_left_alone() {
        assert_eq!(render_summary("```not closed"), "```not closed");
    }

    #[test]
    fn test_render_plain_text_unchanged() {
        assert_eq!(render_summary("Just a summary."), "Just a summary.");
    }
}
