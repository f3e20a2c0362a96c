use std::sync::OnceLock;

use regex::Regex;

const LINKEDIN_PLACEHOLDER: &str = "___LINKEDIN_LINK___";

/// Renders a plain text body as a small styled HTML document.
///
/// A "LinkedIn: <url>" signature line becomes a link, `**text**` becomes
/// bold and every line break is kept. Everything else is escaped.
pub fn to_html(text: &str) -> String {
    static CELL_LINKEDIN: OnceLock<Regex> = OnceLock::new();
    static CELL_BOLD: OnceLock<Regex> = OnceLock::new();
    let re_linkedin = CELL_LINKEDIN.get_or_init(|| {
        Regex::new(r"LinkedIn:\s*(https?://(?:www\.)?linkedin\.com/\S+)")
            .expect("failed to compile regex")
    });
    let re_bold =
        CELL_BOLD.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("failed to compile regex"));

    // The url has to be pulled out before escaping or its `&` would be mangled
    let linkedin_url = re_linkedin
        .captures(text)
        .map(|captures| captures[1].to_string());
    let text = match &linkedin_url {
        Some(_) => re_linkedin.replace_all(text, LINKEDIN_PLACEHOLDER).into_owned(),
        None => text.to_string(),
    };

    let mut text = escape(&text);
    if let Some(url) = linkedin_url {
        let anchor = format!(
            r#"<a href="{}" style="color: #0077B5; text-decoration: none;">LinkedIn</a>"#,
            escape_attribute(&url)
        );
        text = text.replace(LINKEDIN_PLACEHOLDER, &anchor);
    }
    let text = re_bold.replace_all(&text, "<strong>$1</strong>");
    let text = text.replace('\n', "<br>\n");

    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; font-size: 14px; line-height: 1.6; color: #333;">
{text}
</body>
</html>
"#
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(s: &str) -> String {
    escape(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkedin_and_bold() {
        // Arrange
        let input = "LinkedIn: https://linkedin.com/in/x\n**Bold**";

        // Act
        let actual = to_html(input);

        // Assert
        assert!(actual.contains(
            r#"<a href="https://linkedin.com/in/x" style="color: #0077B5; text-decoration: none;">LinkedIn</a><br>"#
        ));
        assert!(actual.contains("<strong>Bold</strong>"));
        assert!(!actual.contains(LINKEDIN_PLACEHOLDER));
    }

    #[test]
    fn other_markup_escaped() {
        let actual = to_html("a <script>alert(1)</script> & b\n**x > y**");
        assert!(actual.contains("a &lt;script&gt;alert(1)&lt;/script&gt; &amp; b<br>"));
        assert!(actual.contains("<strong>x &gt; y</strong>"));
        assert!(!actual.contains("<script>"));
    }

    #[test]
    fn url_query_not_double_escaped() {
        let actual = to_html("LinkedIn: https://www.linkedin.com/in/x?a=1&b=2");
        assert!(actual.contains(r#"href="https://www.linkedin.com/in/x?a=1&amp;b=2""#));
        assert!(!actual.contains("&amp;amp;"));
    }

    #[test]
    fn plain_text_untouched_but_wrapped() {
        let actual = to_html("Hello\nWorld");
        assert!(actual.starts_with("<html>"));
        assert!(actual.contains("Hello<br>\nWorld"));
    }

    #[test]
    fn other_links_not_converted() {
        let actual = to_html("Portfolio: https://example.com");
        assert!(actual.contains("Portfolio: https://example.com"));
        assert!(!actual.contains("<a "));
    }
}
