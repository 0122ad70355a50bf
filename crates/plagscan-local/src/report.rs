use std::fmt::Write as _;
use std::path::Path;

use plagscan_core::{Error, MatchResult, Result};

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Static HTML listing each flagged fragment with its search URL, in the given order.
pub fn render_html(results: &[MatchResult]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    out.push_str("    <meta charset=\"utf-8\">\n");
    out.push_str("    <title>Plagiarism Check Results</title>\n");
    out.push_str("</head>\n<body>\n");
    out.push_str("    <h1>Plagiarism Check Results</h1>\n");
    out.push_str("    <ul>\n");
    for r in results {
        let url = html_escape(&r.url);
        // Writing into a String cannot fail.
        out.push_str("        <li>\n");
        let _ = writeln!(
            out,
            "            <p>Fragment: {}</p>",
            html_escape(&r.fragment)
        );
        let _ = writeln!(
            out,
            "            <p>URL: <a href=\"{url}\" target=\"_blank\">{url}</a></p>"
        );
        out.push_str("        </li>\n        <hr>\n");
    }
    out.push_str("    </ul>\n</body>\n</html>\n");
    out
}

pub fn write_html(results: &[MatchResult], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Io(format!("{}: {e}", parent.display())))?;
    }
    std::fs::write(path, render_html(results))
        .map_err(|e| Error::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(index: usize, fragment: &str, url: &str) -> MatchResult {
        MatchResult {
            index,
            fragment: fragment.to_string(),
            url: url.to_string(),
            snippet: String::new(),
            run_length: 0,
        }
    }

    #[test]
    fn lists_matches_in_order_without_dedup() {
        let html = render_html(&[
            m(3, "第二段", "https://www.google.com/search?q=b"),
            m(1, "第一段", "https://www.google.com/search?q=a"),
            m(3, "第二段", "https://www.google.com/search?q=b"),
        ]);
        let second = html.find("第二段").unwrap();
        let first = html.find("第一段").unwrap();
        assert!(second < first);
        assert_eq!(html.matches("<li>").count(), 3);
        assert!(html.contains("<meta charset=\"utf-8\">"));
    }

    #[test]
    fn escapes_fragment_text_and_urls() {
        let html = render_html(&[m(0, "<script>x</script>", "https://s.test/?q=a&b=\"c\"")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(html.contains("href=\"https://s.test/?q=a&amp;b=&quot;c&quot;\""));
    }

    #[test]
    fn empty_report_is_still_a_document() {
        let html = render_html(&[]);
        assert!(html.contains("<ul>"));
        assert!(!html.contains("<li>"));
    }

    #[test]
    fn write_html_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");
        write_html(&[m(0, "片段", "https://s.test/")], &path).unwrap();
        let s = std::fs::read_to_string(&path).unwrap();
        assert!(s.contains("片段"));
    }
}
