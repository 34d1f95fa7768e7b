//! Rendering helpers shared by presenters: tables, stat trees, and the
//! HTML → markdown / plain-text conversions.

use llmctx_core::FileNode;
use scraper::{ElementRef, Html};

/// Render a markdown table. Cell pipes are escaped.
pub fn markdown_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let escape = |cell: &str| cell.replace('|', "\\|");
    let mut out = String::new();

    if !headers.is_empty() {
        out.push_str("| ");
        out.push_str(&headers.iter().map(|h| escape(h)).collect::<Vec<_>>().join(" | "));
        out.push_str(" |\n|");
        out.push_str(&" --- |".repeat(headers.len()));
        out.push('\n');
    }
    for row in rows {
        out.push_str("| ");
        out.push_str(&row.iter().map(|c| escape(c)).collect::<Vec<_>>().join(" | "));
        out.push_str(" |\n");
    }
    out
}

/// Render a column-aligned plain-text table.
pub fn plain_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let columns = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));
    let mut widths = vec![0usize; columns];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = widths[i].max(header.chars().count());
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let render_row = |cells: &[String]| {
        let mut line = String::new();
        for (i, &width) in widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            line.push_str(&format!("{cell:<width$}"));
            if i + 1 < widths.len() {
                line.push_str("  ");
            }
        }
        line.trim_end().to_string()
    };

    let mut out = String::new();
    if !headers.is_empty() {
        out.push_str(&render_row(headers));
        out.push('\n');
        out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (columns.saturating_sub(1))));
        out.push('\n');
    }
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

/// Render a stat tree as an ASCII tree, directories suffixed with `/`.
pub fn render_tree(node: &FileNode) -> String {
    let mut out = String::new();
    out.push_str(&node.name);
    if node.is_dir {
        out.push('/');
    }
    out.push('\n');
    render_tree_children(node, "", &mut out);
    out
}

fn render_tree_children(node: &FileNode, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (index, child) in node.children.iter().enumerate() {
        let last = index + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(&child.name);
        if child.is_dir {
            out.push('/');
        } else if child.size > 0 {
            out.push_str(&format!(" ({})", human_size(child.size)));
        }
        out.push('\n');
        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_tree_children(child, &child_prefix, out);
    }
}

/// `1536` → `1.5 KB`.
pub fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Whole-document plain text with collapsed blank runs.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    for text in document.root_element().text() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(trimmed);
        }
    }
    out
}

/// Structural HTML → markdown extraction: headings, paragraphs, lists,
/// blockquotes, code blocks and links.
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    render_block(document.root_element(), &mut out);
    collapse_blank_runs(&out)
}

fn render_block(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        let Some(el) = ElementRef::wrap(child) else {
            continue;
        };
        match el.value().name() {
            "script" | "style" | "head" | "noscript" => {}
            name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = inline_markdown(el);
                if !text.is_empty() {
                    out.push_str(&"#".repeat(level));
                    out.push(' ');
                    out.push_str(&text);
                    out.push_str("\n\n");
                }
            }
            "p" => {
                let text = inline_markdown(el);
                if !text.is_empty() {
                    out.push_str(&text);
                    out.push_str("\n\n");
                }
            }
            "ul" | "ol" => {
                for item in el.children().filter_map(ElementRef::wrap) {
                    if item.value().name() == "li" {
                        let text = inline_markdown(item);
                        if !text.is_empty() {
                            out.push_str("- ");
                            out.push_str(&text);
                            out.push('\n');
                        }
                    }
                }
                out.push('\n');
            }
            "blockquote" => {
                let text = inline_markdown(el);
                if !text.is_empty() {
                    out.push_str("> ");
                    out.push_str(&text);
                    out.push_str("\n\n");
                }
            }
            "pre" => {
                let text: String = el.text().collect();
                if !text.trim().is_empty() {
                    out.push_str("```\n");
                    out.push_str(text.trim_end());
                    out.push_str("\n```\n\n");
                }
            }
            _ => render_block(el, out),
        }
    }
}

fn inline_markdown(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    inline_children(element, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn inline_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(el) = ElementRef::wrap(child) {
            match el.value().name() {
                "a" => {
                    let label = {
                        let mut inner = String::new();
                        inline_children(el, &mut inner);
                        inner.split_whitespace().collect::<Vec<_>>().join(" ")
                    };
                    match el.value().attr("href") {
                        Some(href) if !label.is_empty() => {
                            out.push_str(&format!("[{label}]({href})"));
                        }
                        _ => out.push_str(&label),
                    }
                    out.push(' ');
                }
                "br" => out.push('\n'),
                "script" | "style" => {}
                _ => inline_children(el, out),
            }
        }
    }
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.trim().to_string()
}

/// Heading depth from a Word style name (`Heading 3` / `heading3` → 3).
pub fn heading_level(style: &str) -> Option<usize> {
    let rest = style
        .strip_prefix("Heading")
        .or_else(|| style.strip_prefix("heading"))?;
    let digits = rest.trim();
    let level: usize = digits.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

/// Line-limit a text block, appending an elision note when trimmed.
pub fn limit_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }
    let mut out = lines[..max_lines].join("\n");
    out.push_str(&format!("\n… ({} more lines)", lines.len() - max_lines));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_table() {
        let table = markdown_table(
            &["name".into(), "age".into()],
            &[vec!["ada".into(), "36".into()]],
        );
        assert_eq!(table, "| name | age |\n| --- | --- |\n| ada | 36 |\n");
    }

    #[test]
    fn test_plain_table_alignment() {
        let table = plain_table(
            &["name".into(), "n".into()],
            &[vec!["ada".into(), "1".into()], vec!["grace".into(), "2".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "name   n");
        assert_eq!(lines[2], "ada    1");
        assert_eq!(lines[3], "grace  2");
    }

    #[test]
    fn test_tree_rendering() {
        let tree = FileNode {
            name: "repo".into(),
            is_dir: true,
            children: vec![
                FileNode {
                    name: "src".into(),
                    is_dir: true,
                    children: vec![FileNode {
                        name: "lib.rs".into(),
                        size: 10,
                        ..FileNode::default()
                    }],
                    ..FileNode::default()
                },
                FileNode {
                    name: "README.md".into(),
                    size: 2048,
                    ..FileNode::default()
                },
            ],
            ..FileNode::default()
        };
        let rendered = render_tree(&tree);
        assert!(rendered.starts_with("repo/\n"));
        assert!(rendered.contains("├── src/"));
        assert!(rendered.contains("│   └── lib.rs (10 B)"));
        assert!(rendered.contains("└── README.md (2.0 KB)"));
    }

    #[test]
    fn test_html_to_markdown_structure() {
        let html = "<html><body><h2>Title</h2><p>Read <a href='https://x.test/d'>the docs</a> now.</p>\
                    <ul><li>one</li><li>two</li></ul><pre>let x = 1;</pre></body></html>";
        let md = html_to_markdown(html);
        assert!(md.contains("## Title"));
        assert!(md.contains("[the docs](https://x.test/d)"));
        assert!(md.contains("- one\n- two"));
        assert!(md.contains("```\nlet x = 1;\n```"));
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(heading_level("Heading 1"), Some(1));
        assert_eq!(heading_level("Heading3"), Some(3));
        assert_eq!(heading_level("heading 6"), Some(6));
        assert_eq!(heading_level("Heading 7"), None);
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn test_limit_lines() {
        let text = (1..=5).map(|n| n.to_string()).collect::<Vec<_>>().join("\n");
        assert_eq!(limit_lines(&text, 10), text);
        let limited = limit_lines(&text, 2);
        assert!(limited.starts_with("1\n2\n"));
        assert!(limited.contains("(3 more lines)"));
    }
}
