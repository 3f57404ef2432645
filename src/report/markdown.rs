//! Minimal Markdown document builder.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Heading(usize, String),
    Paragraph(String),
    Bullets(Vec<String>),
    Table(Vec<String>, Vec<Vec<String>>),
}

/// A Markdown document assembled block by block.
///
/// ```rust
/// use dataprobe::report::MarkdownDoc;
///
/// let doc = MarkdownDoc::new("Sales")
///     .paragraph("Daily totals.")
///     .table(["Item", "Amount"], vec![vec!["a|b".to_string(), "1".to_string()]]);
/// let text = doc.render();
/// assert!(text.starts_with("# Sales\n"));
/// assert!(text.contains("| a\\|b | 1 |"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownDoc {
    blocks: Vec<Block>,
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\n', '\r'], " ")
}

impl MarkdownDoc {
    /// Document starting with a level-1 `title`.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            blocks: vec![Block::Heading(1, title.into())],
        }
    }

    /// Append a heading; `level` is clamped to 1..=6.
    pub fn heading(mut self, level: usize, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Heading(level.clamp(1, 6), text.into()));
        self
    }

    /// Append a paragraph.
    pub fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Paragraph(text.into()));
        self
    }

    /// Append a bullet list. Empty lists are skipped.
    pub fn bullets<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        if !items.is_empty() {
            self.blocks.push(Block::Bullets(items));
        }
        self
    }

    /// Append a table. Rows shorter than the header are padded.
    pub fn table<H, S>(mut self, headers: H, rows: Vec<Vec<String>>) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        self.blocks.push(Block::Table(headers, rows));
        self
    }

    /// Render to Markdown text.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MarkdownDoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match block {
                Block::Heading(level, text) => writeln!(f, "{} {}", "#".repeat(*level), text)?,
                Block::Paragraph(text) => writeln!(f, "{text}")?,
                Block::Bullets(items) => {
                    for item in items {
                        writeln!(f, "- {item}")?;
                    }
                },
                Block::Table(headers, rows) => {
                    let width = headers.len();
                    let cells: Vec<String> = headers.iter().map(|h| escape_cell(h)).collect();
                    writeln!(f, "| {} |", cells.join(" | "))?;
                    writeln!(f, "|{}", "---|".repeat(width))?;
                    for row in rows {
                        let mut cells: Vec<String> =
                            row.iter().take(width).map(|c| escape_cell(c)).collect();
                        cells.resize(width, String::new());
                        writeln!(f, "| {} |", cells.join(" | "))?;
                    }
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_blocks_in_order() {
        let doc = MarkdownDoc::new("Report")
            .heading(2, "Summary")
            .bullets(["one", "two"])
            .bullets(Vec::<String>::new())
            .table(["A", "B"], vec![vec!["1".into()], vec!["x\ny".into(), "2".into(), "extra".into()]]);
        let expected = "# Report\n\n## Summary\n\n- one\n- two\n\n| A | B |\n|---|---|\n| 1 |  |\n| x y | 2 |\n";
        assert_eq!(doc.render(), expected);
    }

    #[test]
    fn heading_level_is_clamped() {
        let doc = MarkdownDoc::new("t").heading(9, "deep");
        assert!(doc.render().contains("\n###### deep\n"));
    }
}
