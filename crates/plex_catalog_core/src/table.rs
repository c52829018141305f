//! ASCII table rendering for terminal output.

use unicode_width::UnicodeWidthStr;

use crate::models::{Item, Library};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// A bordered table whose title, when it fits, is embedded in the top border.
#[derive(Debug, Clone)]
pub struct AsciiTable {
    title: Option<String>,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Align>,
}

impl AsciiTable {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let header: Vec<String> = header.into_iter().map(Into::into).collect();
        let alignments = vec![Align::Left; header.len()];
        Self {
            title: None,
            header,
            rows: Vec::new(),
            alignments,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn justify(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.alignments.get_mut(column) {
            *slot = align;
        }
        self
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut row: Vec<String> = row.into_iter().map(Into::into).collect();
        row.resize(self.header.len(), String::new());
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.header.len())
            .map(|col| {
                std::iter::once(&self.header[col])
                    .chain(self.rows.iter().map(|row| &row[col]))
                    .map(|cell| cell.width())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let border = {
            let mut line = String::from("+");
            for width in &widths {
                line.push_str(&"-".repeat(width + 2));
                line.push('+');
            }
            line
        };

        let mut out = String::new();
        out.push_str(&self.top_border(&border));
        out.push('\n');
        out.push_str(&self.render_row(&self.header, &widths));
        out.push('\n');
        out.push_str(&border);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.render_row(row, &widths));
            out.push('\n');
        }
        if !self.rows.is_empty() {
            out.push_str(&border);
            out.push('\n');
        }
        out
    }

    fn top_border(&self, border: &str) -> String {
        match &self.title {
            // Border is pure ASCII, so display width equals byte offset.
            Some(title) if title.width() + 2 <= border.len() => {
                format!("+{}{}", title, &border[1 + title.width()..])
            }
            _ => border.to_string(),
        }
    }

    fn render_row(&self, row: &[String], widths: &[usize]) -> String {
        let mut line = String::from("|");
        for ((cell, width), align) in row.iter().zip(widths).zip(&self.alignments) {
            let pad = width.saturating_sub(cell.width());
            let (left, right) = match align {
                Align::Left => (0, pad),
                Align::Right => (pad, 0),
                Align::Center => (pad / 2, pad - pad / 2),
            };
            line.push(' ');
            line.push_str(&" ".repeat(left));
            line.push_str(cell);
            line.push_str(&" ".repeat(right));
            line.push_str(" |");
        }
        line
    }
}

pub fn libraries_table(libraries: &[Library]) -> AsciiTable {
    let mut table = AsciiTable::new(["Key", "Title", "Type", "Total Items"])
        .title("Plex Libraries")
        .justify(0, Align::Center)
        .justify(3, Align::Right);
    for library in libraries {
        table.push_row([
            library.key.clone(),
            library.title.clone(),
            library.kind.to_string(),
            library.item_count.to_string(),
        ]);
    }
    table
}

pub fn items_table(items: &[Item]) -> AsciiTable {
    let mut table = AsciiTable::new(["#", "Title", "Year"])
        .title("Library Items")
        .justify(0, Align::Center)
        .justify(2, Align::Center);
    for (index, item) in items.iter().enumerate() {
        table.push_row([
            (index + 1).to_string(),
            item.title.clone(),
            item.year
                .filter(|year| *year > 0)
                .map(|year| year.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
        ]);
    }
    table
}

pub fn render_libraries_table(libraries: &[Library]) -> String {
    libraries_table(libraries).render()
}

pub fn render_items_table(items: &[Item]) -> String {
    let mut out = items_table(items).render();
    out.push_str(&format!("\nTotal items: {}", items.len()));
    out
}
