//! Itinerary renderer
//!
//! Turns the generator's free text into display blocks, one line at a time.
//! Only a handful of line-initial conventions are recognised:
//! - `| a | b |` table rows (rows containing `---` are separators and dropped)
//! - `# `, `## `, `### ` headings
//! - `* ` / `- ` list items
//! - blank lines as spacers
//!
//! Everything else is a paragraph holding the line as written.
//!
//! Table rows stay one block per line. The renderer tracks whether it is
//! inside a table so the first row of every contiguous run is flagged as the
//! header; [`group_tables`] folds those runs into whole tables.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DisplayBlock {
    Heading { level: u8, text: String },
    ListItem { text: String },
    TableRow { cells: Vec<String>, is_header_guess: bool },
    Paragraph { text: String },
    Spacer,
}

impl DisplayBlock {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        DisplayBlock::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        DisplayBlock::ListItem { text: text.into() }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        DisplayBlock::Paragraph { text: text.into() }
    }

    pub fn table_row<I, S>(cells: I, is_header_guess: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DisplayBlock::TableRow {
            cells: cells.into_iter().map(Into::into).collect(),
            is_header_guess,
        }
    }
}

const HEADINGS: [(&str, u8); 3] = [("# ", 1), ("## ", 2), ("### ", 3)];
const LIST_MARKERS: [&str; 2] = ["* ", "- "];
const SEPARATOR_MARK: &str = "---";

/// Renders the whole text. An empty string renders to no blocks.
pub fn render_blocks(text: &str) -> Vec<DisplayBlock> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut renderer = Renderer::default();
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter_map(|line| renderer.line(line))
        .collect()
}

#[derive(Debug, Default)]
struct Renderer {
    in_table: bool,
}

impl Renderer {
    fn line(&mut self, line: &str) -> Option<DisplayBlock> {
        if let Some(cells) = table_cells(line) {
            // separators neither emit nor end the run
            if line.contains(SEPARATOR_MARK) {
                return None;
            }
            let is_header_guess = !self.in_table;
            self.in_table = true;
            return Some(DisplayBlock::TableRow {
                cells,
                is_header_guess,
            });
        }
        self.in_table = false;
        Some(classify(line))
    }
}

/// Returns the row's cells when the line is a table-row candidate: trimmed
/// form starts with `|` and at least two cells are non-empty. Empty leading
/// and trailing fragments are dropped; empty interior cells are kept so the
/// columns stay aligned.
fn table_cells(line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim();
    if !trimmed.starts_with('|') {
        return None;
    }
    let fragments: Vec<&str> = trimmed.split('|').map(str::trim).collect();
    if fragments.iter().filter(|c| !c.is_empty()).count() < 2 {
        return None;
    }
    let start = fragments.iter().position(|c| !c.is_empty())?;
    let end = fragments.iter().rposition(|c| !c.is_empty())?;
    Some(
        fragments[start..=end]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    )
}

fn classify(line: &str) -> DisplayBlock {
    for (prefix, level) in HEADINGS {
        if let Some(text) = line.strip_prefix(prefix) {
            return DisplayBlock::heading(level, text);
        }
    }
    for marker in LIST_MARKERS {
        if let Some(text) = line.strip_prefix(marker) {
            return DisplayBlock::list_item(text);
        }
    }
    if line.trim().is_empty() {
        return DisplayBlock::Spacer;
    }
    DisplayBlock::paragraph(line)
}

/// A contiguous run of table rows with every row padded to the same width.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn width(&self) -> usize {
        self.header.len()
    }

    fn normalize(&mut self) {
        let width = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0);
        self.header.resize(width, String::new());
        for row in &mut self.rows {
            row.resize(width, String::new());
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Rendered {
    Block(DisplayBlock),
    Table(Table),
}

/// Folds each run of `TableRow` blocks into one [`Table`]. A row flagged as
/// header starts a new table; a body row with no open table starts one too.
pub fn group_tables(blocks: Vec<DisplayBlock>) -> Vec<Rendered> {
    let mut out = Vec::with_capacity(blocks.len());
    let mut open: Option<Table> = None;

    for block in blocks {
        match block {
            DisplayBlock::TableRow {
                cells,
                is_header_guess,
            } => match open.as_mut() {
                Some(table) if !is_header_guess => table.rows.push(cells),
                _ => {
                    if let Some(mut table) = open.take() {
                        table.normalize();
                        out.push(Rendered::Table(table));
                    }
                    open = Some(Table {
                        header: cells,
                        rows: Vec::new(),
                    });
                }
            },
            other => {
                if let Some(mut table) = open.take() {
                    table.normalize();
                    out.push(Rendered::Table(table));
                }
                out.push(Rendered::Block(other));
            }
        }
    }
    if let Some(mut table) = open.take() {
        table.normalize();
        out.push(Rendered::Table(table));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_scenario() {
        let text = "## Day 1\n* Castle visit\n\n| Day | Km |\n| --- | --- |\n| 1 | 120 |";
        assert_eq!(
            render_blocks(text),
            vec![
                DisplayBlock::heading(2, "Day 1"),
                DisplayBlock::list_item("Castle visit"),
                DisplayBlock::Spacer,
                DisplayBlock::table_row(["Day", "Km"], true),
                DisplayBlock::table_row(["1", "120"], false),
            ]
        );
    }

    #[test]
    fn heading_level_matches_hashes() {
        let blocks = render_blocks("# One\n## Two\n### Three");
        assert_eq!(
            blocks,
            vec![
                DisplayBlock::heading(1, "One"),
                DisplayBlock::heading(2, "Two"),
                DisplayBlock::heading(3, "Three"),
            ]
        );
    }

    #[test]
    fn deeper_or_unspaced_hashes_are_paragraphs() {
        assert_eq!(
            render_blocks("#### Four"),
            vec![DisplayBlock::paragraph("#### Four")]
        );
        assert_eq!(
            render_blocks("#NoSpace"),
            vec![DisplayBlock::paragraph("#NoSpace")]
        );
        assert_eq!(
            render_blocks("  # indented"),
            vec![DisplayBlock::paragraph("  # indented")]
        );
    }

    #[test]
    fn list_markers() {
        assert_eq!(
            render_blocks("* foo\n- foo"),
            vec![DisplayBlock::list_item("foo"), DisplayBlock::list_item("foo")]
        );
        assert_eq!(
            render_blocks("*foo*"),
            vec![DisplayBlock::paragraph("*foo*")]
        );
    }

    #[test]
    fn blank_lines_are_spacers_and_paragraphs_keep_whitespace() {
        assert_eq!(
            render_blocks("   \n  Morning: coffee  "),
            vec![
                DisplayBlock::Spacer,
                DisplayBlock::paragraph("  Morning: coffee  ")
            ]
        );
    }

    #[test]
    fn empty_text_has_no_blocks() {
        assert!(render_blocks("").is_empty());
        assert_eq!(render_blocks("\n"), vec![DisplayBlock::Spacer, DisplayBlock::Spacer]);
    }

    #[test]
    fn crlf_line_endings() {
        assert_eq!(
            render_blocks("# Title\r\nText\r\n"),
            vec![
                DisplayBlock::heading(1, "Title"),
                DisplayBlock::paragraph("Text"),
                DisplayBlock::Spacer,
            ]
        );
    }

    #[test]
    fn three_cell_row_and_separator() {
        assert_eq!(
            render_blocks("| A | B | C |"),
            vec![DisplayBlock::table_row(["A", "B", "C"], true)]
        );
        assert!(render_blocks("|---|:---:|").is_empty());
    }

    #[test]
    fn single_cell_pipe_line_is_a_paragraph() {
        assert_eq!(
            render_blocks("| lonely |"),
            vec![DisplayBlock::paragraph("| lonely |")]
        );
    }

    #[test]
    fn interior_empty_cells_are_kept() {
        assert_eq!(
            render_blocks("| 1 |  | 120 |"),
            vec![DisplayBlock::table_row(["1", "", "120"], true)]
        );
    }

    #[test]
    fn table_takes_precedence_over_list_marker() {
        assert_eq!(
            render_blocks("  | - a | b |"),
            vec![DisplayBlock::table_row(["- a", "b"], true)]
        );
    }

    #[test]
    fn each_table_run_gets_its_own_header() {
        let text = "| Day | Km |\n| 1 | 120 |\nBetween tables\n| Tip | Where |\n| Fuel | Brno |";
        let headers: Vec<bool> = render_blocks(text)
            .into_iter()
            .filter_map(|b| match b {
                DisplayBlock::TableRow {
                    is_header_guess, ..
                } => Some(is_header_guess),
                _ => None,
            })
            .collect();
        assert_eq!(headers, vec![true, false, true, false]);
    }

    #[test]
    fn separator_does_not_end_a_run() {
        let blocks = render_blocks("| A | B |\n|---|---|\n| 1 | 2 |");
        assert_eq!(
            blocks,
            vec![
                DisplayBlock::table_row(["A", "B"], true),
                DisplayBlock::table_row(["1", "2"], false),
            ]
        );
    }

    #[test]
    fn grouping_pads_ragged_rows() {
        let text = "Intro\n| Den | Trasa | Km |\n| --- | --- | --- |\n| 1 | Praha - Brno |\n| 2 | Brno - Wien | 140 | note |\nOutro";
        let rendered = group_tables(render_blocks(text));
        assert_eq!(rendered.len(), 3);
        assert_eq!(
            rendered[0],
            Rendered::Block(DisplayBlock::paragraph("Intro"))
        );
        let Rendered::Table(table) = &rendered[1] else {
            panic!("expected a table, got {:?}", rendered[1]);
        };
        assert_eq!(table.width(), 4);
        assert_eq!(table.header, vec!["Den", "Trasa", "Km", ""]);
        assert_eq!(table.rows[0], vec!["1", "Praha - Brno", "", ""]);
        assert_eq!(table.rows[1], vec!["2", "Brno - Wien", "140", "note"]);
        assert_eq!(
            rendered[2],
            Rendered::Block(DisplayBlock::paragraph("Outro"))
        );
    }

    #[test]
    fn grouping_splits_adjacent_runs_on_header_flag() {
        let blocks = vec![
            DisplayBlock::table_row(["a", "b"], true),
            DisplayBlock::table_row(["c", "d"], true),
            DisplayBlock::table_row(["e", "f"], false),
        ];
        let rendered = group_tables(blocks);
        assert_eq!(rendered.len(), 2);
        let Rendered::Table(second) = &rendered[1] else {
            panic!("expected a table");
        };
        assert_eq!(second.header, vec!["c", "d"]);
        assert_eq!(second.rows, vec![vec!["e".to_string(), "f".to_string()]]);
    }

    #[test]
    fn blocks_serialize_with_type_tag() {
        let value = serde_json::to_value(DisplayBlock::table_row(["A"], true)).unwrap();
        assert_eq!(value["type"], "tableRow");
        assert_eq!(value["isHeaderGuess"], true);
    }
}
