//! Plain-terminal rendering of plans, link cards and history.
//!
//! Everything here returns a `String` so the command layer decides where it
//! goes. Colours come from `colored` and honour `NO_COLOR`.

use chrono::Local;
use colored::Colorize;
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

use crate::history::History;
use crate::links::{LinkCard, link_cards};
use crate::render::{DisplayBlock, Rendered, Table, group_tables, render_blocks};
use crate::types::{LinkKind, Plan};

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold pattern"));

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Text with its `**bold**` spans styled.
fn inline(text: &str) -> String {
    BOLD.replace_all(text, |caps: &regex::Captures<'_>| caps[1].bold().to_string())
        .into_owned()
}

/// Text with the bold markers removed, for width calculations.
fn plain(text: &str) -> String {
    BOLD.replace_all(text, "$1").into_owned()
}

fn pad(text: &str, width: usize) -> String {
    let used = plain(text).chars().count();
    format!("{}{}", inline(text), " ".repeat(width.saturating_sub(used)))
}

fn format_table(out: &mut String, table: &Table) {
    let mut widths = vec![0usize; table.width()];
    for row in std::iter::once(&table.header).chain(&table.rows) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(plain(cell).chars().count());
        }
    }

    let header: Vec<String> = table
        .header
        .iter()
        .zip(&widths)
        .map(|(cell, w)| pad(cell, *w).bold().to_string())
        .collect();
    let _ = writeln!(out, "  {}", header.join(" │ "));
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    let _ = writeln!(out, "  {}", rule.join("─┼─").dimmed());
    for row in &table.rows {
        let cells: Vec<String> = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).collect();
        let _ = writeln!(out, "  {}", cells.join(" │ ").trim_end());
    }
}

fn format_block(out: &mut String, block: &DisplayBlock) {
    match block {
        DisplayBlock::Heading { level: 1, text } => {
            let _ = writeln!(out, "{}", plain(text).bold().underline());
        }
        DisplayBlock::Heading { level: 2, text } => {
            let _ = writeln!(out, "{}", plain(text).bold().cyan());
        }
        DisplayBlock::Heading { text, .. } => {
            let _ = writeln!(out, "{}", plain(text).bold());
        }
        DisplayBlock::ListItem { text } => {
            let _ = writeln!(out, "  • {}", inline(text));
        }
        DisplayBlock::Paragraph { text } => {
            let _ = writeln!(out, "{}", inline(text));
        }
        DisplayBlock::Spacer => out.push('\n'),
        // grouped into tables before we get here
        DisplayBlock::TableRow { cells, .. } => {
            let _ = writeln!(out, "  {}", cells.join(" │ "));
        }
    }
}

pub fn format_blocks(blocks: Vec<DisplayBlock>) -> String {
    let mut out = String::new();
    for item in group_tables(blocks) {
        match item {
            Rendered::Block(block) => format_block(&mut out, &block),
            Rendered::Table(table) => format_table(&mut out, &table),
        }
    }
    out
}

pub fn format_links(cards: &[LinkCard]) -> String {
    if cards.is_empty() {
        return String::new();
    }
    let mut out = format!("{}\n", "Sources".bold().cyan());
    for card in cards {
        let tag = match card.kind {
            LinkKind::Web => "[web] ".blue(),
            LinkKind::Maps => "[maps]".green(),
        };
        let _ = writeln!(out, "  {tag} {}", card.display_title);
        let _ = writeln!(out, "         {}", card.href.dimmed());
    }
    out
}

fn summary(plan: &Plan) -> String {
    match &plan.request {
        Some(request) => format!(
            "{} days · {} · {}",
            request.days,
            request.travelers.label(),
            request.style.label()
        ),
        None => "shared plan".to_string(),
    }
}

pub fn format_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", plan.title().bold().yellow());
    let created = plan.created_at.with_timezone(&Local).format(DATE_FORMAT);
    let _ = writeln!(out, "{}", format!("{} · {created}", summary(plan)).dimmed());
    if let Some(request) = plan.request.as_ref().filter(|r| !r.interests.is_empty()) {
        let _ = writeln!(out, "{}", request.interests.join(", ").dimmed());
    }
    out.push('\n');
    out.push_str(&format_blocks(render_blocks(&plan.content)));

    let links = format_links(&link_cards(&plan.links));
    if !links.is_empty() {
        out.push('\n');
        out.push_str(&links);
    }
    out
}

pub fn format_history(history: &History) -> String {
    if history.is_empty() {
        return "No saved trips yet.\n".to_string();
    }
    let mut out = String::new();
    for (i, plan) in history.iter().enumerate() {
        let created = plan.created_at.with_timezone(&Local).format(DATE_FORMAT);
        let days = plan
            .days()
            .map(|d| format!("{d} days"))
            .unwrap_or_else(|| "shared".to_string());
        let _ = writeln!(
            out,
            "{:>2}. {}  {}  {}",
            i + 1,
            plan.title().bold(),
            format!("{days} · {created}").dimmed(),
            plan.id.dimmed()
        );
    }
    out
}
