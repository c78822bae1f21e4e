//! Plain-text rendering of table snapshots.

use std::fmt::Write as _;

use client_core::TableSnapshot;
use shared::domain::{Post, PostField, SortOrder};

const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(snapshot: &TableSnapshot) -> String {
    let columns: Vec<PostField> = snapshot.columns().collect();
    let mut out = String::new();

    // An error stands in for the table until the next successful fetch.
    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "error: {error}");
        out.push_str("(type `refresh` to retry)\n");
        return out;
    }
    if !snapshot.view.search.is_empty() {
        let _ = writeln!(out, "search: \"{}\"", snapshot.view.search);
    }
    if columns.is_empty() {
        out.push_str("(no columns visible; use `cols` or `toggle`)\n");
        out.push_str(&footer(snapshot));
        return out;
    }

    let headers: Vec<String> = columns
        .iter()
        .map(|field| header_label(*field, snapshot))
        .collect();
    let rows: Vec<Vec<String>> = snapshot
        .data
        .iter()
        .map(|post| columns.iter().map(|field| cell(post, *field)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(index, header)| {
            rows.iter()
                .map(|row| row[index].chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    push_row(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    push_row(&mut out, &rule, &widths);
    if rows.is_empty() {
        out.push_str(if snapshot.loading { "loading...\n" } else { "no posts\n" });
    }
    for row in &rows {
        push_row(&mut out, row, &widths);
    }

    out.push_str(&footer(snapshot));
    out
}

pub fn render_post(post: &Post) -> String {
    let mut out = String::new();
    for field in PostField::ALL {
        let _ = writeln!(out, "{:>12}: {}", field.label(), post.field_text(field));
    }
    out
}

fn header_label(field: PostField, snapshot: &TableSnapshot) -> String {
    if snapshot.view.sort_by != field {
        return field.label().to_string();
    }
    let arrow = match snapshot.view.sort_order {
        SortOrder::Asc => '^',
        SortOrder::Desc => 'v',
    };
    format!("{} {arrow}", field.label())
}

fn cell(post: &Post, field: PostField) -> String {
    let text = match field {
        PostField::LastUpdated => post.last_updated.format("%Y-%m-%d %H:%M").to_string(),
        other => post.field_text(other).replace('\n', " "),
    };
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text;
    }
    let mut clipped: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    clipped.push_str("...");
    clipped
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

fn footer(snapshot: &TableSnapshot) -> String {
    let range = match snapshot.showing_range() {
        Some((first, last)) => format!("Showing {first} to {last} of {}", snapshot.total),
        None => format!("Showing 0 of {}", snapshot.total),
    };
    format!(
        "{range} | page {}/{} | {} per page{}\n",
        snapshot.view.page,
        snapshot.total_pages().max(1),
        snapshot.view.page_size,
        if snapshot.loading { " | loading" } else { "" },
    )
}
