use std::borrow::Cow;
use std::fmt::Write as _;

/// Cells wider than this are cut and marked with an ellipsis.
pub const MAX_CELL_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    render_aligned(headers, rows, &[])
}

/// Renders a plain-text table. Columns without an entry in `aligns` are
/// left-aligned.
pub fn render_aligned(headers: &[String], rows: &[Vec<String>], aligns: &[Align]) -> String {
    let column_count = headers.len();
    let header_cells = headers.iter().map(|h| clip(h)).collect::<Vec<_>>();
    let body = rows
        .iter()
        .map(|row| row.iter().take(column_count).map(|c| clip(c)).collect::<Vec<_>>())
        .collect::<Vec<_>>();

    let mut widths = header_cells
        .iter()
        .map(|h| display_width(h))
        .collect::<Vec<_>>();
    for row in &body {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&header_cells, &widths, &[]));

    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<usize>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &separator_widths, &[]));

    for row in &body {
        let _ = writeln!(output, "{}", format_row(row, &widths, aligns));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    let rendered = render_table(headers, rows);
    print!("{rendered}");
}

fn format_row(values: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        let Some(width) = widths.get(idx).copied() else {
            break;
        };
        let padding = " ".repeat(width.saturating_sub(display_width(value)));
        let cell = match aligns.get(idx).copied().unwrap_or(Align::Left) {
            Align::Left => format!("{value}{padding}"),
            Align::Right => format!("{padding}{value}"),
        };
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn clip(value: &str) -> String {
    let sanitized = sanitize_cell(value);
    if display_width(&sanitized) <= MAX_CELL_WIDTH {
        return sanitized.into_owned();
    }
    let mut clipped = sanitized
        .chars()
        .take(MAX_CELL_WIDTH - 1)
        .collect::<String>();
    clipped.push('…');
    clipped
}

/// Visible width: ANSI escape sequences (e.g. `\x1b[31m`) take no columns.
fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            value
                .chars()
                .map(|ch| match ch {
                    '\n' | '\r' | '\t' => ' ',
                    other => other,
                })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}
