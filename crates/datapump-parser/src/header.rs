//! Structural header detection.
//!
//! Line 1 is treated as the candidate header and compared column by column
//! against the rows that follow it. Columns whose values are all numeric vote
//! for a header when the candidate cell is not numeric; columns whose values
//! share one length vote for a header when the candidate cell has a different
//! length. Everything else abstains.

use crate::normalize::candle_reader;

/// Number of leading bytes the sniffer looks at.
pub const SNIFF_SAMPLE_BYTES: usize = 2048;

/// Rows after the candidate header that take part in the vote.
const MAX_SNIFF_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Numeric,
    Length(usize),
}

impl ColumnKind {
    fn of(value: &str) -> Self {
        if value.trim().parse::<f64>().is_ok() {
            ColumnKind::Numeric
        } else {
            ColumnKind::Length(value.chars().count())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Unseen,
    Kind(ColumnKind),
    Inconsistent,
}

/// Returns the sniffed sample of `content`: at most [`SNIFF_SAMPLE_BYTES`]
/// bytes, cut back to the last complete line when the file is longer.
pub fn sample(content: &str) -> &str {
    if content.len() <= SNIFF_SAMPLE_BYTES {
        return content;
    }

    let mut end = SNIFF_SAMPLE_BYTES;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &content[..end];
    match truncated.rfind('\n') {
        Some(idx) => &truncated[..idx],
        None => truncated,
    }
}

/// Whether the first line of `content` looks like a header row.
pub fn has_header(content: &str) -> bool {
    let mut reader = candle_reader(sample(content).as_bytes());
    let mut rows = reader.records().filter_map(Result::ok);

    let Some(candidate) = rows.next() else {
        return false;
    };
    let width = candidate.len();
    let mut columns = vec![Column::Unseen; width];

    for row in rows.filter(|row| row.len() == width).take(MAX_SNIFF_ROWS) {
        for (column, value) in columns.iter_mut().zip(row.iter()) {
            let kind = ColumnKind::of(value);
            *column = match *column {
                Column::Unseen => Column::Kind(kind),
                Column::Kind(seen) if seen == kind => Column::Kind(seen),
                _ => Column::Inconsistent,
            };
        }
    }

    let votes: i32 = candidate
        .iter()
        .zip(&columns)
        .map(|(cell, column)| match column {
            Column::Kind(ColumnKind::Numeric) => {
                if ColumnKind::of(cell) == ColumnKind::Numeric {
                    -1
                } else {
                    1
                }
            }
            Column::Kind(ColumnKind::Length(len)) => {
                if cell.chars().count() != *len {
                    1
                } else {
                    -1
                }
            }
            Column::Unseen | Column::Inconsistent => 0,
        })
        .sum();

    votes > 0
}
