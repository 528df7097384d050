// LearnHub
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Tabular report representation shared by every output format

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single typed report value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Integer(i64),
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn opt_text(value: Option<impl Into<String>>) -> Self {
        value.map_or(Cell::Empty, |v| Cell::Text(v.into()))
    }

    pub fn opt_number(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(v) => Some(*v as f64),
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Ordering used for report sorting; empty cells sort last
    pub fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Empty, Cell::Empty) => Ordering::Equal,
            (Cell::Empty, _) => Ordering::Greater,
            (_, Cell::Empty) => Ordering::Less,
            (Cell::Text(a), Cell::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.to_string().cmp(&b.to_string()),
            },
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Integer(v) => write!(f, "{}", v),
            Cell::Number(v) => write!(f, "{:.1}", v),
            Cell::Text(v) => f.write_str(v),
            Cell::Empty => Ok(()),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Stable key used for sorting and JSON output
    pub key: String,
    /// Header label
    pub label: String,
    /// Relative width hint for paged layouts
    pub width: u16,
}

impl Column {
    pub fn new(key: &str, label: &str, width: u16) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            width,
        }
    }
}

/// Title, columns and rows of a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportTable {
    pub title: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn column_index(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.key == key)
    }

    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// Stable sort by the given column
    pub fn sort_by_column(&mut self, index: usize, descending: bool) {
        self.rows.sort_by(|a, b| {
            let ordering = a[index].compare(&b[index]);
            if descending && !matches!((&a[index], &b[index]), (Cell::Empty, _) | (_, Cell::Empty)) {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cells_sort_last_in_both_directions() {
        let mut table = ReportTable {
            title: "t".to_string(),
            columns: vec![Column::new("score", "Score", 10)],
            rows: vec![vec![Cell::Empty], vec![Cell::Number(40.0)], vec![Cell::Integer(90)]],
        };

        table.sort_by_column(0, false);
        assert_eq!(table.rows[0][0], Cell::Number(40.0));
        assert_eq!(table.rows[2][0], Cell::Empty);

        table.sort_by_column(0, true);
        assert_eq!(table.rows[0][0], Cell::Integer(90));
        assert_eq!(table.rows[2][0], Cell::Empty);
    }

    #[test]
    fn test_text_compare_ignores_case() {
        assert_eq!(Cell::text("alice").compare(&Cell::text("Bob")), Ordering::Less);
    }

    #[test]
    fn test_cell_json_is_untagged() {
        let json = serde_json::to_string(&vec![Cell::Integer(3), Cell::Number(1.5), Cell::text("x"), Cell::Empty]).unwrap();
        assert_eq!(json, r#"[3,1.5,"x",null]"#);
    }
}
