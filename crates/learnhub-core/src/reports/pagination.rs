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

//! Page arithmetic for report listings

use super::filter::{DEFAULT_PER_PAGE, MAX_PER_PAGE};
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_rows: usize,
    pub total_pages: u32,
}

impl Pagination {
    /// Page defaults to 1 and `per_page` is clamped to `1..=MAX_PER_PAGE`.
    /// Pages past the end are kept as requested and select no rows.
    pub fn new(page: Option<u32>, per_page: Option<u32>, total_rows: usize) -> Self {
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let page = page.unwrap_or(1).max(1);
        let total_pages = total_rows.div_ceil(per_page as usize) as u32;
        Self {
            page,
            per_page,
            total_rows,
            total_pages,
        }
    }

    /// Covers every row on a single page
    pub fn single(total_rows: usize) -> Self {
        Self {
            page: 1,
            per_page: total_rows.max(1) as u32,
            total_rows,
            total_pages: u32::from(total_rows > 0),
        }
    }

    /// Index range of the current page within the full row set
    pub fn range(&self) -> Range<usize> {
        let start = (self.page as usize - 1).saturating_mul(self.per_page as usize).min(self.total_rows);
        let end = start.saturating_add(self.per_page as usize).min(self.total_rows);
        start..end
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
