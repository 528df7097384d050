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

use crate::error::{CoreError, CoreResult};
use crate::reports::Report;

/// Header row of column labels followed by one record per report row
pub(super) fn render(report: &Report) -> CoreResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(report.columns.iter().map(|c| c.label.as_str()))?;
    for row in &report.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.into_inner().map_err(|e| CoreError::Export {
        message: format!("CSV export failed: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_report;

    #[test]
    fn test_quotes_fields_with_commas() {
        let text = String::from_utf8(render(&sample_report()).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Learner,Course,Progress %,Avg Score"));
        assert_eq!(lines.next(), Some("\"Lovelace, Ada\",CS101,50.0,88.5"));
        assert_eq!(lines.next(), Some("Grace Hopper,CS102,100.0,"));
        assert_eq!(lines.next(), Some("Alan Turing,CS101,0.0,70"));
    }
}
