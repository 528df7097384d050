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

//! Report export in JSON, CSV, XLSX and PDF

mod csv_export;
mod pdf;
mod xlsx;

#[cfg(test)]
mod tests;

use crate::error::{CoreError, CoreResult};
use crate::reports::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(CoreError::validation(format!("Unsupported export format '{}'. Must be one of: json, csv, xlsx, pdf", other))),
        }
    }
}

/// A rendered export ready to be downloaded or written to disk
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportFile {
    pub fn write_to(&self, dir: impl AsRef<Path>) -> CoreResult<std::path::PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Rendering settings shared by every export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// TrueType font embedded in PDF exports. Without one, Latin-1 reports
    /// use Helvetica and other text is set in an installed font covering it.
    pub pdf_font: Option<PathBuf>,
}

/// Render a report in the given format with default options
pub fn render(report: &Report, format: ExportFormat) -> CoreResult<ExportFile> {
    render_with(report, format, &ExportOptions::default())
}

pub fn render_with(report: &Report, format: ExportFormat, options: &ExportOptions) -> CoreResult<ExportFile> {
    let bytes = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(report).map_err(|e| CoreError::Export {
            message: format!("JSON export failed: {}", e),
        })?,
        ExportFormat::Csv => csv_export::render(report)?,
        ExportFormat::Xlsx => xlsx::render(report)?,
        ExportFormat::Pdf => pdf::render(report, options.pdf_font.as_deref())?,
    };

    Ok(ExportFile {
        file_name: format!("{}_{}.{}", report.kind, report.generated_at.format("%Y%m%d_%H%M%S"), format.extension()),
        content_type: format.content_type(),
        bytes,
    })
}
