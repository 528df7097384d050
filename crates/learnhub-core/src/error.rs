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

//! Error types for the LMS domain layer

use thiserror::Error;

/// Errors raised by catalog, enrollment, progress and reporting services
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Prerequisites not met: {}", missing.join(", "))]
    PrerequisitesNotMet { missing: Vec<String> },

    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Export error: {message}")]
    Export { message: String },
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound { entity, id: id.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        CoreError::Conflict { message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation { message: message.into() }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Storage {
            message: format!("Failed to (de)serialize snapshot: {}", err),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Storage { message: err.to_string() }
    }
}

impl From<csv::Error> for CoreError {
    fn from(err: csv::Error) -> Self {
        CoreError::Export {
            message: format!("CSV export failed: {}", err),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for CoreError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        CoreError::Export {
            message: format!("XLSX export failed: {}", err),
        }
    }
}

/// Result type for domain operations
pub type CoreResult<T> = Result<T, CoreError>;
