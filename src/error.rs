// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Errors in user input that are caught before any scheduler query.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown column '{name}' (available: {available})")]
    UnknownColumn { name: String, available: String },
    #[error("no columns given")]
    NoColumns,
    #[error("empty state filter")]
    EmptyStateFilter,
    #[error("invalid state '{0}' in state filter")]
    InvalidState(String),
    #[error("the {command} command does not support {format} output")]
    UnsupportedFormat {
        command: &'static str,
        format: &'static str,
    },
}
