// SPDX-FileCopyrightText: 2026 GSI Helmholtzzentrum f. Schwerionenforschung GmbH, Darmstadt, Germany
// SPDX-License-Identifier: LGPL-3.0-or-later

//! Slurm integration: command execution and the JSON wire format.
//!
//! - `client`: runs sinfo/squeue/scontrol with timeouts, returns raw records
//! - `raw`: serde mirror of the scheduler's JSON output

pub mod client;
pub mod raw;

pub use client::{JobQuery, NodeQuery, SlurmClient};
