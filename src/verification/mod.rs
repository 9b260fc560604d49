// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Verification
//!
//! - `rejection` - error taxonomy and its public (collapsed) view
//! - `clock` - time source
//! - `checks` - the individual pipeline checks
//! - `pipeline` - ordered, fail-fast composition
//! - `verifier` - entry point producing a [`Verdict`]

pub mod checks;
pub mod clock;
pub mod pipeline;
pub mod rejection;
pub mod verifier;

pub use checks::{Check, CheckInput};
pub use clock::{Clock, FixedClock, SystemClock};
pub use pipeline::Pipeline;
pub use rejection::{BusinessRule, ErrorKind, Rejection, TimestampIssue};
pub use verifier::{Submission, Verdict, Verifier};
