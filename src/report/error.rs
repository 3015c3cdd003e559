// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::io;

use thiserror::Error;
use uuid::Uuid;

use crate::report::MeasurementMode;

/// Library wide error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WsjfError {
    /// A measurement was added in the wrong mode, e.g. a named measurement
    /// on a step that already holds a single unnamed one.
    #[error("step '{step}' is in {current:?} mode, cannot add a {attempted:?} measurement")]
    ModeConflict {
        step: String,
        attempted: MeasurementMode,
        current: MeasurementMode,
    },

    #[error("invalid comparison operator '{op}': {context}")]
    InvalidOperator { op: String, context: String },

    /// Only ever reported as a decode warning; the measurement is kept with
    /// status `Unknown`.
    #[error("step {step} measurement {index} has unknown comparison operator '{raw}'")]
    UnknownOperator { step: u64, index: usize, raw: String },

    #[error("comparison operator {op} requires the {bound} limit")]
    MissingLimit { op: String, bound: &'static str },

    /// The step type names a kind with its own constructor, e.g.
    /// "SequenceCall" or "ET_NLT".
    #[error("step type '{0}' is reserved, use its dedicated add_* method")]
    ReservedStepType(String),

    #[error("payload does not follow the report schema: {0}")]
    SchemaViolation(String),

    #[error("failed to format report json")]
    Format(#[from] serde_json::Error),

    #[error("failed to write to output stream")]
    IoError(#[from] io::Error),

    #[error("no report stored with id {0}")]
    NotFound(Uuid),
}
