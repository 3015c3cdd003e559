// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

mod chart;
mod config;
mod emitter;
mod error;
mod ident;
mod measure;
#[allow(clippy::module_inception)]
mod report;
mod sequence;
mod serializer;
mod step;
mod trait_ext;
mod unit;
mod writer;

pub use chart::*;
pub use config::*;
pub use emitter::*;
pub use error::*;
pub use ident::*;
pub use measure::*;
pub use report::*;
pub use sequence::*;
pub use serializer::*;
pub use step::*;
pub use unit::*;
pub use writer::*;

pub use crate::wsjf::CompOp;
pub use crate::wsjf::Extensions;
pub use crate::wsjf::ReportKind;
pub use crate::wsjf::StepGroup;
pub use crate::wsjf::StepStatus;

pub use serde_json::Value;
