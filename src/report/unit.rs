// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use uuid::Uuid;

use crate::report::{trait_ext::VecExt, Formatted, StepId};
use crate::wsjf;

/// Value of a misc info header entry.
#[derive(Debug, Clone, PartialEq)]
pub enum MiscValue {
    Text(String),
    Numeric(Formatted<i64>),
}

impl From<&str> for MiscValue {
    fn from(value: &str) -> Self {
        MiscValue::Text(value.to_owned())
    }
}

impl From<String> for MiscValue {
    fn from(value: String) -> Self {
        MiscValue::Text(value)
    }
}

impl From<i64> for MiscValue {
    fn from(value: i64) -> Self {
        MiscValue::Numeric(Formatted::new(value))
    }
}

/// Free-form key/value pair in the report header.
#[derive(Debug, Clone, PartialEq)]
pub struct MiscInfo {
    pub(crate) id: Option<String>,
    pub(crate) description: String,
    pub(crate) value: Option<MiscValue>,
    pub(crate) type_def: Option<String>,
    pub(crate) extensions: wsjf::Extensions,
}

impl MiscInfo {
    pub(crate) fn new(description: &str, value: MiscValue) -> Self {
        MiscInfo {
            id: None,
            description: description.to_owned(),
            value: Some(value),
            type_def: None,
            extensions: wsjf::Extensions::new(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn value(&self) -> Option<&MiscValue> {
        self.value.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(MiscValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn numeric(&self) -> Option<i64> {
        match &self.value {
            Some(MiscValue::Numeric(num)) => Some(num.value),
            _ => None,
        }
    }

    pub(crate) fn to_wsjf(&self) -> wsjf::MiscInfo {
        let (text, numeric, numeric_format) = match &self.value {
            Some(MiscValue::Text(text)) => (Some(text.clone()), None, None),
            Some(MiscValue::Numeric(num)) => (None, Some(num.value), num.format.clone()),
            None => (None, None, None),
        };

        wsjf::MiscInfo {
            id: self.id.clone(),
            description: self.description.clone(),
            text,
            numeric,
            type_def: self.type_def.clone(),
            numeric_format,
            extensions: self.extensions.clone(),
        }
    }

    /// Text wins when a payload carries both a text and a numeric value.
    pub(crate) fn from_wsjf(wire: wsjf::MiscInfo) -> Self {
        let value = match (wire.text, wire.numeric) {
            (Some(text), _) => Some(MiscValue::Text(text)),
            (None, Some(num)) => Some(MiscValue::Numeric(Formatted {
                value: num,
                format: wire.numeric_format,
            })),
            (None, None) => None,
        };

        MiscInfo {
            id: wire.id,
            description: wire.description,
            value,
            type_def: wire.type_def,
            extensions: wire.extensions,
        }
    }
}

/// A failure found on a unit during repair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Failure {
    pub category: String,
    pub code: String,
    pub comment: Option<String>,
    /// Reference designator of the failed component, e.g. "R12".
    pub component_ref: Option<String>,
    pub func_block: Option<String>,
    /// Step of the referenced test report that found the failure.
    pub ref_step_id: Option<StepId>,
    pub ref_step_name: Option<String>,
    pub art_number: Option<String>,
    pub art_rev: Option<String>,
    pub art_vendor: Option<String>,
    pub art_description: Option<String>,
    pub(crate) extensions: wsjf::Extensions,
}

impl Failure {
    pub fn new(category: &str, code: &str) -> Self {
        Failure {
            category: category.to_owned(),
            code: code.to_owned(),
            ..Default::default()
        }
    }

    pub(crate) fn to_wsjf(&self) -> wsjf::Failure {
        wsjf::Failure {
            category: self.category.clone(),
            code: self.code.clone(),
            comment: self.comment.clone(),
            com_ref: self.component_ref.clone(),
            func_block: self.func_block.clone(),
            ref_step_id: self.ref_step_id,
            ref_step_name: self.ref_step_name.clone(),
            art_number: self.art_number.clone(),
            art_rev: self.art_rev.clone(),
            art_vendor: self.art_vendor.clone(),
            art_description: self.art_description.clone(),
            extensions: self.extensions.clone(),
        }
    }

    pub(crate) fn from_wsjf(wire: wsjf::Failure) -> Self {
        Failure {
            category: wire.category,
            code: wire.code,
            comment: wire.comment,
            component_ref: wire.com_ref,
            func_block: wire.func_block,
            ref_step_id: wire.ref_step_id,
            ref_step_name: wire.ref_step_name,
            art_number: wire.art_number,
            art_rev: wire.art_rev,
            art_vendor: wire.art_vendor,
            art_description: wire.art_description,
            extensions: wire.extensions,
        }
    }
}

/// A component unit (board, module, ...) mounted in the unit under test.
///
/// In repair reports the unit with `idx` 0 is the repaired unit itself and
/// every unit may carry the failures found on it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubUnit {
    pub part_type: Option<String>,
    pub pn: String,
    pub sn: String,
    pub rev: Option<String>,
    pub idx: Option<i64>,
    pub parent_idx: Option<i64>,
    pub position: Option<i64>,
    /// `idx` of the unit that replaced this one.
    pub replaced_idx: Option<i64>,
    pub(crate) failures: Vec<Failure>,
    pub(crate) extensions: wsjf::Extensions,
}

impl SubUnit {
    pub fn new(part_type: &str, sn: &str, pn: &str, rev: &str) -> Self {
        SubUnit {
            part_type: Some(part_type.to_owned()),
            pn: pn.to_owned(),
            sn: sn.to_owned(),
            rev: Some(rev.to_owned()),
            ..Default::default()
        }
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn add_failure(&mut self, failure: Failure) -> &mut Failure {
        let pos = self.failures.len();
        self.failures.push(failure);
        &mut self.failures[pos]
    }

    pub(crate) fn to_wsjf(&self) -> wsjf::SubUnit {
        wsjf::SubUnit {
            part_type: self.part_type.clone(),
            pn: self.pn.clone(),
            sn: self.sn.clone(),
            rev: self.rev.clone(),
            idx: self.idx,
            parent_idx: self.parent_idx,
            position: self.position,
            replaced_idx: self.replaced_idx,
            failures: self.failures.map_option(Failure::to_wsjf),
            extensions: self.extensions.clone(),
        }
    }

    pub(crate) fn from_wsjf(wire: wsjf::SubUnit) -> Self {
        SubUnit {
            part_type: wire.part_type,
            pn: wire.pn,
            sn: wire.sn,
            rev: wire.rev,
            idx: wire.idx,
            parent_idx: wire.parent_idx,
            position: wire.position,
            replaced_idx: wire.replaced_idx,
            failures: wire
                .failures
                .unwrap_or_default()
                .into_iter()
                .map(Failure::from_wsjf)
                .collect(),
            extensions: wire.extensions,
        }
    }
}

/// Test (UUT) specific header block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UutDetail {
    pub operator: Option<String>,
    pub comment: Option<String>,
    /// Execution time in seconds.
    pub exec_time: Option<Formatted<f64>>,
    pub fixture_id: Option<String>,
    pub(crate) extensions: wsjf::Extensions,
}

impl UutDetail {
    pub(crate) fn to_wsjf(&self) -> wsjf::UutInfo {
        wsjf::UutInfo {
            user: self.operator.clone(),
            comment: self.comment.clone(),
            exec_time: self.exec_time.as_ref().map(|t| t.value),
            exec_time_format: self.exec_time.as_ref().and_then(|t| t.format.clone()),
            fixture_id: self.fixture_id.clone(),
            extensions: self.extensions.clone(),
        }
    }

    pub(crate) fn from_wsjf(wire: wsjf::UutInfo) -> Self {
        UutDetail {
            operator: wire.user,
            comment: wire.comment,
            exec_time: wire.exec_time.map(|value| Formatted {
                value,
                format: wire.exec_time_format,
            }),
            fixture_id: wire.fixture_id,
            extensions: wire.extensions,
        }
    }
}

/// Repair (UUR) specific header block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UurDetail {
    pub operator: Option<String>,
    pub comment: Option<String>,
    pub exec_time: Option<Formatted<f64>>,
    /// Id of the test report that sent the unit to repair.
    pub ref_uut: Option<String>,
    pub confirm_date: Option<String>,
    pub finalize_date: Option<String>,
    /// Test operation that sent the unit to repair.
    pub test_operation_code: Option<i64>,
    pub test_operation_name: Option<String>,
    pub test_operation_guid: Option<Uuid>,
    pub(crate) extensions: wsjf::Extensions,
}

impl UurDetail {
    pub(crate) fn to_wsjf(&self) -> wsjf::UurInfo {
        wsjf::UurInfo {
            user: self.operator.clone(),
            comment: self.comment.clone(),
            exec_time: self.exec_time.as_ref().map(|t| t.value),
            exec_time_format: self.exec_time.as_ref().and_then(|t| t.format.clone()),
            ref_uut: self.ref_uut.clone(),
            confirm_date: self.confirm_date.clone(),
            finalize_date: self.finalize_date.clone(),
            test_operation_code: self.test_operation_code,
            test_operation_name: self.test_operation_name.clone(),
            test_operation_guid: self.test_operation_guid,
            extensions: self.extensions.clone(),
        }
    }

    pub(crate) fn from_wsjf(wire: wsjf::UurInfo) -> Self {
        UurDetail {
            operator: wire.user,
            comment: wire.comment,
            exec_time: wire.exec_time.map(|value| Formatted {
                value,
                format: wire.exec_time_format,
            }),
            ref_uut: wire.ref_uut,
            confirm_date: wire.confirm_date,
            finalize_date: wire.finalize_date,
            test_operation_code: wire.test_operation_code,
            test_operation_name: wire.test_operation_name,
            test_operation_guid: wire.test_operation_guid,
            extensions: wire.extensions,
        }
    }
}
