// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::report as tr;

mod rfc3339_local {
    use chrono::{DateTime, FixedOffset, SecondsFormat};
    use serde::Deserialize;

    pub fn serialize<S>(date: &Option<DateTime<FixedOffset>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod rfc3339_utc {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::Deserialize;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

/// Unknown wire fields, kept verbatim so a decoded payload encodes back unchanged.
pub type Extensions = BTreeMap<String, tr::Value>;

/// Execution status of a step or measurement.
/// Written as the single letter codes used by the report service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum StepStatus {
    #[default]
    Passed,
    Failed,
    Done,
    Skipped,
    Error,
    Terminated,
    Unknown,
}

impl StepStatus {
    pub fn code(&self) -> &'static str {
        match self {
            StepStatus::Passed => "P",
            StepStatus::Failed => "F",
            StepStatus::Done => "D",
            StepStatus::Skipped => "S",
            StepStatus::Error => "E",
            StepStatus::Terminated => "T",
            StepStatus::Unknown => "U",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            StepStatus::Failed | StepStatus::Error | StepStatus::Terminated
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for StepStatus {
    type Err = tr::WsjfError;

    /// Accepts the letter code, the full name and the aliases operators
    /// commonly type by hand ("ok", "ng", "abort", ...), in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().as_str() {
            "p" | "pass" | "passed" | "ok" | "success" | "successful" => StepStatus::Passed,
            "f" | "fail" | "failed" | "failure" | "ng" => StepStatus::Failed,
            "d" | "done" | "complete" | "completed" => StepStatus::Done,
            "s" | "skip" | "skipped" => StepStatus::Skipped,
            "e" | "err" | "error" => StepStatus::Error,
            "t" | "term" | "terminated" | "abort" | "aborted" => StepStatus::Terminated,
            "u" | "unknown" => StepStatus::Unknown,
            _ => {
                return Err(tr::WsjfError::SchemaViolation(format!(
                    "unrecognized status '{s}'"
                )))
            }
        };
        Ok(status)
    }
}

/// Comparison operator applied between a measured value and its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CompOp {
    Log,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    GtLt,
    GtLe,
    GeLt,
    GeLe,
    LtGt,
    LtGe,
    LeGt,
    LeGe,
    IgnoreCase,
    CaseSensitive,
}

impl CompOp {
    pub fn code(&self) -> &'static str {
        match self {
            CompOp::Log => "LOG",
            CompOp::Eq => "EQ",
            CompOp::Ne => "NE",
            CompOp::Gt => "GT",
            CompOp::Ge => "GE",
            CompOp::Lt => "LT",
            CompOp::Le => "LE",
            CompOp::GtLt => "GTLT",
            CompOp::GtLe => "GTLE",
            CompOp::GeLt => "GELT",
            CompOp::GeLe => "GELE",
            CompOp::LtGt => "LTGT",
            CompOp::LtGe => "LTGE",
            CompOp::LeGt => "LEGT",
            CompOp::LeGe => "LEGE",
            CompOp::IgnoreCase => "IGNORECASE",
            CompOp::CaseSensitive => "CASESENSIT",
        }
    }

    /// Which limits the operator reads, as `(low_required, high_required)`.
    pub fn limit_requirement(&self) -> (bool, bool) {
        match self {
            CompOp::Log => (false, false),
            CompOp::Eq
            | CompOp::Ne
            | CompOp::Gt
            | CompOp::Ge
            | CompOp::Lt
            | CompOp::Le
            | CompOp::IgnoreCase
            | CompOp::CaseSensitive => (true, false),
            _ => (true, true),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, CompOp::IgnoreCase | CompOp::CaseSensitive)
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            CompOp::Log | CompOp::Eq | CompOp::Ne | CompOp::IgnoreCase | CompOp::CaseSensitive
        )
    }
}

impl fmt::Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CompOp {
    type Err = tr::WsjfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_uppercase().as_str() {
            "LOG" => CompOp::Log,
            "EQ" => CompOp::Eq,
            "NE" => CompOp::Ne,
            "GT" => CompOp::Gt,
            "GE" => CompOp::Ge,
            "LT" => CompOp::Lt,
            "LE" => CompOp::Le,
            "GTLT" => CompOp::GtLt,
            "GTLE" => CompOp::GtLe,
            "GELT" => CompOp::GeLt,
            "GELE" => CompOp::GeLe,
            "LTGT" => CompOp::LtGt,
            "LTGE" => CompOp::LtGe,
            "LEGT" => CompOp::LeGt,
            "LEGE" => CompOp::LeGe,
            "IGNORECASE" => CompOp::IgnoreCase,
            "CASESENSIT" | "CASESENSITIVE" => CompOp::CaseSensitive,
            _ => {
                return Err(tr::WsjfError::InvalidOperator {
                    op: s.to_owned(),
                    context: "unrecognized comparison operator".to_owned(),
                })
            }
        };
        Ok(op)
    }
}

/// Step group inside a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepGroup {
    Setup,
    #[default]
    Main,
    Cleanup,
}

impl StepGroup {
    pub fn code(&self) -> &'static str {
        match self {
            StepGroup::Setup => "S",
            StepGroup::Main => "M",
            StepGroup::Cleanup => "C",
        }
    }
}

impl FromStr for StepGroup {
    type Err = tr::WsjfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" | "SETUP" => Ok(StepGroup::Setup),
            "M" | "MAIN" => Ok(StepGroup::Main),
            "C" | "CLEANUP" => Ok(StepGroup::Cleanup),
            _ => Err(tr::WsjfError::SchemaViolation(format!(
                "unrecognized step group '{s}'"
            ))),
        }
    }
}

/// Report kind discriminator: a test (UUT) or a repair (UUR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Test,
    Repair,
}

impl ReportKind {
    pub fn code(&self) -> &'static str {
        match self {
            ReportKind::Test => "T",
            ReportKind::Repair => "R",
        }
    }
}

impl FromStr for ReportKind {
    type Err = tr::WsjfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "T" | "t" => Ok(ReportKind::Test),
            "R" | "r" => Ok(ReportKind::Repair),
            _ => Err(tr::WsjfError::SchemaViolation(format!(
                "unrecognized report type '{s}'"
            ))),
        }
    }
}

/// Low-level model for a whole WSJF report (header plus root sequence).
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Report {
    #[serde(rename = "type")]
    pub report_type: Option<String>,

    #[serde(rename = "id")]
    pub id: Option<String>,

    #[serde(rename = "pn")]
    pub pn: Option<String>,

    #[serde(rename = "sn")]
    pub sn: Option<String>,

    #[serde(rename = "rev")]
    pub rev: Option<String>,

    #[serde(rename = "productName")]
    pub product_name: Option<String>,

    #[serde(rename = "processCode")]
    pub process_code: Option<i64>,

    #[serde(rename = "processCodeFormat")]
    pub process_code_format: Option<String>,

    #[serde(rename = "processName")]
    pub process_name: Option<String>,

    #[serde(rename = "result")]
    pub result: Option<String>,

    #[serde(rename = "machineName")]
    pub machine_name: Option<String>,

    #[serde(rename = "location")]
    pub location: Option<String>,

    #[serde(rename = "purpose")]
    pub purpose: Option<String>,

    #[serde(rename = "origin")]
    pub origin: Option<String>,

    #[serde(default, rename = "start", with = "rfc3339_local")]
    pub start: Option<DateTime<FixedOffset>>,

    #[serde(default, rename = "startUTC", with = "rfc3339_utc")]
    pub start_utc: Option<DateTime<Utc>>,

    #[serde(rename = "miscInfos")]
    pub misc_infos: Option<Vec<MiscInfo>>,

    #[serde(rename = "subUnits")]
    pub sub_units: Option<Vec<SubUnit>>,

    #[serde(rename = "uut")]
    pub uut: Option<UutInfo>,

    #[serde(rename = "uur")]
    pub uur: Option<UurInfo>,

    #[serde(rename = "root")]
    pub root: Option<Step>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Free-form key/value header entry.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MiscInfo {
    #[serde(rename = "id")]
    pub id: Option<String>,

    #[serde(rename = "description")]
    pub description: String,

    #[serde(rename = "text")]
    pub text: Option<String>,

    #[serde(rename = "numeric")]
    pub numeric: Option<i64>,

    #[serde(rename = "typedef")]
    pub type_def: Option<String>,

    #[serde(rename = "numericFormat")]
    pub numeric_format: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A component unit mounted in the unit under test.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SubUnit {
    #[serde(rename = "partType")]
    pub part_type: Option<String>,

    #[serde(rename = "pn")]
    pub pn: String,

    #[serde(rename = "sn")]
    pub sn: String,

    #[serde(rename = "rev")]
    pub rev: Option<String>,

    #[serde(rename = "idx")]
    pub idx: Option<i64>,

    #[serde(rename = "parentIdx")]
    pub parent_idx: Option<i64>,

    #[serde(rename = "position")]
    pub position: Option<i64>,

    #[serde(rename = "replacedIdx")]
    pub replaced_idx: Option<i64>,

    #[serde(rename = "failures")]
    pub failures: Option<Vec<Failure>>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A failure found on a unit during repair.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Failure {
    #[serde(rename = "category")]
    pub category: String,

    #[serde(rename = "code")]
    pub code: String,

    #[serde(rename = "comment")]
    pub comment: Option<String>,

    #[serde(rename = "comRef")]
    pub com_ref: Option<String>,

    #[serde(rename = "funcBlock")]
    pub func_block: Option<String>,

    #[serde(rename = "refStepId")]
    pub ref_step_id: Option<u64>,

    #[serde(rename = "refStepName")]
    pub ref_step_name: Option<String>,

    #[serde(rename = "artNumber")]
    pub art_number: Option<String>,

    #[serde(rename = "artRev")]
    pub art_rev: Option<String>,

    #[serde(rename = "artVendor")]
    pub art_vendor: Option<String>,

    #[serde(rename = "artDescription")]
    pub art_description: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Detail block of a test report.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct UutInfo {
    #[serde(rename = "user")]
    pub user: Option<String>,

    #[serde(rename = "comment")]
    pub comment: Option<String>,

    #[serde(rename = "execTime")]
    pub exec_time: Option<f64>,

    #[serde(rename = "execTimeFormat")]
    pub exec_time_format: Option<String>,

    #[serde(rename = "fixtureId")]
    pub fixture_id: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Detail block of a repair report.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct UurInfo {
    #[serde(rename = "user")]
    pub user: Option<String>,

    #[serde(rename = "comment")]
    pub comment: Option<String>,

    #[serde(rename = "execTime")]
    pub exec_time: Option<f64>,

    #[serde(rename = "execTimeFormat")]
    pub exec_time_format: Option<String>,

    #[serde(rename = "refUUT")]
    pub ref_uut: Option<String>,

    #[serde(rename = "confirmDate")]
    pub confirm_date: Option<String>,

    #[serde(rename = "finalizeDate")]
    pub finalize_date: Option<String>,

    #[serde(rename = "testOperationCode")]
    pub test_operation_code: Option<i64>,

    #[serde(rename = "testOperationName")]
    pub test_operation_name: Option<String>,

    #[serde(rename = "testOperationGuid")]
    pub test_operation_guid: Option<Uuid>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Low-level model for any step node. Which optional blocks are present
/// depends on `stepType`.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Step {
    #[serde(rename = "id")]
    pub id: Option<u64>,

    #[serde(rename = "group")]
    pub group: Option<String>,

    #[serde(rename = "stepType")]
    pub step_type: Option<String>,

    #[serde(rename = "name")]
    pub name: Option<String>,

    #[serde(rename = "status")]
    pub status: Option<String>,

    #[serde(rename = "errorCode")]
    pub error_code: Option<i64>,

    #[serde(rename = "errorCodeFormat")]
    pub error_code_format: Option<String>,

    #[serde(rename = "errorMessage")]
    pub error_message: Option<String>,

    #[serde(rename = "reportText")]
    pub report_text: Option<String>,

    #[serde(rename = "start")]
    pub start: Option<String>,

    #[serde(rename = "totTime")]
    pub tot_time: Option<f64>,

    #[serde(rename = "totTimeFormat")]
    pub tot_time_format: Option<String>,

    #[serde(rename = "tsGuid")]
    pub ts_guid: Option<String>,

    #[serde(rename = "causedSeqFailure")]
    pub caused_seq_failure: Option<bool>,

    #[serde(rename = "causedUUTFailure")]
    pub caused_uut_failure: Option<bool>,

    #[serde(rename = "seqCall")]
    pub seq_call: Option<SequenceCallInfo>,

    #[serde(rename = "steps")]
    pub steps: Option<Vec<Step>>,

    #[serde(rename = "numericMeas")]
    pub numeric_meas: Option<Vec<NumericMeasurement>>,

    #[serde(rename = "stringMeas")]
    pub string_meas: Option<Vec<StringMeasurement>>,

    #[serde(rename = "booleanMeas")]
    pub boolean_meas: Option<Vec<BooleanMeasurement>>,

    #[serde(rename = "chart")]
    pub chart: Option<Chart>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Sequence file reference carried by sequence call steps.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SequenceCallInfo {
    #[serde(rename = "path")]
    pub path: Option<String>,

    #[serde(rename = "name")]
    pub name: Option<String>,

    #[serde(rename = "version")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// Chart attached to a step.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Chart {
    #[serde(rename = "chartType")]
    pub chart_type: Option<String>,

    #[serde(rename = "label")]
    pub label: Option<String>,

    #[serde(rename = "xLabel")]
    pub x_label: Option<String>,

    #[serde(rename = "xUnit")]
    pub x_unit: Option<String>,

    #[serde(rename = "yLabel")]
    pub y_label: Option<String>,

    #[serde(rename = "yUnit")]
    pub y_unit: Option<String>,

    #[serde(rename = "series")]
    pub series: Option<Vec<ChartSeries>>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// One data series of a chart; coordinates are `;` separated numbers.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ChartSeries {
    #[serde(rename = "dataType")]
    pub data_type: Option<String>,

    #[serde(rename = "name")]
    pub name: Option<String>,

    #[serde(rename = "xdata")]
    pub x_data: Option<String>,

    #[serde(rename = "ydata")]
    pub y_data: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct NumericMeasurement {
    #[serde(rename = "name")]
    pub name: Option<String>,

    #[serde(rename = "status")]
    pub status: Option<String>,

    #[serde(rename = "compOp")]
    pub comp_op: Option<String>,

    #[serde(rename = "unit")]
    pub unit: Option<String>,

    #[serde(rename = "value")]
    pub value: Option<f64>,

    #[serde(rename = "valueFormat")]
    pub value_format: Option<String>,

    #[serde(rename = "lowLimit")]
    pub low_limit: Option<f64>,

    #[serde(rename = "lowLimitFormat")]
    pub low_limit_format: Option<String>,

    #[serde(rename = "highLimit")]
    pub high_limit: Option<f64>,

    #[serde(rename = "highLimitFormat")]
    pub high_limit_format: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct StringMeasurement {
    #[serde(rename = "name")]
    pub name: Option<String>,

    #[serde(rename = "status")]
    pub status: Option<String>,

    #[serde(rename = "compOp")]
    pub comp_op: Option<String>,

    #[serde(rename = "value")]
    pub value: Option<String>,

    #[serde(rename = "limit")]
    pub limit: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct BooleanMeasurement {
    #[serde(rename = "name")]
    pub name: Option<String>,

    #[serde(rename = "status")]
    pub status: Option<String>,

    #[serde(flatten)]
    pub extensions: Extensions,
}
