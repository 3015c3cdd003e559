// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::marker::PhantomData;

use tracing::trace;

use crate::report::{self as tr, Formatted, Measure, WsjfError};
use crate::wsjf;
use tr::{BooleanMeasurement, Chart, NumericMeasurement, StepGroup, StepStatus, StringMeasurement};

/// Report-wide step identifier. The root sequence is always 1.
pub type StepId = u64;

pub(crate) const SEQUENCE_CALL_CODE: &str = "SequenceCall";

/// Whether a leaf step holds exactly one unnamed measurement or any number
/// of named ones. Fixed by the first measurement added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementMode {
    Single,
    Multiple,
}

/// Measurements of one leaf step and the mode they were added in.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafData<M> {
    pub(crate) mode: Option<MeasurementMode>,
    pub(crate) measurements: Vec<M>,
}

impl<M> Default for LeafData<M> {
    fn default() -> Self {
        LeafData {
            mode: None,
            measurements: vec![],
        }
    }
}

impl<M: Measure> LeafData<M> {
    /// `None` until the first measurement is added.
    pub fn mode(&self) -> Option<MeasurementMode> {
        self.mode
    }

    pub fn measurements(&self) -> &[M] {
        &self.measurements
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Passed iff every measurement passed.
    fn derived_status(&self) -> StepStatus {
        if self
            .measurements
            .iter()
            .all(|m| m.status() == StepStatus::Passed)
        {
            StepStatus::Passed
        } else {
            StepStatus::Failed
        }
    }

    fn push(
        &mut self,
        step: &str,
        attempted: MeasurementMode,
        name: Option<String>,
        test: M::Test,
    ) -> Result<(), WsjfError> {
        let conflict = match (attempted, self.mode) {
            (MeasurementMode::Single, Some(MeasurementMode::Multiple)) => true,
            (MeasurementMode::Single, _) => !self.measurements.is_empty(),
            (MeasurementMode::Multiple, Some(MeasurementMode::Single)) => true,
            (MeasurementMode::Multiple, _) => false,
        };
        if conflict {
            return Err(WsjfError::ModeConflict {
                step: step.to_owned(),
                attempted,
                current: self.mode.unwrap_or(MeasurementMode::Multiple),
            });
        }

        let measurement = M::create(test, self.measurements.len(), name)?;
        self.measurements.push(measurement);
        self.mode = Some(attempted);
        Ok(())
    }
}

/// `seqCall` block of a sequence call step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceInfo {
    pub path: Option<String>,
    pub file_name: Option<String>,
    pub version: Option<String>,
    pub(crate) extensions: wsjf::Extensions,
}

impl SequenceInfo {
    pub fn new(file_name: &str, version: &str) -> Self {
        SequenceInfo {
            path: Some(file_name.to_owned()),
            file_name: Some(file_name.to_owned()),
            version: Some(version.to_owned()),
            extensions: wsjf::Extensions::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceData {
    pub(crate) info: SequenceInfo,
    pub(crate) children: Vec<StepId>,
}

impl SequenceData {
    pub fn info(&self) -> &SequenceInfo {
        &self.info
    }

    /// Child ids in append order; position equals the child's index.
    pub fn children(&self) -> &[StepId] {
        &self.children
    }
}

/// Closed set of step kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    SequenceCall(SequenceData),
    NumericLimit(LeafData<NumericMeasurement>),
    PassFail(LeafData<BooleanMeasurement>),
    StringValue(LeafData<StringMeasurement>),
    /// Any step without measurements, e.g. "Action", "Label" or flow
    /// control steps. Holds the step type text as found on the wire.
    Generic(String),
}

impl StepKind {
    /// Wire `stepType` code.
    pub fn code(&self) -> &str {
        fn pick<M>(leaf: &LeafData<M>, single: &'static str, multiple: &'static str) -> &'static str {
            match leaf.mode {
                Some(MeasurementMode::Multiple) => multiple,
                _ => single,
            }
        }

        match self {
            StepKind::SequenceCall(_) => SEQUENCE_CALL_CODE,
            StepKind::NumericLimit(leaf) => pick(leaf, "ET_NLT", "ET_MNLT"),
            StepKind::PassFail(leaf) => pick(leaf, "ET_PFT", "ET_MPFT"),
            StepKind::StringValue(leaf) => pick(leaf, "ET_SVT", "ET_MSVT"),
            StepKind::Generic(kind) => kind.as_str(),
        }
    }

    pub fn is_sequence_call(&self) -> bool {
        matches!(self, StepKind::SequenceCall(_))
    }

    pub fn sequence(&self) -> Option<&SequenceData> {
        match self {
            StepKind::SequenceCall(seq) => Some(seq),
            _ => None,
        }
    }

    pub(crate) fn sequence_mut(&mut self) -> Option<&mut SequenceData> {
        match self {
            StepKind::SequenceCall(seq) => Some(seq),
            _ => None,
        }
    }

    /// Maps a wire `stepType` to an empty step kind of that type, together
    /// with the measurement mode the code implies.
    pub(crate) fn from_code(code: &str) -> (StepKind, Option<MeasurementMode>) {
        use MeasurementMode::{Multiple, Single};

        match code {
            SEQUENCE_CALL_CODE | "WATS_SeqCall" => {
                (StepKind::SequenceCall(SequenceData::default()), None)
            }
            "ET_NLT" | "NumericLimitTest" => (StepKind::NumericLimit(LeafData::default()), Some(Single)),
            "ET_MNLT" | "MultiNumericLimitTest" => {
                (StepKind::NumericLimit(LeafData::default()), Some(Multiple))
            }
            "ET_PFT" | "PassFailTest" => (StepKind::PassFail(LeafData::default()), Some(Single)),
            "ET_MPFT" | "MultiPassFailTest" => (StepKind::PassFail(LeafData::default()), Some(Multiple)),
            "ET_SVT" | "StringValueTest" => (StepKind::StringValue(LeafData::default()), Some(Single)),
            "ET_MSVT" | "MultiStringValueTest" => {
                (StepKind::StringValue(LeafData::default()), Some(Multiple))
            }
            other => (StepKind::Generic(other.to_owned()), None),
        }
    }
}

/// Optional per-step execution detail.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepDetail {
    pub error_code: Option<Formatted<i64>>,
    pub error_message: Option<String>,
    pub report_text: Option<String>,
    pub start: Option<String>,
    pub total_time: Option<Formatted<f64>>,
    pub ts_guid: Option<String>,
    pub caused_seq_failure: Option<bool>,
    pub caused_uut_failure: Option<bool>,
}

/// One node of the step tree.
#[derive(Debug, Clone, PartialEq)]
pub struct StepNode {
    pub(crate) id: StepId,
    pub(crate) index: usize,
    pub(crate) parent: Option<StepId>,
    pub(crate) name: String,
    pub(crate) status: StepStatus,
    pub(crate) group: StepGroup,
    pub(crate) detail: StepDetail,
    pub(crate) kind: StepKind,
    pub(crate) chart: Option<Chart>,
    pub(crate) extensions: wsjf::Extensions,
}

impl StepNode {
    pub(crate) fn new(id: StepId, index: usize, parent: Option<StepId>, name: &str, kind: StepKind) -> Self {
        let status = match kind {
            StepKind::SequenceCall(_) | StepKind::Generic(_) => StepStatus::Done,
            _ => StepStatus::Passed,
        };
        StepNode {
            id,
            index,
            parent,
            name: name.to_owned(),
            status,
            group: StepGroup::default(),
            detail: StepDetail::default(),
            kind,
            chart: None,
            extensions: wsjf::Extensions::new(),
        }
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// `None` for the root sequence.
    pub fn parent(&self) -> Option<StepId> {
        self.parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn group(&self) -> StepGroup {
        self.group
    }

    pub fn detail(&self) -> &StepDetail {
        &self.detail
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn chart(&self) -> Option<&Chart> {
        self.chart.as_ref()
    }

    pub fn extensions(&self) -> &wsjf::Extensions {
        &self.extensions
    }

    /// Measurements of this step, if it is a leaf of the matching kind.
    pub fn measurements<M: Measure>(&self) -> Option<&[M]> {
        M::leaf(&self.kind).map(|leaf| leaf.measurements())
    }

    pub fn mode(&self) -> Option<MeasurementMode> {
        match &self.kind {
            StepKind::NumericLimit(leaf) => leaf.mode,
            StepKind::PassFail(leaf) => leaf.mode,
            StepKind::StringValue(leaf) => leaf.mode,
            _ => None,
        }
    }
}

/// Mutable handle to a freshly appended leaf step.
///
/// # Examples
///
/// ```rust
/// # use tdm::report::*;
/// # fn main() -> Result<(), WsjfError> {
/// let mut report = Report::builder(ReportKind::Test, "PN-1", "SN-1", "A", 10).build();
/// report
///     .root_sequence_mut()
///     .add_numeric_limit_step("vdd")
///     .add_single_test(NumericTest::new(3.3, CompOp::GeLe).limits(3.0, 3.6).unit("V"))?;
/// # Ok(())
/// # }
/// ```
pub struct LeafStepMut<'a, M> {
    node: &'a mut StepNode,
    _kind: PhantomData<M>,
}

pub type NumericLimitStepMut<'a> = LeafStepMut<'a, NumericMeasurement>;
pub type PassFailStepMut<'a> = LeafStepMut<'a, BooleanMeasurement>;
pub type StringValueStepMut<'a> = LeafStepMut<'a, StringMeasurement>;

impl<'a, M: Measure> LeafStepMut<'a, M> {
    pub(crate) fn new(node: &'a mut StepNode) -> Self {
        LeafStepMut {
            node,
            _kind: PhantomData,
        }
    }

    pub fn node(&self) -> &StepNode {
        self.node
    }

    pub fn id(&self) -> StepId {
        self.node.id
    }

    fn add(&mut self, mode: MeasurementMode, name: Option<String>, test: M::Test) -> Result<&mut Self, WsjfError> {
        let node = &mut *self.node;
        let id = node.id;
        let leaf = M::leaf_mut(&mut node.kind).ok_or_else(|| {
            WsjfError::SchemaViolation(format!("step {id} does not hold this measurement kind"))
        })?;
        leaf.push(&node.name, mode, name, test)?;
        node.status = leaf.derived_status();

        trace!(step = id, measurements = leaf.measurements.len(), "measurement added");
        Ok(self)
    }

    /// Adds the one unnamed measurement of a single mode step.
    /// Fails with `ModeConflict` once the step holds any measurement.
    pub fn add_single_test(&mut self, test: M::Test) -> Result<&mut Self, WsjfError> {
        self.add(MeasurementMode::Single, None, test)
    }

    /// Adds a named measurement, putting the step in multiple mode.
    /// Fails with `ModeConflict` when the step already holds a single test.
    pub fn add_named_test(&mut self, name: &str, test: M::Test) -> Result<&mut Self, WsjfError> {
        self.add(MeasurementMode::Multiple, Some(name.to_owned()), test)
    }

    pub fn measurements(&self) -> &[M] {
        M::leaf(&self.node.kind)
            .map(|leaf| leaf.measurements())
            .unwrap_or(&[])
    }

    pub fn mode(&self) -> Option<MeasurementMode> {
        self.node.mode()
    }

    pub fn status(&self) -> StepStatus {
        self.node.status
    }
}

/// Setters shared by every step handle.
pub trait StepSetters {
    #[doc(hidden)]
    fn node_mut(&mut self) -> &mut StepNode;

    /// Overrides the status, e.g. to mark a step Skipped or Error.
    fn set_status(&mut self, status: StepStatus) -> &mut Self {
        self.node_mut().status = status;
        self
    }

    fn set_group(&mut self, group: StepGroup) -> &mut Self {
        self.node_mut().group = group;
        self
    }

    fn set_error(&mut self, code: i64, message: &str) -> &mut Self {
        let detail = &mut self.node_mut().detail;
        detail.error_code = Some(Formatted::new(code));
        detail.error_message = Some(message.to_owned());
        self
    }

    fn set_report_text(&mut self, text: &str) -> &mut Self {
        self.node_mut().detail.report_text = Some(text.to_owned());
        self
    }

    fn set_start(&mut self, start: &str) -> &mut Self {
        self.node_mut().detail.start = Some(start.to_owned());
        self
    }

    /// Total execution time in seconds.
    fn set_total_time(&mut self, seconds: f64) -> &mut Self {
        self.node_mut().detail.total_time = Some(Formatted::new(seconds));
        self
    }

    fn set_ts_guid(&mut self, guid: &str) -> &mut Self {
        self.node_mut().detail.ts_guid = Some(guid.to_owned());
        self
    }

    fn set_chart(&mut self, chart: Chart) -> &mut Self {
        self.node_mut().chart = Some(chart);
        self
    }

    fn set_caused_failure(&mut self, sequence: bool, uut: bool) -> &mut Self {
        let detail = &mut self.node_mut().detail;
        detail.caused_seq_failure = Some(sequence);
        detail.caused_uut_failure = Some(uut);
        self
    }
}

impl<M: Measure> StepSetters for LeafStepMut<'_, M> {
    fn node_mut(&mut self) -> &mut StepNode {
        self.node
    }
}

/// Mutable handle to a step without measurements.
pub struct GenericStepMut<'a> {
    pub(crate) node: &'a mut StepNode,
}

impl GenericStepMut<'_> {
    pub fn node(&self) -> &StepNode {
        self.node
    }

    pub fn id(&self) -> StepId {
        self.node.id
    }
}

impl StepSetters for GenericStepMut<'_> {
    fn node_mut(&mut self) -> &mut StepNode {
        self.node
    }
}
