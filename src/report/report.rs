// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use chrono::{DateTime, FixedOffset, Offset, SubsecRound, TimeZone, Utc};
use uuid::Uuid;

use crate::report::{self as tr, Config, Formatted, Ident, StepId, StepNode, StepTree, WsjfError};
use crate::wsjf;
use tr::{
    Failure, MiscInfo, MiscValue, ReportKind, SequenceCall, SequenceCallMut, StepStatus, SubUnit,
    UurDetail, UutDetail, MAX_STEP_ID,
};

pub(crate) const DEFAULT_ROOT_NAME: &str = "MainSequence";

/// Millisecond precision in the zone's own offset.
pub(crate) fn to_fixed<Tz: TimeZone>(dt: &DateTime<Tz>) -> DateTime<FixedOffset> {
    dt.with_timezone(&dt.offset().fix()).trunc_subsecs(3)
}

/// A single test (UUT) or repair (UUR) report: header metadata plus the
/// step tree under one root sequence call.
///
/// The root sequence exists from construction on and always has id 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub(crate) id: Uuid,
    pub(crate) kind: ReportKind,
    pub(crate) pn: String,
    pub(crate) sn: String,
    pub(crate) rev: String,
    pub(crate) product_name: Option<String>,
    pub(crate) process_code: Formatted<i64>,
    pub(crate) process_name: Option<String>,
    pub(crate) result: Option<StepStatus>,
    pub(crate) machine_name: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) purpose: Option<String>,
    pub(crate) origin: Option<String>,
    pub(crate) start: Option<DateTime<FixedOffset>>,
    pub(crate) start_utc: Option<DateTime<Utc>>,
    pub(crate) misc_infos: Vec<MiscInfo>,
    pub(crate) sub_units: Vec<SubUnit>,
    pub(crate) uut: Option<UutDetail>,
    pub(crate) uur: Option<UurDetail>,
    pub(crate) steps: StepTree,
    pub(crate) extensions: wsjf::Extensions,
}

impl Report {
    /// Starts building a report for the unit `pn`/`sn`/`rev` run through
    /// the process `process_code`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use tdm::report::*;
    /// let report = Report::builder(ReportKind::Test, "PN-100", "SN-0001", "A", 10)
    ///     .process_name("ICT")
    ///     .operator("oper")
    ///     .build();
    ///
    /// assert_eq!(report.root_sequence().id(), 1);
    /// ```
    pub fn builder(kind: ReportKind, pn: &str, sn: &str, rev: &str, process_code: i64) -> ReportBuilder {
        ReportBuilder::new(kind, pn, sn, rev, process_code)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn pn(&self) -> &str {
        &self.pn
    }

    pub fn sn(&self) -> &str {
        &self.sn
    }

    pub fn rev(&self) -> &str {
        &self.rev
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    pub fn process_code(&self) -> i64 {
        self.process_code.value
    }

    pub fn process_name(&self) -> Option<&str> {
        self.process_name.as_deref()
    }

    pub fn result(&self) -> Option<StepStatus> {
        self.result
    }

    pub fn station_name(&self) -> Option<&str> {
        self.machine_name.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        self.start
    }

    pub fn start_utc(&self) -> Option<DateTime<Utc>> {
        self.start_utc
    }

    pub fn misc_infos(&self) -> &[MiscInfo] {
        &self.misc_infos
    }

    pub fn sub_units(&self) -> &[SubUnit] {
        &self.sub_units
    }

    pub fn uut(&self) -> Option<&UutDetail> {
        self.uut.as_ref()
    }

    pub fn uut_mut(&mut self) -> Option<&mut UutDetail> {
        self.uut.as_mut()
    }

    pub fn uur(&self) -> Option<&UurDetail> {
        self.uur.as_ref()
    }

    pub fn uur_mut(&mut self) -> Option<&mut UurDetail> {
        self.uur.as_mut()
    }

    pub fn extensions(&self) -> &wsjf::Extensions {
        &self.extensions
    }

    pub fn set_pn(&mut self, pn: &str) -> &mut Self {
        self.pn = pn.to_owned();
        self
    }

    pub fn set_sn(&mut self, sn: &str) -> &mut Self {
        self.sn = sn.to_owned();
        self
    }

    pub fn set_rev(&mut self, rev: &str) -> &mut Self {
        self.rev = rev.to_owned();
        self
    }

    pub fn set_product_name(&mut self, name: &str) -> &mut Self {
        self.product_name = Some(name.to_owned());
        self
    }

    pub fn set_process(&mut self, code: i64, name: &str) -> &mut Self {
        self.process_code = Formatted::new(code);
        self.process_name = Some(name.to_owned());
        self
    }

    pub fn set_result(&mut self, result: StepStatus) -> &mut Self {
        self.result = Some(result);
        self
    }

    pub fn set_station_name(&mut self, name: &str) -> &mut Self {
        self.machine_name = Some(name.to_owned());
        self
    }

    pub fn set_location(&mut self, location: &str) -> &mut Self {
        self.location = Some(location.to_owned());
        self
    }

    pub fn set_purpose(&mut self, purpose: &str) -> &mut Self {
        self.purpose = Some(purpose.to_owned());
        self
    }

    pub fn set_origin(&mut self, origin: &str) -> &mut Self {
        self.origin = Some(origin.to_owned());
        self
    }

    /// Sets the local start time; the UTC start follows.
    pub fn set_start<Tz: TimeZone>(&mut self, start: DateTime<Tz>) -> &mut Self {
        let start = to_fixed(&start);
        self.start_utc = Some(start.with_timezone(&Utc));
        self.start = Some(start);
        self
    }

    /// Appends a free-form header entry.
    pub fn add_misc_info<V: Into<MiscValue>>(&mut self, description: &str, value: V) -> &mut Self {
        self.misc_infos.push(MiscInfo::new(description, value.into()));
        self
    }

    pub fn add_sub_unit(&mut self, part_type: &str, sn: &str, pn: &str, rev: &str) -> &mut SubUnit {
        let pos = self.sub_units.len();
        self.sub_units.push(SubUnit::new(part_type, sn, pn, rev));
        &mut self.sub_units[pos]
    }

    /// The sub unit with `idx` 0, i.e. the repaired unit itself. Created
    /// from the report's pn, sn and rev when the report has none.
    pub fn main_unit_mut(&mut self) -> &mut SubUnit {
        let pos = match self.sub_units.iter().position(|unit| unit.idx == Some(0)) {
            Some(pos) => pos,
            None => {
                let main = SubUnit {
                    pn: self.pn.clone(),
                    sn: self.sn.clone(),
                    rev: Some(self.rev.clone()),
                    idx: Some(0),
                    ..Default::default()
                };
                self.sub_units.insert(0, main);
                0
            }
        };
        &mut self.sub_units[pos]
    }

    /// Records a failure on the main unit.
    pub fn add_failure(
        &mut self,
        category: &str,
        code: &str,
        comment: Option<&str>,
        component_ref: Option<&str>,
        ref_step_id: Option<StepId>,
    ) -> &mut Failure {
        let failure = Failure {
            comment: comment.map(str::to_owned),
            component_ref: component_ref.map(str::to_owned),
            ref_step_id,
            ..Failure::new(category, code)
        };
        self.main_unit_mut().add_failure(failure)
    }

    /// Failures of every sub unit, in sub unit order.
    pub fn all_failures(&self) -> impl Iterator<Item = &Failure> {
        self.sub_units.iter().flat_map(|unit| unit.failures.iter())
    }

    pub fn count_failures(&self) -> usize {
        self.sub_units.iter().map(|unit| unit.failures.len()).sum()
    }

    pub fn root_sequence(&self) -> SequenceCall<'_> {
        self.steps.root()
    }

    pub fn root_sequence_mut(&mut self) -> SequenceCallMut<'_> {
        self.steps.root_mut()
    }

    pub fn steps(&self) -> &StepTree {
        &self.steps
    }

    /// Mutable handle to any sequence call of the tree.
    pub fn sequence_mut(&mut self, id: StepId) -> Option<SequenceCallMut<'_>> {
        self.steps.sequence_mut(id)
    }

    pub fn step(&self, id: StepId) -> Option<&StepNode> {
        self.steps.step(id)
    }

    pub fn parent_of(&self, id: StepId) -> Option<&StepNode> {
        self.steps.parent_of(id)
    }

    /// Checks the header is complete enough to be submitted. Construction
    /// never validates; submission does.
    pub fn validate(&self) -> Result<(), WsjfError> {
        let mut problems = vec![];

        for (field, value) in [("pn", &self.pn), ("sn", &self.sn), ("rev", &self.rev)] {
            if value.trim().is_empty() {
                problems.push(format!("{field} is empty"));
            }
        }

        if let Some(node) = self.steps.iter().find(|node| node.id > MAX_STEP_ID) {
            problems.push(format!("step id {} is above {MAX_STEP_ID}", node.id));
        }

        match self.kind {
            ReportKind::Test => {
                if self.uut.is_none() {
                    problems.push("test report without uut block".to_owned());
                }
                if self.uur.is_some() {
                    problems.push("test report with uur block".to_owned());
                }
            }
            ReportKind::Repair => {
                if self.uur.is_none() {
                    problems.push("repair report without uur block".to_owned());
                }
                if self.uut.is_some() {
                    problems.push("repair report with uut block".to_owned());
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(WsjfError::SchemaViolation(problems.join(", ")))
        }
    }
}

/// Builder for [`Report`].
pub struct ReportBuilder {
    kind: ReportKind,
    id: Ident,
    pn: String,
    sn: String,
    rev: String,
    process_code: Formatted<i64>,
    product_name: Option<String>,
    process_name: Option<String>,
    result: Option<StepStatus>,
    machine_name: Option<String>,
    location: Option<String>,
    purpose: Option<String>,
    origin: Option<String>,
    start: Option<DateTime<FixedOffset>>,
    clock_start: Option<DateTime<FixedOffset>>,
    operator: Option<String>,
    comment: Option<String>,
    root_name: String,
}

impl ReportBuilder {
    fn new(kind: ReportKind, pn: &str, sn: &str, rev: &str, process_code: i64) -> Self {
        ReportBuilder {
            kind,
            id: Ident::Auto,
            pn: pn.to_owned(),
            sn: sn.to_owned(),
            rev: rev.to_owned(),
            process_code: Formatted::new(process_code),
            product_name: None,
            process_name: None,
            result: None,
            machine_name: None,
            location: None,
            purpose: None,
            origin: None,
            start: None,
            clock_start: None,
            operator: None,
            comment: None,
            root_name: DEFAULT_ROOT_NAME.to_owned(),
        }
    }

    pub fn id(mut self, id: Ident) -> Self {
        self.id = id;
        self
    }

    pub fn product_name(mut self, name: &str) -> Self {
        self.product_name = Some(name.to_owned());
        self
    }

    pub fn process_code_format(mut self, format: &str) -> Self {
        self.process_code.format = Some(format.to_owned());
        self
    }

    pub fn process_name(mut self, name: &str) -> Self {
        self.process_name = Some(name.to_owned());
        self
    }

    pub fn result(mut self, result: StepStatus) -> Self {
        self.result = Some(result);
        self
    }

    pub fn station_name(mut self, name: &str) -> Self {
        self.machine_name = Some(name.to_owned());
        self
    }

    pub fn location(mut self, location: &str) -> Self {
        self.location = Some(location.to_owned());
        self
    }

    pub fn purpose(mut self, purpose: &str) -> Self {
        self.purpose = Some(purpose.to_owned());
        self
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.origin = Some(origin.to_owned());
        self
    }

    pub fn start<Tz: TimeZone>(mut self, start: DateTime<Tz>) -> Self {
        self.start = Some(to_fixed(&start));
        self
    }

    /// Operator name, written to the uut or uur block.
    pub fn operator(mut self, name: &str) -> Self {
        self.operator = Some(name.to_owned());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_owned());
        self
    }

    pub fn root_name(mut self, name: &str) -> Self {
        self.root_name = name.to_owned();
        self
    }

    /// Takes the station defaults and the clock from `config`. Values set
    /// explicitly on the builder win.
    pub fn config(mut self, config: &Config) -> Self {
        self.machine_name = self.machine_name.or_else(|| config.station_name.clone());
        self.location = self.location.or_else(|| config.location.clone());
        self.purpose = self.purpose.or_else(|| config.purpose.clone());
        self.clock_start = Some(to_fixed(&config.timestamp_provider.now()));
        self
    }

    pub fn build(self) -> Report {
        let start = self
            .start
            .or(self.clock_start)
            .unwrap_or_else(|| to_fixed(&Utc::now()));

        let (uut, uur) = match self.kind {
            ReportKind::Test => (
                Some(UutDetail {
                    operator: self.operator,
                    comment: self.comment,
                    ..Default::default()
                }),
                None,
            ),
            ReportKind::Repair => (
                None,
                Some(UurDetail {
                    operator: self.operator,
                    comment: self.comment,
                    ..Default::default()
                }),
            ),
        };

        Report {
            id: self.id.resolve(),
            kind: self.kind,
            pn: self.pn,
            sn: self.sn,
            rev: self.rev,
            product_name: self.product_name,
            process_code: self.process_code,
            process_name: self.process_name,
            result: self.result,
            machine_name: self.machine_name,
            location: self.location,
            purpose: self.purpose,
            origin: self.origin,
            start: Some(start),
            start_utc: Some(start.with_timezone(&Utc)),
            misc_infos: vec![],
            sub_units: vec![],
            uut,
            uur,
            steps: StepTree::new(&self.root_name),
            extensions: wsjf::Extensions::new(),
        }
    }
}
