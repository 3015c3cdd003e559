// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::report::{self as tr, trait_ext::VecExt, Report, StepTree, WsjfError};
use crate::wsjf;
use tr::{
    BooleanMeasurement, Chart, CompOp, Comparison, Formatted, LeafData, Measure, MeasurementMode,
    MiscInfo, NumericMeasurement, ReportKind, SequenceData, SequenceInfo, StepDetail, StepGroup,
    StepId, StepKind, StepNode, StepStatus, StringMeasurement, SubUnit, UurDetail, UutDetail,
    Value, MAX_STEP_ID,
};

/// Result of decoding a payload. `warnings` lists the non fatal problems
/// found on the way, e.g. measurements with an unknown comparison operator.
#[derive(Debug)]
pub struct Decoded {
    pub report: Report,
    pub warnings: Vec<WsjfError>,
}

/// Encodes `report` into its WSJF json form, walking the step tree depth
/// first from the root.
pub fn encode(report: &Report) -> Result<Value, WsjfError> {
    let wire = report_to_wsjf(report);
    let value = serde_json::to_value(&wire)?;

    debug!(report_id = %report.id, steps = report.steps.len(), "report encoded");
    Ok(value)
}

pub fn to_json_string(report: &Report) -> Result<String, WsjfError> {
    Ok(encode(report)?.to_string())
}

/// Rebuilds a report from a WSJF payload.
///
/// Unknown fields are kept on the object they were found on. A measurement
/// with an unrecognized comparison operator gets status `Unknown` and an
/// `UnknownOperator` warning; anything that leaves the tree shape ambiguous
/// is a `SchemaViolation`.
pub fn decode(value: &Value) -> Result<Decoded, WsjfError> {
    let wire = serde_json::from_value::<wsjf::Report>(value.clone())?;
    Decoder::default().report(wire)
}

pub fn from_json_str(s: &str) -> Result<Decoded, WsjfError> {
    let value = serde_json::from_str::<Value>(s)?;
    decode(&value)
}

fn report_to_wsjf(report: &Report) -> wsjf::Report {
    wsjf::Report {
        report_type: Some(report.kind.code().to_owned()),
        id: Some(report.id.to_string()),
        pn: Some(report.pn.clone()),
        sn: Some(report.sn.clone()),
        rev: Some(report.rev.clone()),
        product_name: report.product_name.clone(),
        process_code: Some(report.process_code.value),
        process_code_format: report.process_code.format.clone(),
        process_name: report.process_name.clone(),
        result: report.result.map(|r| r.code().to_owned()),
        machine_name: report.machine_name.clone(),
        location: report.location.clone(),
        purpose: report.purpose.clone(),
        origin: report.origin.clone(),
        start: report.start,
        start_utc: report.start_utc,
        misc_infos: report.misc_infos.map_option(MiscInfo::to_wsjf),
        sub_units: report.sub_units.map_option(SubUnit::to_wsjf),
        uut: report.uut.as_ref().map(UutDetail::to_wsjf),
        uur: report.uur.as_ref().map(UurDetail::to_wsjf),
        root: Some(step_to_wsjf(&report.steps, report.steps.root().node())),
        extensions: report.extensions.clone(),
    }
}

fn step_to_wsjf(tree: &StepTree, node: &StepNode) -> wsjf::Step {
    let detail = &node.detail;
    let mut step = wsjf::Step {
        id: Some(node.id),
        group: Some(node.group.code().to_owned()),
        step_type: Some(node.kind.code().to_owned()),
        name: Some(node.name.clone()),
        status: Some(node.status.code().to_owned()),
        error_code: detail.error_code.as_ref().map(|c| c.value),
        error_code_format: detail.error_code.as_ref().and_then(|c| c.format.clone()),
        error_message: detail.error_message.clone(),
        report_text: detail.report_text.clone(),
        start: detail.start.clone(),
        tot_time: detail.total_time.as_ref().map(|t| t.value),
        tot_time_format: detail.total_time.as_ref().and_then(|t| t.format.clone()),
        ts_guid: detail.ts_guid.clone(),
        caused_seq_failure: detail.caused_seq_failure,
        caused_uut_failure: detail.caused_uut_failure,
        chart: node.chart.as_ref().map(Chart::to_wsjf),
        extensions: node.extensions.clone(),
        ..Default::default()
    };

    match &node.kind {
        StepKind::SequenceCall(seq) => {
            step.seq_call = Some(wsjf::SequenceCallInfo {
                path: seq.info.path.clone(),
                name: seq.info.file_name.clone(),
                version: seq.info.version.clone(),
                extensions: seq.info.extensions.clone(),
            });
            step.steps = Some(
                seq.children
                    .iter()
                    .filter_map(|id| tree.step(*id))
                    .map(|child| step_to_wsjf(tree, child))
                    .collect(),
            );
        }
        StepKind::NumericLimit(leaf) => {
            step.numeric_meas = leaf.measurements.map_option(numeric_to_wsjf);
        }
        StepKind::PassFail(leaf) => {
            step.boolean_meas = leaf.measurements.map_option(boolean_to_wsjf);
        }
        StepKind::StringValue(leaf) => {
            step.string_meas = leaf.measurements.map_option(string_to_wsjf);
        }
        StepKind::Generic(_) => {}
    }

    step
}

fn numeric_to_wsjf(m: &NumericMeasurement) -> wsjf::NumericMeasurement {
    wsjf::NumericMeasurement {
        name: m.name.clone(),
        status: Some(m.status.code().to_owned()),
        comp_op: Some(m.comparison.code().to_owned()),
        unit: m.unit.clone(),
        value: Some(m.value.value),
        value_format: m.value.format.clone(),
        low_limit: m.low_limit.as_ref().map(|l| l.value),
        low_limit_format: m.low_limit.as_ref().and_then(|l| l.format.clone()),
        high_limit: m.high_limit.as_ref().map(|h| h.value),
        high_limit_format: m.high_limit.as_ref().and_then(|h| h.format.clone()),
        extensions: m.extensions.clone(),
    }
}

fn boolean_to_wsjf(m: &BooleanMeasurement) -> wsjf::BooleanMeasurement {
    wsjf::BooleanMeasurement {
        name: m.name.clone(),
        status: Some(m.status.code().to_owned()),
        extensions: m.extensions.clone(),
    }
}

fn string_to_wsjf(m: &StringMeasurement) -> wsjf::StringMeasurement {
    wsjf::StringMeasurement {
        name: m.name.clone(),
        status: Some(m.status.code().to_owned()),
        comp_op: Some(m.comparison.code().to_owned()),
        value: Some(m.value.clone()),
        limit: m.limit.clone(),
        extensions: m.extensions.clone(),
    }
}

fn formatted<T>(value: Option<T>, format: Option<String>) -> Option<Formatted<T>> {
    value.map(|value| Formatted { value, format })
}

fn parse_status(raw: Option<&str>) -> StepStatus {
    raw.and_then(|s| s.parse().ok())
        .unwrap_or(StepStatus::Unknown)
}

fn max_id(step: &wsjf::Step) -> StepId {
    let children = step.steps.iter().flatten().map(max_id).max().unwrap_or(0);
    step.id.unwrap_or(0).max(children)
}

fn id_space_exhausted() -> WsjfError {
    WsjfError::SchemaViolation("step id space exhausted".to_owned())
}

#[derive(Default)]
struct Decoder {
    warnings: Vec<WsjfError>,
    next_free: StepId,
}

impl Decoder {
    fn report(mut self, wire: wsjf::Report) -> Result<Decoded, WsjfError> {
        let kind = wire
            .report_type
            .as_deref()
            .ok_or_else(|| WsjfError::SchemaViolation("report has no type".to_owned()))?
            .parse::<ReportKind>()?;

        let id = match wire.id.as_deref() {
            Some(raw) => Uuid::parse_str(raw).map_err(|e| {
                WsjfError::SchemaViolation(format!("invalid report id '{raw}': {e}"))
            })?,
            None => Uuid::new_v4(),
        };

        let root = wire
            .root
            .ok_or_else(|| WsjfError::SchemaViolation("report has no root step".to_owned()))?;
        let root_type = root.step_type.as_deref().ok_or_else(|| {
            WsjfError::SchemaViolation("root step has no stepType".to_owned())
        })?;
        if !StepKind::from_code(root_type).0.is_sequence_call() {
            return Err(WsjfError::SchemaViolation(format!(
                "root step must be a sequence call, found '{root_type}'"
            )));
        }

        self.next_free = max_id(&root).checked_add(1).ok_or_else(id_space_exhausted)?;
        let root_id = root.id.unwrap_or(self.next_free);
        let mut steps = StepTree::empty(root_id);
        self.step(&mut steps, root, None, 0)?;

        let report = Report {
            id,
            kind,
            pn: wire.pn.unwrap_or_default(),
            sn: wire.sn.unwrap_or_default(),
            rev: wire.rev.unwrap_or_default(),
            product_name: wire.product_name,
            process_code: Formatted {
                value: wire.process_code.unwrap_or_default(),
                format: wire.process_code_format,
            },
            process_name: wire.process_name,
            result: wire.result.as_deref().map(|r| parse_status(Some(r))),
            machine_name: wire.machine_name,
            location: wire.location,
            purpose: wire.purpose,
            origin: wire.origin,
            start: wire.start,
            start_utc: wire.start_utc,
            misc_infos: wire
                .misc_infos
                .unwrap_or_default()
                .into_iter()
                .map(MiscInfo::from_wsjf)
                .collect(),
            sub_units: wire
                .sub_units
                .unwrap_or_default()
                .into_iter()
                .map(SubUnit::from_wsjf)
                .collect(),
            uut: wire.uut.map(UutDetail::from_wsjf),
            uur: wire.uur.map(UurDetail::from_wsjf),
            steps,
            extensions: wire.extensions,
        };

        debug!(
            report_id = %report.id,
            steps = report.steps.len(),
            warnings = self.warnings.len(),
            "report decoded"
        );
        Ok(Decoded {
            report,
            warnings: self.warnings,
        })
    }

    fn step(
        &mut self,
        tree: &mut StepTree,
        wire: wsjf::Step,
        parent: Option<StepId>,
        index: usize,
    ) -> Result<StepId, WsjfError> {
        let id = self.step_id(wire.id)?;
        let name = wire.name.unwrap_or_default();
        let code = wire.step_type.as_deref().ok_or_else(|| {
            WsjfError::SchemaViolation(format!("step {id} '{name}' has no stepType"))
        })?;
        let (mut kind, mode) = StepKind::from_code(code);

        let violation = |what: &str| {
            WsjfError::SchemaViolation(format!("step {id} '{name}' ({code}) {what}"))
        };
        let arrays = [
            wire.numeric_meas.is_some(),
            wire.string_meas.is_some(),
            wire.boolean_meas.is_some(),
        ];
        let has_steps = wire.steps.is_some();

        let mut children = vec![];
        match &mut kind {
            StepKind::SequenceCall(seq) => {
                if arrays.iter().any(|a| *a) {
                    return Err(violation("is a sequence call carrying measurements"));
                }
                let info = wire.seq_call.unwrap_or_default();
                *seq = SequenceData {
                    info: SequenceInfo {
                        path: info.path,
                        file_name: info.name,
                        version: info.version,
                        extensions: info.extensions,
                    },
                    children: vec![],
                };
                children = wire.steps.unwrap_or_default();
            }
            StepKind::NumericLimit(leaf) => {
                if has_steps || arrays[1] || arrays[2] {
                    return Err(violation("mixes numeric measurements with other content"));
                }
                *leaf = self.leaf(id, mode, wire.numeric_meas, Self::numeric);
            }
            StepKind::StringValue(leaf) => {
                if has_steps || arrays[0] || arrays[2] {
                    return Err(violation("mixes string measurements with other content"));
                }
                *leaf = self.leaf(id, mode, wire.string_meas, Self::string);
            }
            StepKind::PassFail(leaf) => {
                if has_steps || arrays[0] || arrays[1] {
                    return Err(violation("mixes boolean measurements with other content"));
                }
                *leaf = self.leaf(id, mode, wire.boolean_meas, Self::boolean);
            }
            StepKind::Generic(_) => {
                if has_steps || arrays.iter().any(|a| *a) {
                    return Err(violation("has children or measurements but no known step type"));
                }
            }
        }

        let count = match &kind {
            StepKind::NumericLimit(leaf) => leaf.measurements.len(),
            StepKind::StringValue(leaf) => leaf.measurements.len(),
            StepKind::PassFail(leaf) => leaf.measurements.len(),
            _ => 0,
        };
        if mode == Some(MeasurementMode::Single) && count > 1 {
            return Err(violation("is a single measurement step holding several"));
        }

        let node = StepNode {
            id,
            index,
            parent,
            name,
            status: parse_status(wire.status.as_deref()),
            group: wire
                .group
                .as_deref()
                .map(str::parse::<StepGroup>)
                .transpose()?
                .unwrap_or_default(),
            detail: StepDetail {
                error_code: formatted(wire.error_code, wire.error_code_format),
                error_message: wire.error_message,
                report_text: wire.report_text,
                start: wire.start,
                total_time: formatted(wire.tot_time, wire.tot_time_format),
                ts_guid: wire.ts_guid,
                caused_seq_failure: wire.caused_seq_failure,
                caused_uut_failure: wire.caused_uut_failure,
            },
            kind,
            chart: wire.chart.map(Chart::from_wsjf),
            extensions: wire.extensions,
        };
        trace!(id, index, step_type = node.kind.code(), "step decoded");
        tree.insert(node)?;

        for (child_index, child) in children.into_iter().enumerate() {
            let child_id = self.step(tree, child, Some(id), child_index)?;
            if let Some(seq) = tree.step_mut(id).and_then(|n| n.kind.sequence_mut()) {
                seq.children.push(child_id);
            }
        }
        Ok(id)
    }

    /// Keeps an explicit id, or hands out the next id after every explicit
    /// one in the payload.
    fn step_id(&mut self, wire: Option<StepId>) -> Result<StepId, WsjfError> {
        let id = match wire {
            Some(id) => id,
            None => {
                let id = self.next_free;
                self.next_free = id.checked_add(1).ok_or_else(id_space_exhausted)?;
                id
            }
        };
        if id > MAX_STEP_ID {
            return Err(WsjfError::SchemaViolation(format!(
                "step id {id} is above the largest allowed id {MAX_STEP_ID}"
            )));
        }
        Ok(id)
    }

    fn leaf<W, M, F>(
        &mut self,
        step: StepId,
        mode: Option<MeasurementMode>,
        wire: Option<Vec<W>>,
        convert: F,
    ) -> LeafData<M>
    where
        M: Measure,
        F: Fn(&mut Self, StepId, usize, W) -> M,
    {
        let measurements: Vec<M> = wire
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, w)| convert(self, step, index, w))
            .collect();

        // an empty step has not picked a mode yet
        let mode = if measurements.is_empty() { None } else { mode };
        LeafData { mode, measurements }
    }

    /// Resolves the operator text; unknown text degrades the measurement
    /// to status `Unknown` and records a warning.
    fn comparison(
        &mut self,
        step: StepId,
        index: usize,
        raw: Option<String>,
        status: Option<String>,
    ) -> (Comparison, StepStatus) {
        let status = parse_status(status.as_deref());
        let Some(raw) = raw else {
            return (Comparison::Known(CompOp::Log), status);
        };

        match raw.parse::<CompOp>() {
            Ok(op) => (Comparison::Known(op), status),
            Err(_) => {
                warn!(step, index, comp_op = %raw, "unknown comparison operator");
                self.warnings.push(WsjfError::UnknownOperator {
                    step,
                    index,
                    raw: raw.clone(),
                });
                (Comparison::Raw(raw), StepStatus::Unknown)
            }
        }
    }

    fn numeric(&mut self, step: StepId, index: usize, w: wsjf::NumericMeasurement) -> NumericMeasurement {
        let (comparison, status) = self.comparison(step, index, w.comp_op, w.status);
        NumericMeasurement {
            index,
            name: w.name,
            status,
            value: Formatted {
                value: w.value.unwrap_or(f64::NAN),
                format: w.value_format,
            },
            comparison,
            low_limit: formatted(w.low_limit, w.low_limit_format),
            high_limit: formatted(w.high_limit, w.high_limit_format),
            unit: w.unit,
            extensions: w.extensions,
        }
    }

    fn string(&mut self, step: StepId, index: usize, w: wsjf::StringMeasurement) -> StringMeasurement {
        let (comparison, status) = self.comparison(step, index, w.comp_op, w.status);
        StringMeasurement {
            index,
            name: w.name,
            status,
            value: w.value.unwrap_or_default(),
            comparison,
            limit: w.limit,
            extensions: w.extensions,
        }
    }

    /// The wire form has no value field; it follows from the status.
    fn boolean(&mut self, _step: StepId, index: usize, w: wsjf::BooleanMeasurement) -> BooleanMeasurement {
        let status = parse_status(w.status.as_deref());
        BooleanMeasurement {
            index,
            name: w.name,
            status,
            value: status == StepStatus::Passed,
            extensions: w.extensions,
        }
    }
}
