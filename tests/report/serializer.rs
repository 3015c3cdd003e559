// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use assert_json_diff::assert_json_eq;
use maplit::btreemap;
use serde_json::json;
use tokio::sync::Mutex;

use tdm::report::{
    decode, encode, from_json_str, to_json_string, Chart, ChartSeries, Comparison, CompOp, Ident,
    Measure, MeasurementMode, NumericMeasurement, Report, ReportKind, SequenceInfo, StepKind,
    StepSetters, StepStatus, StringMeasurement, StringTest, WsjfError, CHART_STEP_CODE,
};
use uuid::Uuid;

use super::fixture::*;

#[test]
fn test_encode_sample_report() -> Result<()> {
    let config = config(Arc::new(Mutex::new(vec![])));
    let report = sample_report(&config)?;

    assert_json_eq!(encode(&report)?, json_sample_report());
    Ok(())
}

#[test]
fn test_decode_sample_report() -> Result<()> {
    let config = config(Arc::new(Mutex::new(vec![])));
    let decoded = decode(&json_sample_report())?;

    assert!(decoded.warnings.is_empty());
    assert_eq!(decoded.report, sample_report(&config)?);

    let leds = decoded
        .report
        .root_sequence()
        .sub_sequences()
        .next()
        .map(|s| (s.id(), s.name().to_owned(), s.count_steps()));
    assert_eq!(leds, Some((3, "Leds".to_owned(), 1)));
    Ok(())
}

#[test]
fn test_reencoding_is_stable() -> Result<()> {
    let payload = json!({
        "type": "T",
        "id": REPORT_ID,
        "pn": "PN-100",
        "sn": "SN-0001",
        "rev": "A",
        "processCode": 10,
        "uut": {"user": "oper", "fixtureId": "FX-2"},
        "miscInfos": [{"description": "Firmware", "text": "1.4.2"}],
        "subUnits": [{"partType": "PSU", "pn": "PN-P", "sn": "SN-P", "rev": "B"}],
        "root": {
            "id": 1,
            "group": "M",
            "stepType": "SequenceCall",
            "name": "MainSequence",
            "status": "F",
            "seqCall": {},
            "steps": [{
                "id": 2,
                "group": "S",
                "stepType": "ET_MNLT",
                "name": "rails",
                "status": "F",
                "errorCode": 17,
                "errorMessage": "rail out of range",
                "numericMeas": [
                    {"name": "3v3", "status": "P", "compOp": "GELE", "value": 3.31,
                     "lowLimit": 3.2, "highLimit": 3.4, "unit": "V"},
                    {"name": "5v", "status": "F", "compOp": "GELE", "value": 4.1,
                     "lowLimit": 4.9, "highLimit": 5.1, "unit": "V"}
                ]
            }]
        }
    });

    let decoded = decode(&payload)?;
    assert_json_eq!(encode(&decoded.report)?, payload);

    let rails = decoded.report.step(2);
    assert_eq!(rails.and_then(|n| n.mode()), Some(MeasurementMode::Multiple));
    assert_eq!(
        decoded.report.root_sequence().failed_steps().iter().map(|n| n.id()).collect::<Vec<_>>(),
        vec![2]
    );
    Ok(())
}

#[test]
fn test_step_type_aliases_are_canonicalized() -> Result<()> {
    let payload = json!({
        "type": "T",
        "root": {"id": 1, "stepType": "WATS_SeqCall", "steps": [
            {"id": 2, "stepType": "MultiPassFailTest", "booleanMeas": [
                {"name": "a", "status": "P"},
                {"name": "b", "status": "F"}
            ]}
        ]}
    });

    let decoded = decode(&payload)?;
    let step = decoded.report.step(2);
    assert!(matches!(step.map(|n| n.kind()), Some(StepKind::PassFail(_))));

    let encoded = encode(&decoded.report)?;
    assert_eq!(encoded["root"]["stepType"], json!("SequenceCall"));
    assert_eq!(encoded["root"]["steps"][0]["stepType"], json!("ET_MPFT"));
    Ok(())
}

#[test]
fn test_decode_rejects_broken_trees() {
    let payloads = [
        // no stepType on a nested step
        json!({"type": "T", "root": {"id": 1, "stepType": "SequenceCall", "steps": [{"id": 2}]}}),
        // leaf step with children
        json!({"type": "T", "root": {"id": 1, "stepType": "SequenceCall", "steps": [
            {"id": 2, "stepType": "ET_NLT", "steps": []}
        ]}}),
        // sequence call carrying measurements
        json!({"type": "T", "root": {"id": 1, "stepType": "SequenceCall", "booleanMeas": []}}),
        // generic step with children
        json!({"type": "T", "root": {"id": 1, "stepType": "SequenceCall", "steps": [
            {"id": 2, "stepType": "Action", "steps": []}
        ]}}),
        // id reused by a nested step
        json!({"type": "T", "root": {"id": 1, "stepType": "SequenceCall", "steps": [
            {"id": 1, "stepType": "Action"}
        ]}}),
    ];

    for payload in payloads {
        assert!(
            matches!(decode(&payload), Err(WsjfError::SchemaViolation(_))),
            "accepted {payload}"
        );
    }
}

#[test]
fn test_decode_rejects_bad_enums() {
    let payload = json!({"type": "X", "root": {"id": 1, "stepType": "SequenceCall"}});
    assert!(decode(&payload).is_err());

    let payload = json!({"type": "T", "root": {"id": 1, "stepType": "SequenceCall", "group": "Q"}});
    assert!(decode(&payload).is_err());

    assert!(matches!(from_json_str("{not json"), Err(WsjfError::Format(_))));
}

#[test]
fn test_unknown_operators_only_degrade_their_measurement() -> Result<()> {
    let payload = json!({
        "type": "T",
        "root": {"id": 1, "stepType": "SequenceCall", "steps": [
            {"id": 2, "stepType": "ET_MSVT", "name": "fw", "status": "P", "stringMeas": [
                {"name": "main", "status": "P", "compOp": "EQ", "value": "1.2", "limit": "1.2"},
                {"name": "boot", "status": "P", "compOp": "FUZZY", "value": "0.9", "limit": "1.0"}
            ]}
        ]}
    });

    let decoded = decode(&payload)?;
    assert_eq!(decoded.warnings.len(), 1);

    let meas = decoded
        .report
        .step(2)
        .and_then(|n| n.measurements::<StringMeasurement>())
        .map(|m| m.to_vec())
        .unwrap_or_default();
    assert_eq!(meas.len(), 2);
    assert_eq!(meas[0].comparison(), &Comparison::Known(CompOp::Eq));
    assert_eq!(meas[1].comparison(), &Comparison::Raw("FUZZY".to_owned()));

    assert_eq!(meas[0].status(), StepStatus::Passed);
    assert_eq!(meas[1].status(), StepStatus::Unknown);
    Ok(())
}

#[test]
fn test_report_without_id_gets_one() -> Result<()> {
    let payload = json!({"type": "R", "uur": {}, "root": {"stepType": "SequenceCall"}});

    let decoded = decode(&payload)?;
    assert_eq!(decoded.report.kind(), ReportKind::Repair);
    assert_eq!(decoded.report.id().get_version_num(), 4);
    assert_eq!(decoded.report.root_sequence().id(), 1);
    Ok(())
}

#[test]
fn test_extension_fields_survive() -> Result<()> {
    let config = config(Arc::new(Mutex::new(vec![])));
    let mut payload = encode(&sample_report(&config)?)?;
    let vendor = btreemap! {
        "rack".to_owned() => json!(4),
        "shift".to_owned() => json!("B"),
    };
    payload["vendor"] = serde_json::to_value(&vendor)?;
    payload["root"]["steps"][0]["numericMeas"][0]["raw"] = json!([3.29, 3.31]);

    let decoded = decode(&payload)?;
    let vdd = decoded
        .report
        .step(2)
        .and_then(|n| n.measurements::<NumericMeasurement>())
        .and_then(|m| m.first())
        .map(|m| m.extensions().clone());
    assert_eq!(vdd.map(|e| e["raw"].clone()), Some(json!([3.29, 3.31])));

    let text = to_json_string(&decoded.report)?;
    assert_json_eq!(serde_json::from_str::<serde_json::Value>(&text)?, payload);
    Ok(())
}

#[test]
fn test_built_report_decodes_to_same_tree() -> Result<()> {
    let config = config(Arc::new(Mutex::new(vec![])));
    let mut report = sample_report(&config)?;
    report
        .root_sequence_mut()
        .add_string_value_step("fw")
        .add_named_test("main", StringTest::new("v1.2", CompOp::IgnoreCase).limit("V1.2"))?;

    let decoded = decode(&encode(&report)?)?;
    assert_eq!(decoded.report.steps(), report.steps());
    Ok(())
}

#[test]
fn test_step_id_overflow_is_schema_violation() {
    let payload = json!({
        "type": "T",
        "root": {"id": 18446744073709551615_u64, "stepType": "SequenceCall", "steps": [
            {"stepType": "Action"}
        ]}
    });
    assert!(matches!(decode(&payload), Err(WsjfError::SchemaViolation(_))));
}

#[test]
fn test_sequence_info_override_is_encoded() -> Result<()> {
    let config = config(Arc::new(Mutex::new(vec![])));
    let mut report = sample_report(&config)?;
    let mut info = SequenceInfo::new("leds_v2.seq", "2.0.1");
    info.path = Some("C:/seq/leds_v2.seq".to_owned());
    report
        .sequence_mut(3)
        .ok_or(anyhow!("no Leds sequence"))?
        .set_sequence_info(info);

    let encoded = encode(&report)?;
    assert_eq!(
        encoded["root"]["steps"][1]["seqCall"],
        json!({"path": "C:/seq/leds_v2.seq", "name": "leds_v2.seq", "version": "2.0.1"})
    );
    assert_eq!(decode(&encoded)?.report, report);
    Ok(())
}

#[test]
fn test_repair_report_round_trip() -> Result<()> {
    let guid = Uuid::parse_str("0b6a4f3e-2c1d-4e5f-8a9b-7c6d5e4f3a2b")?;
    let mut report = Report::builder(ReportKind::Repair, "PN-100", "SN-0001", "A", 500)
        .id(Ident::Exact(Uuid::parse_str(REPORT_ID)?))
        .operator("tech")
        .start(DATETIME)
        .build();
    if let Some(uur) = report.uur_mut() {
        uur.ref_uut = Some("8c1f0b8e-8a8e-4a55-9c1a-0d3f4b5a6c7d".to_owned());
        uur.test_operation_code = Some(10);
        uur.test_operation_name = Some("ICT".to_owned());
        uur.test_operation_guid = Some(guid);
    }
    report.add_failure("Component", "Shorted", Some("burnt"), Some("C14"), Some(2));
    report
        .root_sequence_mut()
        .add_chart_step(
            "ripple",
            Chart::new("Line")
                .x_axis("Time", "ms")
                .y_axis("Voltage", "V")
                .series(ChartSeries::new("3v3", &[0.0, 1.0, 2.0], &[3.3, 3.29, 3.31])),
        )
        .set_report_text("after rework");

    let expected = json!({
        "type": "R",
        "id": REPORT_ID,
        "pn": "PN-100",
        "sn": "SN-0001",
        "rev": "A",
        "processCode": 500,
        "start": DATETIME_FORMATTED,
        "startUTC": DATETIME_FORMATTED,
        "subUnits": [{
            "pn": "PN-100", "sn": "SN-0001", "rev": "A", "idx": 0,
            "failures": [{
                "category": "Component", "code": "Shorted", "comment": "burnt",
                "comRef": "C14", "refStepId": 2
            }]
        }],
        "uur": {
            "user": "tech",
            "refUUT": "8c1f0b8e-8a8e-4a55-9c1a-0d3f4b5a6c7d",
            "testOperationCode": 10,
            "testOperationName": "ICT",
            "testOperationGuid": "0b6a4f3e-2c1d-4e5f-8a9b-7c6d5e4f3a2b"
        },
        "root": {
            "id": 1,
            "group": "M",
            "stepType": "SequenceCall",
            "name": "MainSequence",
            "status": "D",
            "seqCall": {},
            "steps": [{
                "id": 2,
                "group": "M",
                "stepType": CHART_STEP_CODE,
                "name": "ripple",
                "status": "P",
                "reportText": "after rework",
                "chart": {
                    "chartType": "Line",
                    "xLabel": "Time", "xUnit": "ms",
                    "yLabel": "Voltage", "yUnit": "V",
                    "series": [{"dataType": "XYG", "name": "3v3", "xdata": "0;1;2", "ydata": "3.3;3.29;3.31"}]
                }
            }]
        }
    });

    let encoded = encode(&report)?;
    assert_json_eq!(encoded, expected);

    let decoded = decode(&encoded)?.report;
    assert_eq!(decoded, report);
    assert_eq!(decoded.count_failures(), 1);
    assert_eq!(decoded.all_failures().next().map(|f| f.ref_step_id), Some(Some(2)));
    let chart = decoded.step(2).and_then(|n| n.chart()).cloned();
    let ys = chart.map(|c| c.all_series()[0].y_values()).transpose()?;
    assert_eq!(ys, Some(vec![3.3, 3.29, 3.31]));
    Ok(())
}
