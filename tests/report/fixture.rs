// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use assert_json_diff::assert_json_eq;
use serde_json::json;
use tokio::sync::Mutex;
use uuid::Uuid;

use tdm::report::{
    CompOp, Config, Ident, NumericTest, Report, ReportEmitter, ReportKind, TimestampProvider,
};

pub const DATETIME: chrono::DateTime<chrono::offset::Utc> =
    chrono::DateTime::from_timestamp_nanos(0);
pub const DATETIME_FORMATTED: &str = "1970-01-01T00:00:00.000Z";
pub const REPORT_ID: &str = "5f0c9a52-3c2e-4f6b-8d0e-2b7a1c9e4d31";

pub struct FixedTsProvider {}

impl TimestampProvider for FixedTsProvider {
    fn now(&self) -> chrono::DateTime<chrono_tz::Tz> {
        // all cases will use time 0 but this is configurable
        DATETIME.with_timezone(&chrono_tz::UTC)
    }
}

pub fn config(buffer: Arc<Mutex<Vec<String>>>) -> Config {
    Config::builder()
        .station_name("ST-01")
        .location("Line 3")
        .purpose("Production")
        .with_timestamp_provider(Box::new(FixedTsProvider {}))
        .with_buffer_output(buffer)
        .build()
}

pub fn report(config: &Config) -> Result<Report> {
    Ok(
        Report::builder(ReportKind::Test, "PN-100", "SN-0001", "A", 10)
            .id(Ident::Exact(Uuid::parse_str(REPORT_ID)?))
            .process_name("ICT")
            .operator("oper")
            .config(config)
            .build(),
    )
}

/// Root with one single mode numeric step and a nested sequence holding one
/// passing pass/fail step.
pub fn sample_report(config: &Config) -> Result<Report> {
    let mut report = report(config)?;
    let mut root = report.root_sequence_mut();

    root.add_numeric_limit_step("vdd")
        .add_single_test(NumericTest::new(3.3, CompOp::GeLe).limits(3.0, 3.6).unit("V"))?;
    root.add_sequence_call("Leds", "leds.seq", "1.0.0")
        .add_pass_fail_step("red")
        .add_single_test(true)?;

    Ok(report)
}

pub fn json_sample_report() -> serde_json::Value {
    json!({
        "type": "T",
        "id": REPORT_ID,
        "pn": "PN-100",
        "sn": "SN-0001",
        "rev": "A",
        "processCode": 10,
        "processName": "ICT",
        "machineName": "ST-01",
        "location": "Line 3",
        "purpose": "Production",
        "start": DATETIME_FORMATTED,
        "startUTC": DATETIME_FORMATTED,
        "uut": {"user": "oper"},
        "root": {
            "id": 1,
            "group": "M",
            "stepType": "SequenceCall",
            "name": "MainSequence",
            "status": "D",
            "seqCall": {},
            "steps": [
                {
                    "id": 2,
                    "group": "M",
                    "stepType": "ET_NLT",
                    "name": "vdd",
                    "status": "P",
                    "numericMeas": [{
                        "compOp": "GELE",
                        "status": "P",
                        "unit": "V",
                        "value": 3.3,
                        "lowLimit": 3.0,
                        "highLimit": 3.6
                    }]
                },
                {
                    "id": 3,
                    "group": "M",
                    "stepType": "SequenceCall",
                    "name": "Leds",
                    "status": "D",
                    "seqCall": {"path": "leds.seq", "name": "leds.seq", "version": "1.0.0"},
                    "steps": [{
                        "id": 4,
                        "group": "M",
                        "stepType": "ET_PFT",
                        "name": "red",
                        "status": "P",
                        "booleanMeas": [{"status": "P"}]
                    }]
                }
            ]
        }
    })
}

/// Runs `test_fn` against an emitter writing into a buffer, then checks
/// every written line against `expected`.
pub async fn check_submitted<F, R>(expected: &[serde_json::Value], test_fn: F) -> Result<()>
where
    R: Future<Output = Result<()>>,
    F: FnOnce(ReportEmitter) -> R,
{
    let buffer: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(vec![]));
    let emitter = ReportEmitter::new(config(buffer.clone()));

    test_fn(emitter).await?;

    let lines = buffer.lock().await;
    assert_eq!(lines.len(), expected.len());
    for (i, entry) in lines.iter().enumerate() {
        let value = serde_json::from_str::<serde_json::Value>(entry)?;
        assert_json_eq!(value, expected[i]);
    }

    Ok(())
}
