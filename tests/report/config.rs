// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use assert_fs::prelude::*;
use assert_json_diff::assert_json_eq;
use async_trait::async_trait;
use predicates::prelude::*;
use tokio::sync::Mutex;
use uuid::Uuid;

use tdm::report::{Config, ReportEmitter, Writer};

use super::fixture::*;

#[tokio::test]
async fn test_config_builder_with_file() -> Result<()> {
    let fs = assert_fs::TempDir::new()?;
    let output_file = fs.child("reports.jsonl");

    let config = Config::builder()
        .timezone(chrono_tz::Europe::Rome)
        .station_name("ST-01")
        .location("Line 3")
        .purpose("Production")
        .with_timestamp_provider(Box::new(FixedTsProvider {}))
        .with_file_output(output_file.path())
        .await?
        .build();
    let emitter = ReportEmitter::new(config);

    let report = sample_report(emitter.config())?;
    emitter.submit(&report).await?;

    output_file.assert(predicate::path::exists());
    output_file.assert(predicate::str::contains(REPORT_ID));

    let content = fs::read_to_string(output_file.path())?;
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    assert_json_eq!(
        serde_json::from_str::<serde_json::Value>(lines[0])?,
        json_sample_report()
    );

    let fetched = emitter.fetch(&report.id()).await?;
    assert_eq!(fetched.report, report);
    Ok(())
}

struct CollectingWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Writer for CollectingWriter {
    async fn write(&self, s: &str) -> Result<(), std::io::Error> {
        self.lines.lock().await.push(format!("custom:{s}"));
        Ok(())
    }
}

#[tokio::test]
async fn test_config_builder_with_custom_writer() -> Result<()> {
    let lines = Arc::new(Mutex::new(vec![]));
    let config = Config::builder()
        .with_custom_output(Box::new(CollectingWriter {
            lines: lines.clone(),
        }))
        .build();
    let emitter = ReportEmitter::new(config);

    let report = report(emitter.config())?;
    emitter.submit(&report).await?;

    let lines = lines.lock().await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("custom:{"));

    // the default fetch of a custom writer finds nothing
    let missing = emitter.fetch(&Uuid::parse_str(REPORT_ID)?).await;
    assert!(missing.is_err());
    Ok(())
}

#[test]
fn test_config_defaults_reach_report() -> Result<()> {
    let config = config(Arc::new(Mutex::new(vec![])));
    let report = report(&config)?;

    assert_eq!(report.station_name(), Some("ST-01"));
    assert_eq!(report.location(), Some("Line 3"));
    assert_eq!(report.purpose(), Some("Production"));
    assert_eq!(report.start_utc(), Some(DATETIME));
    Ok(())
}
