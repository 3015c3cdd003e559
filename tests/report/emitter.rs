// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use tdm::report::{ReportKind, StepStatus, WsjfError};

use super::fixture::*;

#[tokio::test]
async fn test_submit_sample_report() -> Result<()> {
    check_submitted(&[json_sample_report()], |emitter| async move {
        let report = sample_report(emitter.config())?;
        let receipt = emitter.submit(&report).await?;

        assert!(receipt.accepted);
        assert_eq!(receipt.assigned_id.to_string(), REPORT_ID);
        assert_eq!(receipt.sequence_number, 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_sequence_numbers_count_submissions() -> Result<()> {
    let mut second = json_sample_report();
    second["result"] = json!("F");

    check_submitted(&[json_sample_report(), second], |emitter| async move {
        let mut report = sample_report(emitter.config())?;
        let first = emitter.submit(&report).await?;

        report.set_result(StepStatus::Failed);
        let next = emitter.submit(&report).await?;

        assert_eq!((first.sequence_number, next.sequence_number), (0, 1));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_invalid_report_is_not_written() -> Result<()> {
    check_submitted(&[], |emitter| async move {
        let mut report = report(emitter.config())?;
        report.set_pn("  ");

        let res = emitter.submit(&report).await;
        assert!(matches!(res, Err(WsjfError::SchemaViolation(_))));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_fetch_returns_latest_submission() -> Result<()> {
    let mut second = json_sample_report();
    second["result"] = json!("P");

    check_submitted(&[json_sample_report(), second], |emitter| async move {
        let mut report = sample_report(emitter.config())?;
        emitter.submit(&report).await?;
        report.set_result(StepStatus::Passed);
        emitter.submit(&report).await?;

        let fetched = emitter.fetch(&report.id()).await?;
        assert_eq!(fetched.report.kind(), ReportKind::Test);
        assert_eq!(fetched.report.result(), Some(StepStatus::Passed));
        assert_eq!(fetched.report, report);

        let missing = Uuid::new_v4();
        let res = emitter.fetch(&missing).await;
        assert!(matches!(res, Err(WsjfError::NotFound(id)) if id == missing));
        Ok(())
    })
    .await
}
