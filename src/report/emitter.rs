// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::sync::atomic::{self, Ordering};
use std::sync::Arc;

use tracing::debug;
use unwrap_infallible::UnwrapInfallible;
use uuid::Uuid;

use crate::report::{self as tr, serializer, Config, Report, WsjfError};
use tr::writer::WriterType;

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub accepted: bool,
    pub assigned_id: Uuid,
    /// Zero based count of reports submitted through this emitter.
    pub sequence_number: u64,
}

/// Hands encoded reports to the configured output and reads them back.
///
/// # Examples
///
/// ```rust
/// # tokio_test::block_on(async {
/// # use std::sync::Arc;
/// # use tokio::sync::Mutex;
/// # use tdm::report::*;
/// let buffer = Arc::new(Mutex::new(vec![]));
/// let emitter = ReportEmitter::new(Config::builder().with_buffer_output(buffer).build());
///
/// let report = Report::builder(ReportKind::Test, "PN", "SN", "A", 10).build();
/// let receipt = emitter.submit(&report).await?;
/// let fetched = emitter.fetch(&receipt.assigned_id).await?;
/// assert_eq!(fetched.report.sn(), "SN");
///
/// # Ok::<(), WsjfError>(())
/// # });
/// ```
pub struct ReportEmitter {
    config: Config,
    seqno: Arc<atomic::AtomicU64>,
}

impl ReportEmitter {
    pub fn new(config: Config) -> Self {
        ReportEmitter {
            config,
            seqno: Arc::new(atomic::AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn incr_seqno(&self) -> u64 {
        self.seqno.fetch_add(1, Ordering::AcqRel)
    }

    /// Validates, encodes and writes `report` as one json line.
    pub async fn submit(&self, report: &Report) -> Result<SubmitReceipt, WsjfError> {
        report.validate()?;
        let payload = serializer::to_json_string(report)?;

        match &self.config.writer {
            WriterType::File(file) => file.write(&payload).await?,
            WriterType::Stdout(stdout) => stdout.write(&payload).await.unwrap_infallible(),
            WriterType::Buffer(buffer) => buffer.write(&payload).await.unwrap_infallible(),

            WriterType::Custom(custom) => custom.write(&payload).await?,
        }

        let sequence_number = self.incr_seqno();
        debug!(report_id = %report.id(), sequence_number, "report submitted");

        Ok(SubmitReceipt {
            accepted: true,
            assigned_id: report.id(),
            sequence_number,
        })
    }

    /// Reads back the latest report written under `id`.
    pub async fn fetch(&self, id: &Uuid) -> Result<serializer::Decoded, WsjfError> {
        let payload = match &self.config.writer {
            WriterType::File(file) => file.fetch(id).await?,
            WriterType::Stdout(_) => None,
            WriterType::Buffer(buffer) => buffer.fetch(id).await.unwrap_infallible(),

            WriterType::Custom(custom) => custom.fetch(id).await?,
        };

        let payload = payload.ok_or(WsjfError::NotFound(*id))?;
        debug!(report_id = %id, "report fetched");
        serializer::from_json_str(&payload)
    }
}
