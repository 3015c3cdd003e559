// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::report::writer::{self, WriterType};

/// Station wide settings: clock, station identity and report output.
pub struct Config {
    pub(crate) timestamp_provider: Box<dyn TimestampProvider + Send + Sync + 'static>,
    pub(crate) station_name: Option<String>,
    pub(crate) location: Option<String>,
    pub(crate) purpose: Option<String>,
    pub(crate) writer: WriterType,
}

impl Config {
    /// Creates a new [`ConfigBuilder`]
    ///
    /// # Examples
    /// ```rust
    /// # use tdm::report::*;
    ///
    /// let builder = Config::builder();
    /// ```
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn timestamp_provider(&self) -> &(dyn TimestampProvider + Send + Sync + 'static) {
        &*self.timestamp_provider
    }

    pub fn station_name(&self) -> Option<&str> {
        self.station_name.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

/// The builder for the [`Config`] object.
pub struct ConfigBuilder {
    timezone: Option<chrono_tz::Tz>,
    timestamp_provider: Option<Box<dyn TimestampProvider + Send + Sync + 'static>>,
    station_name: Option<String>,
    location: Option<String>,
    purpose: Option<String>,
    writer: Option<WriterType>,
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            timezone: None,
            timestamp_provider: None,
            station_name: None,
            location: None,
            purpose: None,
            writer: Some(WriterType::Stdout(writer::StdoutWriter::new())),
        }
    }

    /// Zone used for the start time of reports built without an explicit one.
    pub fn timezone(mut self, timezone: chrono_tz::Tz) -> Self {
        self.timezone = Some(timezone);
        self
    }

    pub fn with_timestamp_provider(
        mut self,
        timestamp_provider: Box<dyn TimestampProvider + Send + Sync + 'static>,
    ) -> Self {
        self.timestamp_provider = Some(timestamp_provider);
        self
    }

    pub fn station_name(mut self, name: &str) -> Self {
        self.station_name = Some(name.to_owned());
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

    pub fn with_buffer_output(mut self, buffer: Arc<Mutex<Vec<String>>>) -> Self {
        self.writer = Some(WriterType::Buffer(writer::BufferWriter::new(buffer)));
        self
    }

    /// Appends one report per line to the file at `path`, creating it.
    pub async fn with_file_output<P: AsRef<Path>>(
        mut self,
        path: P,
    ) -> Result<Self, std::io::Error> {
        self.writer = Some(WriterType::File(writer::FileWriter::new(path).await?));
        Ok(self)
    }

    pub fn with_custom_output(
        mut self,
        custom: Box<dyn writer::Writer + Send + Sync + 'static>,
    ) -> Self {
        self.writer = Some(WriterType::Custom(custom));
        self
    }

    pub fn build(self) -> Config {
        let timezone = self.timezone.unwrap_or(chrono_tz::UTC);

        Config {
            timestamp_provider: self
                .timestamp_provider
                .unwrap_or(Box::new(ConfiguredTzProvider { tz: timezone })),
            station_name: self.station_name,
            location: self.location,
            purpose: self.purpose,
            writer: self
                .writer
                .unwrap_or(WriterType::Stdout(writer::StdoutWriter::new())),
        }
    }
}

/// Source of "now" for report start times.
pub trait TimestampProvider {
    fn now(&self) -> chrono::DateTime<chrono_tz::Tz>;
}

struct ConfiguredTzProvider {
    tz: chrono_tz::Tz,
}

impl TimestampProvider for ConfiguredTzProvider {
    fn now(&self) -> chrono::DateTime<chrono_tz::Tz> {
        chrono::Utc::now().with_timezone(&self.tz)
    }
}
