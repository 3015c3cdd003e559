// (c) Meta Platforms, Inc. and affiliates.
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::convert::Infallible;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Destination for serialized reports.
///
/// `fetch` returns the latest payload previously written for `id`, when the
/// output can be read back.
#[async_trait]
pub trait Writer {
    async fn write(&self, s: &str) -> Result<(), io::Error>;

    async fn fetch(&self, _id: &Uuid) -> Result<Option<String>, io::Error> {
        Ok(None)
    }
}

pub enum WriterType {
    // optimization: static dispatch for these known types
    Stdout(StdoutWriter),
    File(FileWriter),
    Buffer(BufferWriter),

    Custom(Box<dyn Writer + Send + Sync + 'static>),
}

/// Last line whose top level `id` equals `id`.
fn find_payload<'a, I>(lines: I, id: &Uuid) -> Option<String>
where
    I: DoubleEndedIterator<Item = &'a str>,
{
    let wanted = id.to_string();
    lines.rev().find_map(|line| {
        let value = serde_json::from_str::<serde_json::Value>(line).ok()?;
        value
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|v| v.eq_ignore_ascii_case(&wanted))
            .map(|_| line.to_owned())
    })
}

pub struct FileWriter {
    path: PathBuf,
    file: Arc<Mutex<fs::File>>,
}

impl FileWriter {
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, io::Error> {
        let file = fs::File::create(path.as_ref()).await?;
        Ok(FileWriter {
            path: path.as_ref().to_path_buf(),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub async fn write(&self, s: &str) -> Result<(), io::Error> {
        let mut handle = self.file.lock().await;

        let mut buf = Vec::<u8>::new();
        writeln!(buf, "{}", s)?;

        handle.write_all(&buf).await?;
        handle.flush().await?;

        Ok(())
    }

    pub async fn fetch(&self, id: &Uuid) -> Result<Option<String>, io::Error> {
        // hold the lock so a concurrent write cannot be read half-way
        let _handle = self.file.lock().await;
        let content = fs::read_to_string(&self.path).await?;
        Ok(find_payload(content.lines(), id))
    }
}

#[derive(Debug)]
pub struct BufferWriter {
    buffer: Arc<Mutex<Vec<String>>>,
}

impl BufferWriter {
    pub fn new(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        Self { buffer }
    }

    pub async fn write(&self, s: &str) -> Result<(), Infallible> {
        self.buffer.lock().await.push(s.to_string());
        Ok(())
    }

    pub async fn fetch(&self, id: &Uuid) -> Result<Option<String>, Infallible> {
        let buffer = self.buffer.lock().await;
        Ok(find_payload(buffer.iter().map(String::as_str), id))
    }
}

#[derive(Debug, Clone)]
pub struct StdoutWriter {}

#[allow(clippy::new_without_default)]
impl StdoutWriter {
    pub fn new() -> Self {
        StdoutWriter {}
    }

    pub async fn write(&self, s: &str) -> Result<(), Infallible> {
        println!("{}", s);
        Ok(())
    }
}
