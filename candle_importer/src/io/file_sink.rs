use std::{
    fmt,
    fs::{self, File},
    path::{Path, PathBuf},
    str::FromStr,
};

use async_trait::async_trait;
use polars::frame::DataFrame;
use polars_io::{SerWriter, csv::write::CsvWriter, ipc::IpcWriter};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::info;

use crate::{
    interpolate::CandleTable,
    io::{
        dataframe::table_to_dataframe,
        sink::{CreateDirSnafu, DataSink, PolarsSnafu, SinkError, TaskSnafu, WriteSnafu},
    },
};

/// On-disk format of the export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    /// Arrow IPC, readable by polars, pandas and pyarrow.
    Feather,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Feather => "feather",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "feather" | "ipc" | "arrow" => Ok(Self::Feather),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Writes one file per import into a directory, replacing any file with the
/// same name.
#[derive(Clone, Debug)]
pub struct FileSink {
    dir: PathBuf,
    format: OutputFormat,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// Destination for `name` in this sink's directory.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_file_name(name), self.format.extension()))
    }
}

#[async_trait]
impl DataSink for FileSink {
    type Output = PathBuf;

    async fn write(&self, table: &CandleTable, name: &str) -> Result<PathBuf, SinkError> {
        let df = table_to_dataframe(table)?;
        let dir = self.dir.clone();
        let path = self.path_for(name);
        let format = self.format;

        let (path, rows) = tokio::task::spawn_blocking(move || {
            write_file(&dir, &path, format, df).map(|rows| (path, rows))
        })
        .await
        .context(TaskSnafu)??;

        info!(path = %path.display(), rows, "export written");
        Ok(path)
    }
}

/// Creates `dir` if needed and writes `df` to `path`, returning the row count.
fn write_file(
    dir: &Path,
    path: &Path,
    format: OutputFormat,
    mut df: DataFrame,
) -> Result<usize, SinkError> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir).context(CreateDirSnafu { path: dir })?;
    }
    let mut file = File::create(path).context(WriteSnafu { path })?;

    match format {
        OutputFormat::Csv => CsvWriter::new(&mut file)
            .include_header(true)
            .with_datetime_format(Some("%Y-%m-%d %H:%M:%S".to_string()))
            .finish(&mut df),
        OutputFormat::Feather => IpcWriter::new(&mut file).finish(&mut df),
    }
    .context(PolarsSnafu)?;
    Ok(df.height())
}

/// Replaces characters that would change the directory a name lands in.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '-',
            c => c,
        })
        .collect()
}

/// True if `path` has the extension this format writes.
pub fn has_format_extension(path: &Path, format: OutputFormat) -> bool {
    path.extension().is_some_and(|ext| ext == format.extension())
}
