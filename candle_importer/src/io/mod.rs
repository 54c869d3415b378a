pub mod dataframe;
pub mod file_sink;
pub mod sink;

pub use file_sink::{FileSink, OutputFormat};
pub use sink::{DataSink, SinkError};
