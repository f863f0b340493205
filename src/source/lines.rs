//! Newline-delimited JSON sample source.
//!
//! Each line is one sample in the same shape as a frame:
//! `{"t": 1234, "v": {"a": true, "lstick_x": 0.5, "lstick_x_raw": 160}}`.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

use retro_exporter_types::Sample;

use super::SampleSource;

/// Reads samples from any async byte stream (stdin, a file, a socket).
///
/// Blank lines are ignored. Lines that fail to parse are logged and skipped;
/// they do not end the stream.
#[derive(Debug)]
pub struct LineSource<R> {
    lines: Lines<BufReader<R>>,
    description: String,
    line_no: u64,
    rejected: u64,
}

impl<R> LineSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Wrap an async reader.
    pub fn new(reader: R, description: &str) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            description: format!("lines: {}", description),
            line_no: 0,
            rejected: 0,
        }
    }

    /// Number of lines that could not be parsed so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl<R> SampleSource for LineSource<R>
where
    R: AsyncRead + Unpin + Send + std::fmt::Debug,
{
    async fn next_sample(&mut self) -> Option<Sample> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    tracing::warn!(source = %self.description, error = %e, "read error");
                    return None;
                }
            };
            self.line_no += 1;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Sample>(line) {
                Ok(sample) => return Some(sample),
                Err(e) => {
                    self.rejected += 1;
                    tracing::warn!(line = self.line_no, error = %e, "skipping malformed sample");
                }
            }
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retro_exporter_types::Value;

    #[tokio::test]
    async fn test_reads_samples_in_order() {
        let data = b"{\"t\":1,\"v\":{\"a\":true}}\n{\"t\":2,\"v\":{\"x\":-3,\"y\":0.5}}\n";
        let mut source = LineSource::new(&data[..], "test");

        let first = source.next_sample().await.unwrap();
        assert_eq!(first.timestamp, 1);
        assert_eq!(first.get("a"), Some(&Value::Bool(true)));

        let second = source.next_sample().await.unwrap();
        assert_eq!(second.get("x"), Some(&Value::Int(-3)));
        assert_eq!(second.get("y"), Some(&Value::Float(0.5)));

        assert!(source.next_sample().await.is_none());
    }

    #[tokio::test]
    async fn test_skips_blank_and_malformed_lines() {
        let data = b"\n   \nnot json\n{\"t\":5}\n";
        let mut source = LineSource::new(&data[..], "test");

        let sample = source.next_sample().await.unwrap();
        assert_eq!(sample.timestamp, 5);
        assert!(sample.is_empty());
        assert_eq!(source.rejected(), 1);
    }

    #[test]
    fn test_description() {
        let source = LineSource::new(&b""[..], "stdin");
        assert_eq!(source.description(), "lines: stdin");
    }
}
