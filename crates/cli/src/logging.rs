//! Logging setup: console plus an append-only log file
//!
//! Every event goes to both sinks. Log file lines look like
//! `[2024-05-01 09:30:00Z] Copied file: /src/a.txt to /replica/a.txt`.

use std::fmt;
use std::fs::File;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Keeps the non-blocking file writer alive; drop it last to flush.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Install the global subscriber writing to the console and `log_file`.
pub fn init(log_file: File, verbose: bool) -> LogGuard {
    // A failing or slow file never blocks a sync cycle; lines are dropped instead.
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(LogLine);

    let console_level = if verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(console_level);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    LogGuard { _guard: guard }
}

/// `[<UTC timestamp>] <message>` with a level prefix on anything but INFO
struct LogLine;

impl<S, N> FormatEvent<S, N> for LogLine
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "[{}] ",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%SZ")
        )?;

        let level = *event.metadata().level();
        if level != Level::INFO {
            write!(writer, "{level}: ")?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .event_format(LogLine)
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_info_line_format() {
        let output = capture(|| tracing::info!("Deleted file: /replica/stale.txt"));

        let line = output.lines().next().unwrap();
        assert!(line.starts_with('['), "{line}");
        let (stamp, message) = line[1..].split_once("] ").unwrap();
        chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%SZ").unwrap();
        assert_eq!(message, "Deleted file: /replica/stale.txt");
    }

    #[test]
    fn test_warning_has_level_prefix() {
        let output = capture(|| tracing::warn!("broken link"));
        assert!(output.trim_end().ends_with("] WARN: broken link"), "{output}");
    }

    #[test]
    fn test_one_line_per_event() {
        let output = capture(|| {
            tracing::info!("Synchronization started.");
            tracing::info!("Synchronization completed.");
        });
        assert_eq!(output.lines().count(), 2);
    }
}
