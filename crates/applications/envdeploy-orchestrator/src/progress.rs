//! Progress sinks for stack operations

use envdeploy_core::ProgressWriter;
use std::io::Write;
use tracing::info;

/// Emits each progress line as a tracing event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressWriter for TracingProgress {
    fn write_line(&self, line: &str) {
        info!(target: "envdeploy::stack", "{}", line);
    }
}

/// Prints timestamped progress lines to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    fn format_line(now: chrono::DateTime<chrono::Local>, line: &str) -> String {
        format!("[{}] {}", now.format("%H:%M:%S"), line)
    }
}

impl ProgressWriter for ConsoleProgress {
    fn write_line(&self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        // Ignore write errors on a closed stdout.
        let _ = writeln!(stdout, "{}", Self::format_line(chrono::Local::now(), line));
    }
}
