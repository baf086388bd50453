//! Cargo-style status output for treemirror
//!
//! ```text
//!    Mirroring /data/source
//!         Into /data/replica
//!      Logging /var/log/treemirror.log
//!        Every 10s
//! ```

use std::io::Write as _;

use tracing::info;

use crate::settings::Settings;

/// Status verbs for cargo-style output (right-aligned to 12 chars)
struct Status;

impl Status {
    const MIRRORING: &str = "Mirroring";
    const INTO: &str = "Into";
    const LOGGING: &str = "Logging";
    const EVERY: &str = "Every";
    const ONCE: &str = "Once";
}

/// Print a cargo-style status line
fn print_status(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().green().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

/// Announce the session on the terminal and in the log.
pub fn ready(settings: &Settings) {
    print_status(Status::MIRRORING, &settings.source.display().to_string());
    print_status(Status::INTO, &settings.replica.display().to_string());
    print_status(Status::LOGGING, &settings.log_file.display().to_string());
    if settings.once {
        print_status(Status::ONCE, "single cycle");
    } else {
        print_status(
            Status::EVERY,
            &format!("{}s (Ctrl+C to stop)", settings.interval.as_secs()),
        );
    }

    info!(
        "Program is ready for synchronization. Source path: {}. Replica path: {}. Log file path: {}. Synchronization interval: {} seconds.",
        settings.source.display(),
        settings.replica.display(),
        settings.log_file.display(),
        settings.interval.as_secs()
    );
}
