use crate::logger;

/// Print the full error chain before the process exits non-zero.
pub fn log_error(error: anyhow::Error) {
    logger::new_empty_line();
    eprintln!("error: {error:#}");
}
