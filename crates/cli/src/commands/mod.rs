pub mod config;
pub mod doctor;

/// Outcome of a CLI command: what to print and what exit code to return.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}
