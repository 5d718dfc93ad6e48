//! Reconciles the raw shapes produced by the two runners into one
//! [`ExecutionResult`].

use crate::core::language::Language;
use crate::core::types::{ExecutionResult, ExecutionStatus};

pub const SUCCESS_NO_OUTPUT: &str = "Code executed successfully (no output)";
pub const NO_OUTPUT: &str = "No output";

/// What the local sandbox captured from one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalOutcome {
    pub stdout: String,
    pub stderr: String,
    /// Failure message when the program raised, was killed, or never started.
    pub thrown: Option<String>,
}

/// What the remote execution service reported for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub signal: Option<String>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.code == Some(0) && self.signal.is_none()
    }
}

/// Stdout followed by stderr, with the empty-output placeholders applied.
pub fn combine_output(stdout: &str, stderr: &str, succeeded: bool) -> String {
    let mut output = String::with_capacity(stdout.len() + stderr.len());
    output.push_str(stdout);
    output.push_str(stderr);
    if output.is_empty() && succeeded {
        output.push_str(SUCCESS_NO_OUTPUT);
    }
    if output.is_empty() {
        output.push_str(NO_OUTPUT);
    }
    output
}

pub fn normalize_local(outcome: &LocalOutcome) -> ExecutionResult {
    let succeeded = outcome.thrown.is_none();
    let output_text = combine_output(&outcome.stdout, &outcome.stderr, succeeded);
    match &outcome.thrown {
        None => ExecutionResult {
            output_text,
            exit_code: Some(0),
            error_message: None,
            status: ExecutionStatus::Success,
        },
        Some(message) => ExecutionResult {
            output_text,
            exit_code: None,
            error_message: Some(message.clone()),
            status: ExecutionStatus::ProgramFailure,
        },
    }
}

pub fn normalize_remote(outcome: &RunOutcome) -> ExecutionResult {
    let succeeded = outcome.succeeded();
    let output_text = combine_output(&outcome.stdout, &outcome.stderr, succeeded);
    if succeeded {
        return ExecutionResult {
            output_text,
            exit_code: outcome.code,
            error_message: None,
            status: ExecutionStatus::Success,
        };
    }
    ExecutionResult {
        output_text,
        exit_code: outcome.code,
        error_message: Some(remote_error_message(outcome)),
        status: ExecutionStatus::ProgramFailure,
    }
}

fn remote_error_message(outcome: &RunOutcome) -> String {
    if !outcome.stderr.is_empty() {
        return outcome.stderr.clone();
    }
    match (&outcome.signal, outcome.code) {
        (Some(signal), _) => format!("Process terminated by signal {signal}"),
        (None, Some(code)) => format!("Process exited with code {code}"),
        (None, None) => "Process exited without a status code".to_string(),
    }
}

/// The execution service could not be reached or answered badly.
pub fn transport_failure(message: impl Into<String>) -> ExecutionResult {
    ExecutionResult {
        output_text: String::new(),
        exit_code: None,
        error_message: Some(message.into()),
        status: ExecutionStatus::TransportFailure,
    }
}

pub fn unsupported_language(language: Language) -> ExecutionResult {
    ExecutionResult {
        output_text: String::new(),
        exit_code: None,
        error_message: Some(format!("Unsupported language: {}", language.id())),
        status: ExecutionStatus::UnsupportedLanguage,
    }
}
