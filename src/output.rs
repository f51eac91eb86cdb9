//! Shared output formatting for taskraffle commands.
//!
//! Every command reports through one of two shapes: sectioned text for people,
//! or a versioned JSON envelope (`--json`) that scripts can key on `status`.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "taskraffle.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Text report: a header line followed by optional bulleted sections
#[derive(Debug, Clone, Default)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    /// Adds `- key: value`, or just `- key` when the value is empty.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;

        let summary: Vec<String> = self
            .summary
            .iter()
            .map(|(key, value)| match value.as_str() {
                "" => key.clone(),
                value => format!("{key}: {value}"),
            })
            .collect();
        let sections = [
            ("Summary", summary.as_slice()),
            ("Details", self.details.as_slice()),
            ("Warnings", self.warnings.as_slice()),
            ("Next steps", self.next_steps.as_slice()),
        ];
        for (title, items) in sections {
            if items.is_empty() {
                continue;
            }
            write!(f, "\n\n{title}:")?;
            for item in items {
                write!(f, "\n- {item}")?;
            }
        }
        Ok(())
    }
}

pub fn format_human(output: &HumanOutput) -> String {
    output.to_string()
}

#[derive(Serialize)]
struct Envelope<'a, B: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    body: B,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    next_steps: &'a [String],
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Body<'a, T: Serialize> {
    Success {
        data: &'a T,
        #[serde(skip_serializing_if = "<[String]>::is_empty")]
        warnings: &'a [String],
    },
    Error {
        error: ErrorBody,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn print_envelope<B: Serialize>(command: &str, body: B, next_steps: &[String]) -> Result<()> {
    let envelope = Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        body,
        next_steps,
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Report a successful command. `--json` wins over `--quiet`.
pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let (warnings, next_steps) = human
            .map(|h| (h.warnings.as_slice(), h.next_steps.as_slice()))
            .unwrap_or_default();
        return print_envelope(command, Body::Success { data, warnings }, next_steps);
    }
    if let (false, Some(human)) = (options.quiet, human) {
        println!("{human}");
    }
    Ok(())
}

/// Report a failed command: JSON on stdout, or `error:`/`hint:` lines on stderr.
pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        let error = ErrorBody {
            message: err.to_string(),
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        };
        let body: Body<'_, ()> = Body::Error { error };
        return print_envelope(command, body, &next_steps);
    }

    eprintln!("error: {err}");
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// Best-effort command name for error envelopes, read before clap parses
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from<I: Iterator<Item = String>>(mut args: I) -> String {
    let mut expects_value = false;
    let command = args.by_ref().find(|arg| {
        if std::mem::take(&mut expects_value) {
            return false;
        }
        if arg.starts_with('-') {
            expects_value = matches!(arg.as_str(), "--root" | "--events");
            return false;
        }
        true
    });

    match command.as_deref() {
        None => "taskraffle".to_string(),
        Some("types") => match args.find(|arg| !arg.starts_with('-')) {
            Some(sub) => format!("types {sub}"),
            None => "types".to_string(),
        },
        Some(other) => other.to_string(),
    }
}

fn error_kind(err: &Error) -> &'static str {
    if err.is_user_error() {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    let step = match err {
        Error::StoreNotInitialized(_) => "taskraffle init",
        Error::TaskNotFound(_) => "taskraffle list",
        Error::TaskTypeExists(_) => "taskraffle types list",
        Error::InvalidConfig(_) => "fix .taskraffle.toml then retry",
        Error::LockFailed(_) => "retry once other taskraffle commands finish",
        _ => return Vec::new(),
    };
    vec![step.to_string()]
}
