//! TeX → vector rendering.

use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::StageError;

/// Argument placeholder replaced by the expression.
pub const TEX_PLACEHOLDER: &str = "{tex}";

/// Marks the end of options, so an expression like `-x` stays an operand.
pub const END_OF_OPTIONS: &str = "--";

/// Renders an expression to vector markup.
///
/// Implementations need not be bounded in time; the pipeline races every
/// call against its deadline.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, expression: &str) -> Result<Bytes, StageError>;
}

/// Renders by running an external program, e.g. MathJax's `tex2svg`.
///
/// The expression replaces every `{tex}` in the configured arguments, and a
/// `--` is inserted before the first such argument unless the configured
/// arguments already end options earlier. When no argument contains the
/// placeholder, the expression is written to the program's stdin instead.
/// The markup is read from stdout.
///
/// A non-zero exit status, empty output, or output containing no `<svg`
/// element counts as a render failure.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn takes_argument(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(TEX_PLACEHOLDER))
    }

    /// The argument vector for `expression`.
    fn command_args(&self, expression: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        let mut options_ended = false;

        for arg in &self.args {
            if arg == END_OF_OPTIONS {
                options_ended = true;
            } else if !options_ended && arg.contains(TEX_PLACEHOLDER) {
                args.push(END_OF_OPTIONS.to_string());
                options_ended = true;
            }
            args.push(arg.replace(TEX_PLACEHOLDER, expression));
        }

        args
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(&self, expression: &str) -> Result<Bytes, StageError> {
        let via_argument = self.takes_argument();

        let mut command = Command::new(&self.program);
        command
            .args(self.command_args(expression))
            .stdin(if via_argument {
                Stdio::null()
            } else {
                Stdio::piped()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            StageError::render(format!("failed to start {}: {}", self.program, e))
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(expression.as_bytes())
                .await
                .map_err(|e| StageError::render(format!("failed to write expression: {}", e)))?;
            // Closing stdin signals end of input
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| StageError::render(format!("{} did not complete: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::render(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        if !contains_svg(&output.stdout) {
            return Err(StageError::render(format!(
                "{} produced no SVG markup",
                self.program
            )));
        }

        debug!(
            program = %self.program,
            bytes = output.stdout.len(),
            "Rendered expression"
        );

        Ok(Bytes::from(output.stdout))
    }
}

fn contains_svg(output: &[u8]) -> bool {
    output.windows(4).any(|window| window == b"<svg")
}
