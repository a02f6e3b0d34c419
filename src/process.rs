/*!
 * Cancellable execution of external tools.
 *
 * The normalizer and the transcription CLI both run through
 * `run_cancellable`: the child's exit is raced against the job's
 * cancellation token (and an optional hard timeout). Losing the race kills
 * the child and waits for it to exit before returning; `kill_on_drop` covers
 * the caller's future being dropped mid-run.
 */

use std::ffi::OsStr;
use std::io;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::errors::ConversionError;

/// Fail with `Cancelled` if the token has fired
pub fn checkpoint(token: &CancellationToken, stage: &str) -> Result<(), ConversionError> {
    if token.is_cancelled() {
        debug!("Cancellation observed at checkpoint '{}'", stage);
        return Err(ConversionError::Cancelled(stage.to_string()));
    }
    Ok(())
}

/// Run `program` with `args`, killing it if `token` fires or `timeout` elapses
///
/// A missing binary maps to `ExternalToolUnavailable`, a non-zero exit to
/// `ExternalToolFailed` with the filtered stderr.
pub async fn run_cancellable<I, S>(
    program: &str,
    args: I,
    token: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<Output, ConversionError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    checkpoint(token, &format!("before {}", program))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    debug!("Started {} (pid {:?})", program, child.id());

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let timeout_future = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    let finish = {
        let exited = async {
            tokio::try_join!(child.wait(), read_pipe(stdout), read_pipe(stderr))
        };
        tokio::select! {
            result = exited => Finish::Exited(result),
            _ = token.cancelled() => Finish::Cancelled,
            _ = timeout_future => Finish::TimedOut,
        }
    };

    let output = match finish {
        Finish::Exited(result) => {
            let (status, stdout, stderr) = result
                .map_err(|e| ConversionError::Internal(format!("Failed to wait for {}: {}", program, e)))?;
            Output { status, stdout, stderr }
        }
        Finish::Cancelled => {
            stop_child(&mut child, program).await;
            warn!("Killed {} after cancellation", program);
            return Err(ConversionError::Cancelled(format!("during {}", program)));
        }
        Finish::TimedOut => {
            stop_child(&mut child, program).await;
            let secs = timeout.map(|t| t.as_secs()).unwrap_or_default();
            warn!("Killed {} after {} seconds", program, secs);
            return Err(ConversionError::tool_failed(program, format!("timed out after {} seconds", secs)));
        }
    };

    checkpoint(token, &format!("after {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(ConversionError::tool_failed(
            program,
            format!("exit status {}: {}", code, filter_tool_stderr(&stderr)),
        ));
    }

    Ok(output)
}

enum Finish {
    Exited(io::Result<(ExitStatus, Vec<u8>, Vec<u8>)>),
    Cancelled,
    TimedOut,
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buffer).await?;
    }
    Ok(buffer)
}

/// Kill the child and reap it, so it is gone once this returns
async fn stop_child(child: &mut Child, program: &str) {
    if let Err(e) = child.start_kill() {
        debug!("{} had already exited: {}", program, e);
    }
    if let Err(e) = child.wait().await {
        warn!("Failed to reap {}: {}", program, e);
    }
}

fn spawn_error(program: &str, error: io::Error) -> ConversionError {
    match error.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            ConversionError::tool_unavailable(program)
        }
        _ => ConversionError::Internal(format!("Failed to start {}: {}", program, error)),
    }
}

/// Keep only the meaningful lines of a tool's stderr
///
/// Strips the version banner, build configuration and stream metadata noise
/// that ffmpeg prints on every run.
pub fn filter_tool_stderr(stderr: &str) -> String {
    let noise_prefixes = [
        "ffmpeg version",
        "built with",
        "configuration:",
        "lib",
        "Input #",
        "Metadata:",
        "Duration:",
        "Stream #",
        "Output #",
        "Stream mapping:",
        "Press [q]",
        "size=",
    ];

    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !noise_prefixes.iter().any(|p| line.starts_with(p)))
        .collect();

    if meaningful.is_empty() {
        "no diagnostic output".to_string()
    } else {
        meaningful.join("\n")
    }
}
