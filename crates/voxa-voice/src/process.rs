//! Runs local model binaries (whisper.cpp, piper, espeak-ng) as child
//! processes.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Spawns `command`, feeds `stdin` (if any) and collects stdout.
///
/// Returns a human-readable message on failure; callers wrap it in the
/// error variant of their stage. The child is killed if it outlives
/// `timeout`.
pub(crate) async fn run(
    mut command: Command,
    label: &str,
    stdin: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<Vec<u8>, String> {
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| format!("failed to spawn {}: {}", label, e))?;

    // Write from a separate task so a child that fills its stdout pipe before
    // draining stdin cannot deadlock us.
    let write_task = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => Some(tokio::spawn(async move {
            pipe.write_all(&input).await?;
            pipe.shutdown().await
        })),
        (Some(_), None) => return Err(format!("failed to open {} stdin", label)),
        _ => None,
    };

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| format!("{} timed out after {} seconds", label, timeout.as_secs()))?
        .map_err(|e| format!("failed to wait for {}: {}", label, e))?;

    if let Some(task) = write_task {
        match task.await {
            Ok(Ok(())) => {}
            // The child may exit successfully without reading all of its input.
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(format!("failed to write to {} stdin: {}", label, e)),
            Err(e) => return Err(format!("{} stdin task failed: {}", label, e)),
        }
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("{} failed: {}", label, stderr.trim()));
    }

    Ok(output.stdout)
}
