//! Subprocess helpers shared by the ffmpeg and tesseract integrations.

use regex_lite::Regex;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::error::ToolError;

/// Captured output of a finished tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Lines of stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

fn spawn_error(tool: &str, program: &Path, e: std::io::Error) -> ToolError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ToolError::NotFound {
            tool: tool.to_string(),
            path: program.to_path_buf(),
        }
    } else {
        ToolError::Io(e)
    }
}

fn missing_pipe(name: &str) -> ToolError {
    ToolError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("{} was not captured", name),
    ))
}

/// Runs `program` to completion and captures both output streams.
///
/// The process is killed when it outlives `timeout_secs`.
pub async fn run_command(
    tool: &str,
    program: &Path,
    args: &[String],
    timeout_secs: u64,
) -> Result<ToolOutput, ToolError> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(tool, program, e))?;

    let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await
    {
        Ok(result) => result?,
        // Dropping the future drops the child, which kills it.
        Err(_) => {
            return Err(ToolError::Timeout {
                tool: tool.to_string(),
                timeout_secs,
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            code: output.status.code(),
            stderr: (!stderr.trim().is_empty()).then(|| stderr.trim().to_string()),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Runs ffmpeg with `-progress pipe:2` and forwards the encoded position as a
/// fraction of `duration_secs` to `on_progress`.
///
/// Progress key/value lines are consumed; the remaining stderr lines are kept
/// (last few only) for the error report.
pub async fn run_with_progress<F>(
    tool: &str,
    program: &Path,
    args: &[String],
    timeout_secs: u64,
    duration_secs: f64,
    mut on_progress: F,
) -> Result<ToolOutput, ToolError>
where
    F: FnMut(f64) + Send,
{
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(tool, program, e))?;

    let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
    let mut stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).to_string()
    });

    let time_regex = Regex::new(r"^out_time_(?:ms|us)=(\d+)").ok();
    let mut reader = BufReader::new(stderr);

    let result = timeout(Duration::from_secs(timeout_secs), async {
        let mut tail: Vec<String> = Vec::new();
        let mut raw = Vec::new();

        // Read to EOF even past non-UTF-8 lines, or the child blocks on a full pipe
        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw).await? == 0 {
                break;
            }
            let decoded = String::from_utf8_lossy(&raw);
            let line = decoded.trim_end_matches(['\n', '\r']);

            if let Some(caps) = time_regex.as_ref().and_then(|re| re.captures(line)) {
                // out_time_ms is reported in microseconds
                if let Some(us) = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
                    if duration_secs > 0.0 {
                        on_progress((us / 1_000_000.0 / duration_secs).min(1.0));
                    }
                }
                continue;
            }
            if is_progress_line(line) {
                continue;
            }
            tail.push(line.to_string());
            if tail.len() > STDERR_TAIL_LINES {
                tail.remove(0);
            }
        }

        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, tail.join("\n")))
    })
    .await;

    let (status, stderr) = match result {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => return Err(ToolError::Io(e)),
        Err(_) => {
            let _ = child.kill().await;
            return Err(ToolError::Timeout {
                tool: tool.to_string(),
                timeout_secs,
            });
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();

    if !status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            code: status.code(),
            stderr: (!stderr.trim().is_empty()).then(|| stderr.trim().to_string()),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Whether `line` belongs to ffmpeg's `-progress` key/value block.
fn is_progress_line(line: &str) -> bool {
    const KEYS: [&str; 12] = [
        "frame", "fps", "stream_", "bitrate", "total_size", "out_time", "dup_frames",
        "drop_frames", "speed", "progress", "size", "time",
    ];
    match line.split_once('=') {
        Some((key, _)) => KEYS.iter().any(|k| key.starts_with(k)) && !key.contains(' '),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_lines() {
        assert!(is_progress_line("out_time_ms=1500000"));
        assert!(is_progress_line("progress=continue"));
        assert!(is_progress_line("speed=2.5x"));
        assert!(!is_progress_line("Error opening input file talk.mp4."));
        assert!(!is_progress_line("[mp4 @ 0x55] moov atom not found"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_not_found() {
        let err = run_command(
            "ffprobe",
            Path::new("/nonexistent/bin/ffprobe"),
            &["-version".to_string()],
            5,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_with_progress() {
        let err = run_with_progress(
            "ffmpeg",
            Path::new("/nonexistent/bin/ffmpeg"),
            &[],
            5,
            10.0,
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ToolError::NotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_stderr_is_drained() {
        // ~320 KB of stderr after an invalid byte, well past a pipe buffer
        let script = r#"
printf 'bad \377 byte\n' >&2
printf 'out_time_ms=5000000\n' >&2
i=0
while [ $i -lt 5000 ]; do
  echo 'xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx' >&2
  i=$((i+1))
done
echo done
exit 0
"#;
        let mut reported = Vec::new();
        let output = run_with_progress(
            "sh",
            Path::new("/bin/sh"),
            &["-c".to_string(), script.to_string()],
            30,
            10.0,
            |p| reported.push(p),
        )
        .await
        .unwrap();

        assert_eq!(output.stdout.trim(), "done");
        assert_eq!(reported, vec![0.5]);
        assert_eq!(output.stderr.lines().count(), STDERR_TAIL_LINES);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_keeps_lossy_stderr_tail() {
        let err = run_with_progress(
            "sh",
            Path::new("/bin/sh"),
            &["-c".to_string(), "printf 'cannot open \\377.mp4\\n' >&2; exit 3".to_string()],
            30,
            10.0,
            |_| {},
        )
        .await
        .unwrap_err();

        match err {
            ToolError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                let stderr = stderr.unwrap();
                assert!(stderr.starts_with("cannot open "), "{}", stderr);
                assert!(stderr.contains('\u{FFFD}'), "{}", stderr);
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
