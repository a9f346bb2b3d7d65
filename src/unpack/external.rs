use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use super::{UnpackError, UnpackOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 外部工具输出中表示"格式不支持"的标记 (小写)
const UNSUPPORTED_MARKERS: &[&str] = &[
    "unsupported",
    "unrecognized",
    "not supported",
    "unknown image",
    "not a valid",
    "can not open the file as archive",
    "bad magic",
];

#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// 输出中是否包含"格式不支持"之类的提示
    pub fn reports_unsupported(&self) -> bool {
        let text = self.combined().to_lowercase();
        UNSUPPORTED_MARKERS.iter().any(|marker| text.contains(marker))
    }

    /// 最后一行非空输出，用作错误原因
    pub fn last_line(&self) -> String {
        let combined = self.combined();
        combined
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
            .to_string()
    }
}

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("找不到外部工具 {0}")]
    NotFound(String),

    #[error("{program} 超过 {secs} 秒未结束，已终止")]
    TimedOut { program: String, secs: u64 },

    #[error("运行 {program} 失败: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// 运行外部工具，超时后终止子进程
pub fn run_tool(mut cmd: Command, timeout: Duration) -> Result<ToolOutput, ToolError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    debug!("{:?}", cmd);

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ToolError::NotFound(program.clone()),
        _ => ToolError::Io {
            program: program.clone(),
            source,
        },
    })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        let polled = child.try_wait().map_err(|source| ToolError::Io {
            program: program.clone(),
            source,
        })?;
        if let Some(status) = polled {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            // 孙进程可能仍持有管道，不等待读取线程
            return Err(ToolError::TimedOut {
                program,
                secs: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(ToolOutput {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        buffer
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
        .unwrap_or_default()
}

/// 将外部工具的结果归类为解包结果
pub fn classify(
    tool: &str,
    result: Result<ToolOutput, ToolError>,
    dest: &Path,
) -> UnpackOutcome {
    match result {
        Ok(output) if output.status.success() => UnpackOutcome::Unpacked(dest.to_path_buf()),
        Ok(output) if output.reports_unsupported() => UnpackOutcome::NotAnImage,
        Ok(output) => UnpackOutcome::Failed(UnpackError::new(
            tool,
            format!("{} ({})", output.status, output.last_line()),
        )),
        Err(err) => UnpackOutcome::Failed(UnpackError::new(tool, err)),
    }
}
