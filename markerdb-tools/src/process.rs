//! Streaming subprocess runner
//!
//! Standard output is read on a background thread and handed over line by
//! line through a bounded channel, so a tool producing millions of lines is
//! never buffered whole. Standard error is collected separately and quoted
//! in the error when the tool fails. An optional deadline covers the whole
//! run; when it passes the child is killed.

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use markerdb_core::{MarkerDbError, MarkerDbResult};
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Lines of stdout buffered between the reader thread and the consumer
const LINE_BUFFER: usize = 1024;

/// Lines of stderr quoted in error messages
const STDERR_TAIL_LINES: usize = 20;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct ToolProcess {
    program: String,
    child: Child,
    lines: Receiver<std::io::Result<String>>,
    stderr: Option<JoinHandle<String>>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    finished: bool,
}

impl ToolProcess {
    /// Start `command` with piped stdout and stderr. Stdin is left as the
    /// caller configured it.
    pub fn spawn(mut command: Command, timeout: Option<Duration>) -> MarkerDbResult<Self> {
        let program = command.get_program().to_string_lossy().into_owned();
        tracing::debug!("Running {:?}", command);

        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|e| {
            MarkerDbError::ClusterToolFailed(format!("could not start {}: {}", program, e))
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MarkerDbError::ClusterToolFailed(format!("{}: stdout was not captured", program))
        })?;
        let (sender, lines) = channel::bounded(LINE_BUFFER);
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let failed = line.is_err();
                if sender.send(line).is_err() || failed {
                    break;
                }
            }
        });

        let stderr = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut captured = Vec::new();
                let _ = stderr.read_to_end(&mut captured);
                String::from_utf8_lossy(&captured).into_owned()
            })
        });

        Ok(Self {
            program,
            child,
            lines,
            stderr,
            timeout,
            deadline: timeout.map(|t| Instant::now() + t),
            finished: false,
        })
    }

    /// Next line of standard output, or `None` once the tool closes it.
    pub fn next_line(&mut self) -> MarkerDbResult<Option<String>> {
        let received = match self.deadline {
            Some(deadline) => self.lines.recv_deadline(deadline),
            None => self.lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(MarkerDbError::ClusterToolFailed(format!(
                "reading output of {}: {}",
                self.program, e
            ))),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => {
                self.kill();
                Err(self.timed_out())
            }
        }
    }

    /// Discard any unread output, wait for the tool to exit and check its
    /// exit status.
    pub fn finish(mut self) -> MarkerDbResult<()> {
        let mut discarded = 0usize;
        while self.next_line()?.is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!("{}: discarded {} unread output lines", self.program, discarded);
        }

        let status = self.wait()?;
        self.finished = true;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(MarkerDbError::ClusterToolFailed(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                tail(&stderr)
            )));
        }
        if !stderr.trim().is_empty() {
            tracing::debug!("{} stderr: {}", self.program, tail(&stderr));
        }
        Ok(())
    }

    fn wait(&mut self) -> MarkerDbResult<ExitStatus> {
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                self.kill();
                return Err(self.timed_out());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.finished = true;
    }

    fn timed_out(&self) -> MarkerDbError {
        MarkerDbError::ClusterToolFailed(format!(
            "{} did not finish within {}s and was killed",
            self.program,
            self.timeout.unwrap_or_default().as_secs()
        ))
    }
}

impl Drop for ToolProcess {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("Stopping unfinished {}", self.program);
            self.kill();
        }
    }
}

/// Run `command` to completion with no stdin, logging its output at debug.
pub fn run_tool(mut command: Command, timeout: Option<Duration>) -> MarkerDbResult<()> {
    command.stdin(Stdio::null());
    let mut process = ToolProcess::spawn(command, timeout)?;
    while let Some(line) = process.next_line()? {
        tracing::debug!("{}: {}", process.program, line);
    }
    process.finish()
}

fn tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}
