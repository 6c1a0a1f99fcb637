use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pilot_core::Cancellation;
use tracing::{debug, warn};

use crate::{OperationError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs `command` to completion and returns its stdout.
///
/// The child is killed once `timeout` elapses or `cancellation` is
/// interrupted. A non-zero exit status is reported with the captured stderr.
pub(crate) fn run(
    command: &mut Command,
    program: &str,
    timeout: Duration,
    cancellation: &Cancellation,
) -> Result<String> {
    cancellation.check()?;
    debug!(program, ?timeout, "running external command");
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| OperationError::CommandSpawn {
            program: program.to_string(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let readers = Readers {
        stdout: thread::spawn(move || read_pipe(stdout)),
        stderr: thread::spawn(move || read_pipe(stderr)),
    };

    let started = Instant::now();
    let status = loop {
        let polled = match child.try_wait() {
            Ok(polled) => polled,
            Err(source) => {
                stop(&mut child, program, readers);
                return Err(OperationError::CommandSpawn {
                    program: program.to_string(),
                    source,
                });
            }
        };
        if let Some(status) = polled {
            break status;
        }
        if let Err(interrupted) = cancellation.check() {
            stop(&mut child, program, readers);
            return Err(interrupted.into());
        }
        if started.elapsed() >= timeout {
            stop(&mut child, program, readers);
            return Err(OperationError::CommandTimeout {
                program: program.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let (stdout, stderr) = readers.join();

    if !status.success() {
        return Err(OperationError::CommandFailed {
            program: program.to_string(),
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    Ok(stdout)
}

struct Readers {
    stdout: JoinHandle<String>,
    stderr: JoinHandle<String>,
}

impl Readers {
    fn join(self) -> (String, String) {
        (
            self.stdout.join().unwrap_or_default(),
            self.stderr.join().unwrap_or_default(),
        )
    }
}

fn stop(child: &mut Child, program: &str, readers: Readers) {
    if let Err(error) = child.kill() {
        warn!(program, %error, "failed to kill command");
    }
    let _ = child.wait();
    let _ = readers.join();
}

fn read_pipe(pipe: Option<impl Read>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buffer);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
