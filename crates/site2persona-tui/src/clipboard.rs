use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

/// How long a clipboard tool may run before it is killed
const COPY_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

const TOOLS: [(&str, &[&str]); 4] = [
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Pipe text into the first clipboard tool that is available.
///
/// Blocks for up to [`COPY_TIMEOUT`] per tool; call it from a blocking task.
pub fn copy(text: &str) -> Result<()> {
    for (program, args) in TOOLS {
        let Ok(mut child) = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        match wait_with_timeout(&mut child, COPY_TIMEOUT) {
            Ok(true) => return Ok(()),
            Ok(false) => continue,
            Err(e) => tracing::warn!(program, error = %e, "Clipboard tool did not finish"),
        }
    }

    Err(anyhow!("no working clipboard tool (pbcopy, wl-copy, xclip, xsel)"))
}

/// Wait for `child` to exit, killing it once `timeout` passes.
/// Returns whether it exited successfully.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.success());
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("timed out after {:?}", timeout));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
