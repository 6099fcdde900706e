use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use switchboard_core::dialer::{Dialer, tel_uri};

/// Hands numbers to the host's registered `tel:` handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDialer;

impl SystemDialer {
    fn opener(uri: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg(uri);
            command
        } else if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", "", uri]);
            command
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(uri);
            command
        }
    }

    /// Spawns `command` and waits for it on a detached thread so it is reaped when it exits.
    fn launch(mut command: Command) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(thread::spawn(move || {
            let status = child.wait();
            match &status {
                Ok(status) if !status.success() => {
                    tracing::warn!("tel: handler exited with {}", status)
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Failed to wait for the tel: handler: {}", e),
            }
            status
        }))
    }
}

impl Dialer for SystemDialer {
    fn dial(&self, telephone_number: &str) -> Result<()> {
        let uri = tel_uri(telephone_number);
        tracing::debug!("Opening {}", uri);
        Self::launch(Self::opener(&uri))
            .with_context(|| format!("Failed to launch a handler for {}", uri))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opener_receives_the_tel_uri() {
        let command = SystemDialer::opener("tel:+13203727212");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.last().and_then(|arg| arg.to_str()), Some("tel:+13203727212"));
    }

    #[cfg(unix)]
    #[test]
    fn launched_handler_is_waited_for() {
        let waiter = SystemDialer::launch(Command::new("true")).unwrap();
        let status = waiter.join().unwrap().unwrap();
        assert!(status.success());
    }

    #[test]
    fn missing_handler_is_a_launch_error() {
        assert!(SystemDialer::launch(Command::new("switchboard-no-such-handler")).is_err());
    }
}
