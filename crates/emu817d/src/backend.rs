//! Backend controllers for the daemon.
//!
//! [`ProcessBackend`] runs the SDR receiver chain as a shell pipeline
//! (typically `rtl_sdr | csdr ...`) and restarts it whenever the CAT side
//! retunes. [`NullBackend`] is for dry runs with no signal chain attached.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use emu817_core::{BackendController, Error, Result, TransceiverState};

/// Substring of the command template replaced with the active frequency
/// in hertz.
pub const FREQ_MACRO: &str = "%FREQ%";
/// Substring of the command template replaced with the mode name.
pub const MODE_MACRO: &str = "%MODE%";

/// How long to wait for the receiver chain's readiness marker.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Expand the `%FREQ%` and `%MODE%` macros against a state snapshot.
fn expand_template(template: &str, state: &TransceiverState) -> String {
    template
        .replace(FREQ_MACRO, &state.active_frequency().to_string())
        .replace(MODE_MACRO, &state.mode.to_string())
}

/// Runs the receiver chain as a child shell pipeline.
///
/// Each `apply` kills the running pipeline, expands the command template
/// against the new state, and spawns the result under `sh -c`. When a
/// readiness marker is configured, `apply` does not return until the
/// pipeline has printed a line containing it, so the CAT ack only goes
/// out once the receiver is actually listening on the new frequency.
///
/// The chain runs in its own process group: `sh` forks one process per
/// pipeline stage, and killing only the shell would leave `rtl_sdr`
/// running and holding the device. Teardown signals the whole group.
pub struct ProcessBackend {
    command_template: String,
    ready_marker: Option<String>,
    ready_timeout: Duration,
    child: Option<Child>,
}

impl ProcessBackend {
    pub fn new(command_template: impl Into<String>) -> Self {
        ProcessBackend {
            command_template: command_template.into(),
            ready_marker: None,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            child: None,
        }
    }

    /// Wait for an output line containing `marker` before reporting each
    /// restart as complete. Both stdout and stderr are watched; rtl_sdr
    /// and friends report tuning on stderr.
    pub fn with_ready_marker(mut self, marker: impl Into<String>) -> Self {
        self.ready_marker = Some(marker.into());
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    async fn kill_current(&mut self) {
        if let Some(mut child) = self.child.take() {
            debug!("stopping receiver chain");
            // Signal the whole process group, not just the shell wrapper,
            // so every pipeline stage dies with it.
            #[cfg(unix)]
            if let Some(pid) = child.id() {
                unsafe {
                    libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
                }
            }
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill receiver chain");
            }
            // Reap so the pipeline does not linger as a zombie.
            match child.wait().await {
                Ok(status) => debug!(%status, "receiver chain exited"),
                Err(e) => warn!(error = %e, "failed to reap receiver chain"),
            }
        }
    }

    async fn wait_ready(&mut self, marker: &str) -> Result<()> {
        let child = self.child.as_mut().ok_or(Error::NotConnected)?;
        let mut lines = watch_output(child)?;

        let wait = async {
            while let Some(line) = lines.recv().await {
                if line.contains(marker) {
                    return Ok(());
                }
            }
            Err(Error::Backend(
                "receiver chain exited before reporting ready".into(),
            ))
        };

        match tokio::time::timeout(self.ready_timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(Error::Backend(format!(
                "receiver chain not ready within {:?}",
                self.ready_timeout
            ))),
        }
        // Dropping the receiver is fine: the forwarder tasks keep
        // draining both pipes so the chain never blocks on a full one.
    }
}

/// Merge the child's stdout and stderr into one stream of lines.
fn watch_output(child: &mut Child) -> Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::Backend("receiver chain stdout not captured".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::Backend("receiver chain stderr not captured".into()))?;
    forward_lines(stdout, tx.clone());
    forward_lines(stderr, tx);
    Ok(rx)
}

fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(line = %line, "receiver chain output");
            let _ = tx.send(line);
        }
    });
}

#[async_trait]
impl BackendController for ProcessBackend {
    async fn apply(&mut self, state: &TransceiverState) -> Result<()> {
        self.kill_current().await;

        let command = expand_template(&self.command_template, state);
        info!(freq_hz = state.active_frequency(), mode = %state.mode, %command, "starting receiver chain");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&command).kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        if self.ready_marker.is_some() {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        let child = cmd
            .spawn()
            .map_err(|e| Error::Backend(format!("spawning receiver chain: {e}")))?;
        self.child = Some(child);

        if let Some(marker) = self.ready_marker.clone() {
            self.wait_ready(&marker).await?;
            info!("receiver chain ready");
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.kill_current().await;
        Ok(())
    }
}

/// Backend that applies nothing. Lets the CAT side be exercised with no
/// SDR hardware or signal chain present.
#[derive(Debug, Default)]
pub struct NullBackend;

#[async_trait]
impl BackendController for NullBackend {
    async fn apply(&mut self, state: &TransceiverState) -> Result<()> {
        debug!(freq_hz = state.active_frequency(), mode = %state.mode, "no backend attached");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu817_core::{Mode, RadioConfig};

    fn state() -> TransceiverState {
        TransceiverState::from_config(&RadioConfig::default())
    }

    #[test]
    fn template_expansion() {
        let mut s = state();
        s.set_active_frequency(7_074_000);
        s.mode = Mode::LSB;
        let cmd = expand_template("rtl_sdr -f %FREQ% - | demod -m %MODE%", &s);
        assert_eq!(cmd, "rtl_sdr -f 7074000 - | demod -m LSB");
    }

    #[test]
    fn template_without_macros_is_untouched() {
        let cmd = expand_template("sleep 3600", &state());
        assert_eq!(cmd, "sleep 3600");
    }

    #[tokio::test]
    async fn apply_waits_for_the_ready_marker() {
        let mut backend = ProcessBackend::new("echo tuning; echo READY f=%FREQ%; sleep 5")
            .with_ready_marker("READY")
            .with_ready_timeout(Duration::from_secs(5));
        backend.apply(&state()).await.unwrap();
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn ready_marker_on_stderr_is_seen() {
        // rtl_sdr prints its tuning report on stderr.
        let mut backend = ProcessBackend::new("echo 'Reading samples in async mode..' >&2; sleep 5")
            .with_ready_marker("async mode")
            .with_ready_timeout(Duration::from_secs(5));
        backend.apply(&state()).await.unwrap();
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn apply_fails_when_the_chain_exits_without_the_marker() {
        let mut backend = ProcessBackend::new("true")
            .with_ready_marker("READY")
            .with_ready_timeout(Duration::from_secs(5));
        let err = backend.apply(&state()).await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn apply_times_out_on_a_silent_chain() {
        let mut backend = ProcessBackend::new("sleep 30")
            .with_ready_marker("READY")
            .with_ready_timeout(Duration::from_millis(100));
        let err = backend.apply(&state()).await.unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let mut backend = ProcessBackend::new("sleep 30");
        backend.apply(&state()).await.unwrap();
        backend.stop().await.unwrap();
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn reapply_replaces_the_running_chain() {
        let mut backend = ProcessBackend::new("sleep 30");
        backend.apply(&state()).await.unwrap();
        let mut retuned = state();
        retuned.set_active_frequency(7_074_000);
        backend.apply(&retuned).await.unwrap();
        backend.stop().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stop_kills_every_pipeline_stage() {
        // sh forks one process per stage; the second stage must not
        // survive teardown holding the device.
        let mut backend = ProcessBackend::new("sleep 593 | sleep 594");
        backend.apply(&state()).await.unwrap();
        backend.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let out = std::process::Command::new("pgrep")
            .args(["-f", "sleep 594"])
            .output()
            .expect("pgrep runs");
        assert!(
            out.stdout.is_empty(),
            "pipeline stages survived stop(): {}",
            String::from_utf8_lossy(&out.stdout)
        );
    }
}
