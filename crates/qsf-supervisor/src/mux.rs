//! Terminal multiplexer plumbing.
//!
//! The swarm runs in one tmux session (one window, N panes) or, on macOS,
//! an iTerm2 window driven through osascript. Either way each pane runs
//! the worker subcommand with its injected environment; the multiplexer is
//! only a host, never a transport.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

use qsf_config::MultiplexerKind;

/// One pane's launch line: binary, args, env.
#[derive(Debug, Clone)]
pub struct PaneCommand {
    pub title: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl PaneCommand {
    /// Render as a shell line for `tmux send-keys` / osascript.
    fn shell_line(&self) -> String {
        let mut parts = vec!["env".to_string()];
        for (k, v) in &self.env {
            parts.push(format!("{k}={}", shell_quote(v)));
        }
        parts.push(shell_quote(&self.program.display().to_string()));
        for a in &self.args {
            parts.push(shell_quote(a));
        }
        parts.join(" ")
    }
}

/// The chosen multiplexer, wrapping its session naming.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    kind: MultiplexerKind,
    session: String,
}

impl Multiplexer {
    pub fn new(kind: MultiplexerKind, session: impl Into<String>) -> Multiplexer {
        Multiplexer {
            kind,
            session: session.into(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session
    }

    /// Is the session currently alive?
    pub async fn session_alive(&self) -> bool {
        match self.kind {
            MultiplexerKind::Tmux => run_silent("tmux", &["has-session", "-t", &self.session])
                .await
                .is_ok(),
            // iTerm2 has no cheap liveness probe; the lock file carries it.
            MultiplexerKind::Iterm2 => false,
        }
    }

    /// Launch all panes into a fresh session.
    pub async fn launch(&self, panes: &[PaneCommand]) -> Result<()> {
        if panes.is_empty() {
            bail!("refusing to launch an empty swarm");
        }
        match self.kind {
            MultiplexerKind::Tmux => self.launch_tmux(panes).await,
            MultiplexerKind::Iterm2 => self.launch_iterm(panes).await,
        }
    }

    async fn launch_tmux(&self, panes: &[PaneCommand]) -> Result<()> {
        run_checked(
            "tmux",
            &["new-session", "-d", "-s", &self.session, "-n", "swarm"],
        )
        .await
        .context("tmux new-session")?;

        for (i, pane) in panes.iter().enumerate() {
            if i > 0 {
                let target = format!("{}:0", self.session);
                run_checked("tmux", &["split-window", "-t", &target])
                    .await
                    .context("tmux split-window")?;
                run_checked("tmux", &["select-layout", "-t", &target, "tiled"])
                    .await
                    .context("tmux select-layout")?;
            }
            let target = format!("{}:0.{}", self.session, i);
            run_checked(
                "tmux",
                &["select-pane", "-t", &target, "-T", &pane.title],
            )
            .await
            .context("tmux select-pane")?;
            run_checked(
                "tmux",
                &["send-keys", "-t", &target, &pane.shell_line(), "C-m"],
            )
            .await
            .context("tmux send-keys")?;
        }
        Ok(())
    }

    async fn launch_iterm(&self, panes: &[PaneCommand]) -> Result<()> {
        // One window, split per pane, each running its shell line.
        let mut script = String::from(
            "tell application \"iTerm2\"\n  set w to (create window with default profile)\n",
        );
        for (i, pane) in panes.iter().enumerate() {
            if i > 0 {
                script.push_str(
                    "  tell current session of w to set s to (split horizontally with default profile)\n",
                );
                script.push_str(&format!(
                    "  tell s to write text \"{}\"\n",
                    pane.shell_line().replace('"', "\\\"")
                ));
            } else {
                script.push_str(&format!(
                    "  tell current session of w to write text \"{}\"\n",
                    pane.shell_line().replace('"', "\\\"")
                ));
            }
        }
        script.push_str("end tell\n");

        run_checked("osascript", &["-e", &script])
            .await
            .context("osascript iTerm2 launch")
    }

    /// Interrupt every pane (graceful stop path).
    pub async fn interrupt_all(&self, pane_count: usize) -> Result<()> {
        if let MultiplexerKind::Tmux = self.kind {
            for i in 0..pane_count {
                let target = format!("{}:0.{}", self.session, i);
                // C-c into the pane; workers treat it like the stop flag.
                let _ = run_silent("tmux", &["send-keys", "-t", &target, "C-c"]).await;
            }
        }
        Ok(())
    }

    /// Tear the session down (force stop path, or after a graceful drain).
    pub async fn kill(&self) -> Result<()> {
        match self.kind {
            MultiplexerKind::Tmux => {
                match run_silent("tmux", &["kill-session", "-t", &self.session]).await {
                    Ok(()) => Ok(()),
                    // Already gone is success for a kill.
                    Err(_) => Ok(()),
                }
            }
            MultiplexerKind::Iterm2 => Ok(()),
        }
    }
}

async fn run_checked(program: &str, args: &[&str]) -> Result<()> {
    debug!(program, ?args, "mux command");
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .with_context(|| format!("spawn {program}"))?;
    if !status.success() {
        bail!("{program} {args:?} exited with {status}");
    }
    Ok(())
}

async fn run_silent(program: &str, args: &[&str]) -> Result<()> {
    run_checked(program, args).await
}

fn shell_quote(s: &str) -> String {
    if s.chars().all(|c| c.is_ascii_alphanumeric() || "-_./=:".contains(c)) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\\''"))
    }
}
