//! Enforcement notice for the daemon.

use color_eyre::eyre::WrapErr as _;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use std::process::Command;

use blocker_engine::{BlockKind, EnforcementSink};

use crate::config::EnforcementConfig;
use crate::lsappinfo;

/// Tells the user something was blocked, and optionally kills blocked apps.
pub struct NoticeSink {
    notify: bool,
    kill_apps: bool,
}

impl NoticeSink {
    pub fn new(config: &EnforcementConfig) -> Self {
        Self {
            notify: config.notify,
            kill_apps: config.kill_apps,
        }
    }
}

impl EnforcementSink for NoticeSink {
    fn on_enforcement_triggered(&self, kind: BlockKind, identifier: &str) {
        tracing::warn!(%kind, identifier, "blocked");

        if self.notify {
            if let Err(e) = post_notification(kind, identifier) {
                tracing::warn!(error = %e, "failed to post block notification");
            }
        }

        if self.kill_apps && kind == BlockKind::App {
            if let Err(e) = kill_app(identifier) {
                tracing::warn!(bundle_id = %identifier, error = %e, "failed to kill blocked app");
            }
        }
    }
}

fn post_notification(kind: BlockKind, identifier: &str) -> color_eyre::eyre::Result<()> {
    let script = notification_script(kind, identifier);
    run_to_completion(Command::new("osascript").args(["-e", &script]))
}

/// Run `command` and wait for it, so no exited child is left unreaped.
fn run_to_completion(command: &mut Command) -> color_eyre::eyre::Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    let output = command
        .output()
        .wrap_err_with(|| format!("failed to run {program}"))?;

    if !output.status.success() {
        color_eyre::eyre::bail!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

fn notification_script(kind: BlockKind, identifier: &str) -> String {
    let (title, body) = match kind {
        BlockKind::App => (
            "App Blocked",
            format!("The app \"{identifier}\" has been blocked."),
        ),
        BlockKind::Website => (
            "Website Blocked",
            format!("The website \"{identifier}\" has been blocked."),
        ),
    };

    format!(
        "display notification {} with title {}",
        applescript_string(&body),
        applescript_string(title)
    )
}

fn applescript_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Kill all processes with the given bundle ID.
fn kill_app(bundle_id: &str) -> color_eyre::eyre::Result<()> {
    for pid in lsappinfo::pids_for_bundle(bundle_id)? {
        match kill(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) => tracing::info!(bundle_id = %bundle_id, pid, "killed blocked app"),
            Err(e) => tracing::warn!(bundle_id = %bundle_id, pid, error = %e, "failed to kill"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_script() {
        assert_eq!(
            notification_script(BlockKind::Website, "example.com"),
            r#"display notification "The website \"example.com\" has been blocked." with title "Website Blocked""#
        );
        assert!(notification_script(BlockKind::App, "com.example.game").contains("App Blocked"));
    }

    #[test]
    fn test_run_to_completion_reports_exit_status() {
        assert!(run_to_completion(&mut Command::new("true")).is_ok());

        let err = run_to_completion(Command::new("sh").args(["-c", "echo denied >&2; exit 3"]))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("sh exited with"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_run_to_completion_missing_program() {
        let err = run_to_completion(&mut Command::new("blocker-no-such-program")).unwrap_err();
        assert!(err.to_string().contains("failed to run blocker-no-such-program"));
    }

    #[test]
    fn test_applescript_string_escapes() {
        assert_eq!(applescript_string(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
