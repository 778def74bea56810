use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Mutex;

use fc_local_core::LocalError;

/// Executes a shell command line against the host's container runtime.
pub trait ShellRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        command: &'a str,
        inherit_stdio: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), LocalError>> + Send + 'a>>;
}

/// Runs commands through `sh -c`.
pub struct DockerShellRunner {
    shell: String,
}

impl DockerShellRunner {
    pub fn new() -> Self {
        Self { shell: "sh".into() }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl Default for DockerShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellRunner for DockerShellRunner {
    fn run<'a>(
        &'a self,
        command: &'a str,
        inherit_stdio: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), LocalError>> + Send + 'a>> {
        Box::pin(async move {
            tracing::debug!(command = %command, "Running shell command");

            let mut cmd = tokio::process::Command::new(&self.shell);
            cmd.arg("-c").arg(command);
            if inherit_stdio {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            } else {
                cmd.stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::piped());
            }

            let output = cmd.output().await.map_err(|e| {
                LocalError::RuntimeUnavailable(format!("Failed to run {}: {e}", self.shell))
            })?;

            if !output.status.success() {
                if !output.stderr.is_empty() {
                    tracing::warn!(
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "Command reported errors"
                    );
                }
                return Err(LocalError::CommandFailed {
                    command: command.to_string(),
                    code: output.status.code(),
                });
            }
            Ok(())
        })
    }
}

/// Records commands instead of running them.
pub struct StubShellRunner {
    commands: Mutex<Vec<String>>,
    fail_with: Option<i32>,
}

impl StubShellRunner {
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// A runner whose every command exits with `code`.
    pub fn failing(code: i32) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            fail_with: Some(code),
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl Default for StubShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellRunner for StubShellRunner {
    fn run<'a>(
        &'a self,
        command: &'a str,
        _inherit_stdio: bool,
    ) -> Pin<Box<dyn Future<Output = Result<(), LocalError>> + Send + 'a>> {
        Box::pin(async move {
            if let Ok(mut commands) = self.commands.lock() {
                commands.push(command.to_string());
            }
            match self.fail_with {
                Some(code) => Err(LocalError::CommandFailed {
                    command: command.to_string(),
                    code: Some(code),
                }),
                None => Ok(()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_successful_command() {
        let runner = DockerShellRunner::new();
        runner.run("true", false).await.unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_is_command_failed() {
        let runner = DockerShellRunner::new();
        let err = runner.run("exit 3", false).await.unwrap_err();
        assert!(matches!(err, LocalError::CommandFailed { code: Some(3), .. }));
    }

    #[tokio::test]
    async fn missing_shell_is_runtime_unavailable() {
        let runner = DockerShellRunner::new().with_shell("/nonexistent/shell");
        let err = runner.run("true", false).await.unwrap_err();
        assert!(matches!(err, LocalError::RuntimeUnavailable(_)));
    }

    #[tokio::test]
    async fn stub_records_and_fails_on_demand() {
        let ok = StubShellRunner::new();
        ok.run("docker ps", true).await.unwrap();
        assert_eq!(ok.commands(), vec!["docker ps".to_string()]);

        let failing = StubShellRunner::failing(125);
        let err = failing.run("docker run x", true).await.unwrap_err();
        assert!(matches!(err, LocalError::CommandFailed { code: Some(125), .. }));
        assert_eq!(failing.commands().len(), 1);
    }

    #[tokio::test]
    async fn detached_command_reads_eof_from_stdin() {
        let runner = DockerShellRunner::new();
        runner.run("if read -r _; then exit 1; fi", false).await.unwrap();
    }

    const STDIN_CHILD_ENV: &str = "FC_LOCAL_STDIN_CHILD";

    #[tokio::test]
    async fn inherited_stdio_passes_caller_stdin() {
        if std::env::var_os(STDIN_CHILD_ENV).is_some() {
            let runner = DockerShellRunner::new();
            runner
                .run(r#"read -r line && [ "$line" = hello ]"#, true)
                .await
                .unwrap();
            return;
        }

        // Re-run this test in a child process whose stdin is a pipe we control.
        use std::io::Write;
        let mut child = std::process::Command::new(std::env::current_exe().unwrap())
            .args(["--exact", "exec::tests::inherited_stdio_passes_caller_stdin"])
            .env(STDIN_CHILD_ENV, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        child.stdin.take().unwrap().write_all(b"hello\n").unwrap();
        let output = child.wait_with_output().unwrap();
        assert!(
            output.status.success(),
            "{}",
            String::from_utf8_lossy(&output.stdout)
        );
    }
}
