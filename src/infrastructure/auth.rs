//! Registry authentication for oras and notation
//!
//! Registry passwords are short-lived, so a fresh one is fetched right before
//! each copy or sign. The password travels over the child's stdin, never on
//! a command line or in logs.

use std::fmt;
use tracing::info;

use crate::error::ToolError;
use crate::infrastructure::process::ToolRunner;
use crate::tools::tools;

/// Registry password (Debug/Display redacted)
pub struct LoginPassword(String);

impl LoginPassword {
    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LoginPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoginPassword(<redacted>)")
    }
}

/// Logs a tool into the registry host
#[derive(Debug, Clone)]
pub struct RegistryLogin {
    runner: ToolRunner,
    aws: String,
    region: String,
    host: String,
}

impl RegistryLogin {
    pub fn new(
        runner: ToolRunner,
        aws: impl Into<String>,
        region: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            aws: aws.into(),
            region: region.into(),
            host: host.into(),
        }
    }

    /// `aws ecr get-login-password --region R`
    pub async fn fetch_password(&self) -> Result<LoginPassword, ToolError> {
        let args = vec![
            "ecr".to_string(),
            "get-login-password".to_string(),
            "--region".to_string(),
            self.region.clone(),
        ];
        let output = self.runner.run(tools::AWS, &self.aws, &args, None).await?;
        if !output.success() || output.stdout.trim().is_empty() {
            let output = output.redacted();
            output.log();
            return Err(ToolError::LoginFailed { output });
        }
        Ok(LoginPassword(output.stdout.trim().to_string()))
    }

    /// `<tool> login --username AWS --password-stdin <host>`
    ///
    /// oras and notation share this login shape.
    pub async fn login(&self, tool: &str, program: &str) -> Result<(), ToolError> {
        let password = self.fetch_password().await?;
        let args = vec![
            "login".to_string(),
            "--username".to_string(),
            "AWS".to_string(),
            "--password-stdin".to_string(),
            self.host.clone(),
        ];
        let output = self
            .runner
            .run(tool, program, &args, Some(password.expose()))
            .await?;
        if !output.success() {
            output.log();
            return Err(ToolError::LoginFailed { output });
        }
        info!("{} logged in to {}", tool, self.host);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::test_runner;

    #[test]
    fn test_password_debug_is_redacted() {
        let password = LoginPassword("hunter2".to_string());
        assert!(!format!("{:?}", password).contains("hunter2"));
        assert_eq!(password.expose(), "hunter2");
    }

    #[tokio::test]
    async fn test_login_fails_when_password_tool_fails() {
        let home = tempfile::tempdir().unwrap();
        let login = RegistryLogin::new(test_runner(home.path()), "false", "us-east-1", "host");
        let err = login.fetch_password().await.unwrap_err();
        match err {
            ToolError::LoginFailed { output } => assert_eq!(output.stdout, "<redacted>"),
            other => panic!("expected LoginFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_password_failure_reason_reaches_error() {
        let home = tempfile::tempdir().unwrap();
        // `sh ecr get-login-password ...` runs this script from the work home
        std::fs::write(
            home.path().join("ecr"),
            "echo 'An error occurred (ExpiredTokenException): token expired' >&2\nexit 255\n",
        )
        .unwrap();

        let login = RegistryLogin::new(test_runner(home.path()), "sh", "us-east-1", "host");
        let err = login.login("oras", "true").await.unwrap_err();

        assert!(err.to_string().contains("ExpiredTokenException"));
        match err {
            ToolError::LoginFailed { output } => {
                assert_eq!(output.exit_code, Some(255));
                assert!(output.stderr.contains("token expired"));
            }
            other => panic!("expected LoginFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_pipes_password_over_stdin() {
        let home = tempfile::tempdir().unwrap();
        // Runs as `sh login --username AWS --password-stdin <host>` from the work
        // home, so `login` is the script below. `echo` stands in for aws, making
        // the "password" its echoed arguments.
        std::fs::write(
            home.path().join("login"),
            "read pw\n[ \"$1\" = --username ] && [ \"$4\" = registry.example ] \\\n  && [ \"$pw\" = \"ecr get-login-password --region us-east-1\" ]\n",
        )
        .unwrap();

        let login = RegistryLogin::new(
            test_runner(home.path()),
            "echo",
            "us-east-1",
            "registry.example",
        );
        login.login("fake", "sh").await.unwrap();
    }

    #[tokio::test]
    async fn test_login_failure_carries_output() {
        let home = tempfile::tempdir().unwrap();
        let login = RegistryLogin::new(test_runner(home.path()), "echo", "us-east-1", "host");
        let err = login.login("fake", "false").await.unwrap_err();
        assert!(matches!(err, ToolError::LoginFailed { .. }));
    }
}
