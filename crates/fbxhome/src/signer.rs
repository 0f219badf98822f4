//! Challenge signing through an external helper.
//!
//! The application token never enters this process: the helper receives
//! the login challenge on stdin and prints the hex signature on stdout.
//! The helper runs as a tokio child process so a slow helper never holds
//! a runtime worker.

use std::process::Stdio;

use async_trait::async_trait;
use fbxhome_api::{ChallengeSigner, Error};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct CommandSigner {
    argv: Vec<String>,
}

impl CommandSigner {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    fn failure(&self, reason: impl std::fmt::Display) -> Error {
        Error::Authentication {
            message: format!(
                "signer {:?} failed: {reason}",
                self.argv.first().map_or("", String::as_str)
            ),
        }
    }
}

#[async_trait]
impl ChallengeSigner for CommandSigner {
    async fn sign(&self, challenge: &str) -> Result<String, Error> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| self.failure("empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(challenge.as_bytes())
                .await
                .map_err(|e| self.failure(e))?;
            // Dropping stdin closes the pipe so the helper sees EOF.
        }
        let output = child.wait_with_output().await.map_err(|e| self.failure(e))?;
        if !output.status.success() {
            return Err(self.failure(output.status));
        }

        let signature = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if signature.is_empty() {
            return Err(self.failure("no signature on stdout"));
        }
        Ok(signature)
    }
}
