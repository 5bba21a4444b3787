/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::ffi::OsStr;
use std::io::Read;
use std::process::{Command, Stdio};
use std::time::Duration;

use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use wait_timeout::ChildExt;

/// Fallback ceiling for external tools (dmidecode, virsh). A hung probe must
/// never hang registration with it.
pub const DEFAULT_SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(thiserror::Error, Debug)]
pub enum CmdError {
    #[error("Unable to invoke subprocess '{0}': {1}")]
    Spawn(String, std::io::Error),
    #[error("Error waiting on subprocess '{0}': {1}")]
    Wait(String, std::io::Error),
    #[error("Subprocess '{0}' did not finish within {1:?} and was killed")]
    Timeout(String, Duration),
    #[error("Subprocess '{0}' exited with exit code {1:?}. Stderr: {2}")]
    Subprocess(String, Option<i32>, String),
    #[error("Subprocess '{0}' produced output that is not valid UTF8")]
    OutputParse(String),
}

pub type CmdResult<T> = std::result::Result<T, CmdError>;

/// Synchronous subprocess runner with a bounded wall-clock timeout.
///
/// Suitable for tools with small output (the exit status is collected before
/// the pipes are drained, so output larger than the pipe buffer would stall
/// the child). Use [`TokioCmd`] for anything chatty.
#[derive(Debug)]
pub struct Cmd {
    command: Command,
    timeout: Duration,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            command: Command::new(program),
            timeout: DEFAULT_SUBPROCESS_TIMEOUT,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn output(mut self) -> CmdResult<String> {
        let pretty = pretty_cmd(&self.command);
        let mut child = self
            .command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CmdError::Spawn(pretty.clone(), e))?;

        let status = match child
            .wait_timeout(self.timeout)
            .map_err(|e| CmdError::Wait(pretty.clone(), e))?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CmdError::Timeout(pretty, self.timeout));
            }
        };

        let stdout =
            read_pipe(child.stdout.take()).ok_or_else(|| CmdError::OutputParse(pretty.clone()))?;
        if !status.success() {
            let stderr = read_pipe(child.stderr.take()).unwrap_or_default();
            return Err(CmdError::Subprocess(pretty, status.code(), stderr));
        }
        Ok(stdout)
    }
}

fn read_pipe<R: Read>(pipe: Option<R>) -> Option<String> {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_string(&mut buf).ok()?;
    }
    Some(buf)
}

fn pretty_cmd(command: &Command) -> String {
    format!(
        "{} {}",
        command.get_program().to_string_lossy(),
        command
            .get_args()
            .map(|x| x.to_string_lossy())
            .collect::<Vec<std::borrow::Cow<'_, str>>>()
            .join(" ")
    )
}

/// Async implementation of Cmd.
#[derive(Debug)]
pub struct TokioCmd {
    command: TokioCommand,
    timeout: Duration,
}

impl TokioCmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            command: TokioCommand::new(program),
            timeout: DEFAULT_SUBPROCESS_TIMEOUT,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn output(mut self) -> CmdResult<String> {
        let pretty = pretty_cmd(self.command.as_std());
        let child = self
            .command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CmdError::Spawn(pretty.clone(), e))?;

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CmdError::Timeout(pretty.clone(), self.timeout))?
            .map_err(|e| CmdError::Wait(pretty.clone(), e))?;

        if !output.status.success() {
            return Err(CmdError::Subprocess(
                pretty,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        String::from_utf8(output.stdout).map_err(|_| CmdError::OutputParse(pretty))
    }
}
