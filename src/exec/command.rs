// src/exec/command.rs

//! Default provisioner backend: shell out to a provisioning CLI.
//!
//! Each operation spawns the configured program in the stack's working
//! directory and waits for it to exit, racing completion against the
//! run-level abort signal. The tool's manifest/wire format stays opaque;
//! only the argument lists are configurable.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::backend::{OperationContext, ProvisionerBackend};
use crate::manifest::StackDescriptor;

/// Backend that runs a provisioning CLI per stack.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    deploy_args: Vec<String>,
    destroy_args: Vec<String>,
    /// Extra argument appended to deploys when `refresh_only` is requested.
    refresh_only_arg: Option<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            deploy_args: vec!["apply".to_string()],
            destroy_args: vec!["destroy".to_string()],
            refresh_only_arg: None,
        }
    }

    pub fn with_deploy_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.deploy_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_destroy_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.destroy_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_refresh_only_arg(mut self, arg: impl Into<String>) -> Self {
        self.refresh_only_arg = Some(arg.into());
        self
    }
}

impl ProvisionerBackend for CommandBackend {
    fn deploy(
        &self,
        stack: Arc<StackDescriptor>,
        ctx: OperationContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        let program = self.program.clone();
        let mut args = self.deploy_args.clone();
        if ctx.refresh_only {
            if let Some(arg) = &self.refresh_only_arg {
                args.push(arg.clone());
            }
        }
        Box::pin(run_operation(program, args, stack, ctx))
    }

    fn destroy(
        &self,
        stack: Arc<StackDescriptor>,
        ctx: OperationContext,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
        let program = self.program.clone();
        let args = self.destroy_args.clone();
        Box::pin(run_operation(program, args, stack, ctx))
    }
}

async fn run_operation(
    program: String,
    args: Vec<String>,
    stack: Arc<StackDescriptor>,
    mut ctx: OperationContext,
) -> Result<()> {
    info!(
        stack = %stack.name,
        program = %program,
        ?args,
        working_directory = %stack.working_directory.display(),
        "starting provisioner process"
    );

    let mut cmd = Command::new(&program);
    cmd.args(&args)
        .current_dir(&stack.working_directory)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning provisioner for stack '{}'", stack.name))?;

    // Always consume both pipes so buffers don't fill; log at debug.
    if let Some(stdout) = child.stdout.take() {
        spawn_line_logger(stack.name.clone(), "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_logger(stack.name.clone(), "stderr", stderr);
    }

    // Either the process exits on its own (normal case), or the run-level
    // abort signal fires, in which case the process is killed and the
    // operation reports failure so the executor records it.
    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for provisioner of stack '{}'", stack.name))?;

            let code = status.code().unwrap_or(-1);
            info!(
                stack = %stack.name,
                exit_code = code,
                success = status.success(),
                "provisioner process exited"
            );

            if status.success() {
                Ok(())
            } else {
                Err(anyhow::anyhow!(
                    "provisioner '{}' exited with code {} for stack '{}'",
                    program,
                    code,
                    stack.name
                )
                .into())
            }
        }

        _ = wait_for_abort(&mut ctx.abort) => {
            info!(stack = %stack.name, "abort requested; killing provisioner process");
            if let Err(e) = child.kill().await {
                warn!(stack = %stack.name, error = %e, "failed to kill provisioner on abort");
            }
            Err(anyhow::anyhow!("operation aborted for stack '{}'", stack.name).into())
        }
    }
}

fn spawn_line_logger(
    stack: String,
    channel: &'static str,
    pipe: impl tokio::io::AsyncRead + Unpin + Send + 'static,
) {
    tokio::spawn(async move {
        let reader = BufReader::new(pipe);
        let mut lines = reader.lines();

        while let Ok(Some(line)) = lines.next_line().await {
            debug!(stack = %stack, "{channel}: {line}");
        }
    });
}

/// Resolve once the abort signal is observed `true`.
///
/// If the abort channel closes (the owning run is gone), no abort can arrive
/// anymore, so this future simply never resolves.
async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
