// src/supervisor.rs

use anyhow::Result;
use std::{
    path::PathBuf,
    process::{Command, Stdio},
};
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, Signal, System, UpdateKind};
use tracing::{debug, info};

use crate::error::PruneError;

/// Stops and starts the tracking server so it picks up rewritten files.
pub trait Supervisor {
    /// Stop running instances (SIGTERM where supported); returns how many
    /// were signalled.
    /// Finding none is not an error.
    fn stop(&self) -> Result<usize>;
    /// Launch a fresh, detached instance.
    fn start(&self) -> Result<()>;
}

/// Finds the server by a substring of its command line and relaunches it
/// with output discarded.
#[derive(Clone, Debug)]
pub struct CommandSupervisor {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// e.g. `"node server.js"`; matched against the space-joined argv.
    pub match_pattern: String,
}

impl CommandSupervisor {
    fn matching_pids(&self, sys: &System) -> Vec<sysinfo::Pid> {
        let me = sysinfo::get_current_pid().ok();
        sys.processes()
            .iter()
            .filter(|(pid, _)| Some(**pid) != me)
            .filter(|(_, p)| {
                let cmd = p
                    .cmd()
                    .iter()
                    .map(|a| a.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");
                cmd.contains(&self.match_pattern)
            })
            .map(|(pid, _)| *pid)
            .collect()
    }
}

impl Supervisor for CommandSupervisor {
    fn stop(&self) -> Result<usize> {
        let mut sys = System::new();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        let mut killed = 0;
        for pid in self.matching_pids(&sys) {
            if let Some(p) = sys.process(pid) {
                // SIGTERM; plain kill where the platform has no signals
                let sent = p.kill_with(Signal::Term).unwrap_or_else(|| p.kill());
                if sent {
                    info!(pid = %pid, "stopped server process");
                    killed += 1;
                } else {
                    debug!(pid = %pid, "kill refused");
                }
            }
        }
        if killed == 0 {
            info!(pattern = %self.match_pattern, "no running server found");
        }
        Ok(killed)
    }

    fn start(&self) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        let child = cmd.spawn().map_err(|e| {
            PruneError::Restart(format!("spawning {} {:?}: {}", self.program, self.args, e))
        })?;
        info!(pid = child.id(), program = %self.program, "server started");
        Ok(())
    }
}
