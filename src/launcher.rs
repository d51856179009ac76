use crate::error::{Error, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};

/// How to start the simulator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// The simulation configuration to load.
    pub config_file: PathBuf,
    /// The TCP port SUMO listens on for the remote control connection.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Run the graphical build.
    #[serde(default)]
    pub gui: bool,
    /// Simulated seconds per step.
    #[serde(default = "default_step_length")]
    pub step_length: f64,
    /// Explicit path to the binary, when it is not on `PATH`.
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// Worker threads the simulator may use.
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_port() -> u16 {
    4321
}

fn default_step_length() -> f64 {
    1.0
}

impl LaunchOptions {
    /// The program to invoke.
    fn program(&self) -> PathBuf {
        match &self.binary {
            Some(path) => path.clone(),
            None if self.gui => "sumo-gui".into(),
            None => "sumo".into(),
        }
    }

    /// The argument list. Randomness is pinned down so that a
    /// configuration reproduces the same traffic every run.
    fn arguments(&self) -> Vec<String> {
        let mut args = vec![
            "-c".to_string(),
            self.config_file.display().to_string(),
            "--remote-port".to_string(),
            self.port.to_string(),
            "--step-length".to_string(),
            self.step_length.to_string(),
            "--quit-on-end".to_string(),
            "--no-warnings".to_string(),
            "true".to_string(),
            "--random".to_string(),
            "false".to_string(),
            "--default.speeddev".to_string(),
            "0".to_string(),
            "--tripinfo-output.write-unfinished".to_string(),
        ];
        if self.gui {
            // Otherwise the gui waits for a click on the play button.
            args.push("--start".to_string());
        }
        if let Some(threads) = self.threads {
            args.push("--threads".to_string());
            args.push(threads.to_string());
        }
        args
    }
}

/// A running SUMO instance, killed on drop unless it already exited.
pub struct SumoProcess {
    child: Child,
}

/// Launches SUMO with the given options.
pub fn launch(options: &LaunchOptions) -> Result<SumoProcess> {
    let program = options.program();
    let args = options.arguments();
    info!("launching {} {}", program.display(), args.join(" "));
    let child = Command::new(&program)
        .args(&args)
        .spawn()
        .map_err(|source| Error::Spawn {
            program: program.display().to_string(),
            source,
        })?;
    Ok(SumoProcess { child })
}

impl SumoProcess {
    /// Waits for the simulator to exit on its own.
    pub fn wait(mut self) -> Result<ExitStatus> {
        Ok(self.child.wait()?)
    }
}

impl Drop for SumoProcess {
    fn drop(&mut self) {
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                warn!("sumo has not exited, killing it");
                let _ = self.child.kill();
                let _ = self.child.wait();
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn options() -> LaunchOptions {
        LaunchOptions {
            config_file: "osm.sumocfg".into(),
            port: 4321,
            gui: false,
            step_length: 1.0,
            binary: None,
            threads: None,
        }
    }

    #[test]
    fn batch_arguments() {
        let args = options().arguments();
        assert_eq!(
            args,
            vec![
                "-c",
                "osm.sumocfg",
                "--remote-port",
                "4321",
                "--step-length",
                "1",
                "--quit-on-end",
                "--no-warnings",
                "true",
                "--random",
                "false",
                "--default.speeddev",
                "0",
                "--tripinfo-output.write-unfinished",
            ]
        );
    }

    #[test]
    fn gui_starts_unpaused() {
        let mut options = options();
        options.gui = true;
        assert_eq!(options.program(), PathBuf::from("sumo-gui"));
        assert!(options.arguments().contains(&"--start".to_string()));
    }

    #[test]
    fn explicit_binary_wins() {
        let mut options = options();
        options.binary = Some("/opt/sumo/bin/sumo".into());
        options.gui = true;
        assert_eq!(options.program(), PathBuf::from("/opt/sumo/bin/sumo"));
    }

    #[test]
    fn threads_are_passed_through() {
        let mut options = options();
        options.threads = Some(4);
        let args = options.arguments();
        let at = args.iter().position(|arg| arg == "--threads").unwrap();
        assert_eq!(args[at + 1], "4");
    }
}
