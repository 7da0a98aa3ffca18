use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

pub const ANSIBLE_PLAYBOOK_BIN: &str = "ansible-playbook";
const ANSIBLE_FORCE_COLOR_ENV: &str = "ANSIBLE_FORCE_COLOR";

/// Where the configuration to collect is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CloudEngine {
    Ocp,
    Podman,
}

impl CloudEngine {
    pub fn default_playbook(self) -> PathBuf {
        match self {
            CloudEngine::Ocp => PathBuf::from("playbooks/collect_ocp_config.yaml"),
            CloudEngine::Podman => PathBuf::from("playbooks/collect_podman_config.yaml"),
        }
    }
}

/// An `ansible-playbook` invocation that collects service configuration.
#[derive(Debug, Clone)]
pub struct PlaybookCommand {
    inventory: PathBuf,
    limit: Option<String>,
    extra_vars: BTreeMap<String, String>,
    connection: String,
    playbook: PathBuf,
    verbose: bool,
}

impl PlaybookCommand {
    pub fn new(inventory: PathBuf, engine: CloudEngine) -> Self {
        Self {
            inventory,
            limit: None,
            extra_vars: BTreeMap::new(),
            connection: "local".to_string(),
            playbook: engine.default_playbook(),
            verbose: false,
        }
    }

    pub fn with_limit(mut self, limit: Option<String>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_playbook(mut self, playbook: PathBuf) -> Self {
        self.playbook = playbook;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Add an extra variable. A name may only be given once.
    pub fn add_extra_var(&mut self, name: &str, value: &str) -> Result<()> {
        if self.extra_vars.contains_key(name) {
            bail!("Extra variable '{}' already exists", name);
        }
        self.extra_vars.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Arguments passed to `ansible-playbook`, playbook last
    pub fn args(&self) -> Result<Vec<String>> {
        let mut args = vec![
            "--inventory".to_string(),
            self.inventory.to_string_lossy().to_string(),
        ];

        if let Some(limit) = &self.limit {
            args.push("--limit".to_string());
            args.push(limit.clone());
        }

        if !self.extra_vars.is_empty() {
            let extra_vars = serde_json::to_string(&self.extra_vars)
                .context("Failed to encode extra variables")?;
            args.push("--extra-vars".to_string());
            args.push(extra_vars);
        }

        if self.verbose {
            args.push("-v".to_string());
        }

        args.push("--connection".to_string());
        args.push(self.connection.clone());
        args.push(self.playbook.to_string_lossy().to_string());

        Ok(args)
    }

    pub fn run(&self) -> Result<()> {
        let args = self.args()?;
        info!("Running {} {}", ANSIBLE_PLAYBOOK_BIN, args.join(" "));

        let status = Command::new(ANSIBLE_PLAYBOOK_BIN)
            .args(&args)
            .env(ANSIBLE_FORCE_COLOR_ENV, "true")
            .status()
            .with_context(|| format!("Failed to start {}", ANSIBLE_PLAYBOOK_BIN))?;

        if !status.success() {
            bail!("{} exited with {}", ANSIBLE_PLAYBOOK_BIN, status);
        }
        Ok(())
    }
}

/// Parse a `name=value` pair
pub fn parse_extra_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}
