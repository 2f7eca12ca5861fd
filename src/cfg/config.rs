// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Top-level configuration bag for the engine: naming contexts advertised to
/// clients, an opaque schema document handed to handlers uninterpreted,
/// resource limits, optional TLS material, and logging.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Base DNs this server claims to hold, as reported in `rootDSE`
    /// `namingContexts` — purely informational to the engine itself.
    #[serde(default)]
    pub naming_contexts: Vec<String>,

    /// Schema document passed through to handlers uninterpreted. The engine
    /// has no opinion about its shape.
    #[serde(default)]
    pub schema: serde_json::Value,

    pub limits: Limits,

    #[serde(default)]
    pub tls: Option<TlsConfig>,

    pub logger: LoggerConfig,
}

/// Resource ceilings a connection enforces on itself (`SPEC_FULL.md` §9).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Limits {
    /// Hard ceiling on a single BER element's declared length. Rejecting
    /// oversized lengths before allocating is what keeps a malicious
    /// declared length from being a memory-exhaustion vector.
    pub max_message_size: usize,

    /// How long the connection will wait for the next element before
    /// treating the peer as gone. `None` disables the timeout.
    #[serde(default, with = "serde_opt_secs")]
    pub read_timeout: Option<Duration>,

    /// How long a worker will run a single operation before the connection
    /// gives up on it. `None` disables the timeout.
    #[serde(default, with = "serde_opt_secs")]
    pub operation_timeout: Option<Duration>,
}

/// TLS material, informational to this crate: the engine works purely in
/// terms of `AsyncRead + AsyncWrite`, so whatever accepts connections is
/// responsible for terminating TLS before handing the engine a stream.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
    #[serde(default)]
    pub ca_path: Option<String>,
    #[serde(default)]
    pub verify_mode: VerifyMode,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerifyMode {
    #[default]
    None,
    Optional,
    Require,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggerConfig {
    pub level: String,
    pub output: LogOutput,
    #[serde(default)]
    pub is_show_line: bool,
    #[serde(default)]
    pub is_show_target: bool,
    #[serde(default)]
    pub file: Option<LogFileConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
    File,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LogFileConfig {
    pub path: String,
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.limits.max_message_size > 0, "limits.max_message_size must be > 0");
        if matches!(self.logger.output, LogOutput::File) {
            ensure!(self.logger.file.is_some(), "logger.file is required when logger.output = file");
        }
        Ok(())
    }
}

mod serde_opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs: Option<u64> = Option::deserialize(d)?;
        Ok(secs.map(Duration::from_secs))
    }
}
