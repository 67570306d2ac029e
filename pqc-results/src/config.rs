//! Configuration readable from a config file.
//!
//! Every setting has a default, so running without a config file is the same as
//! running with an empty one. Command line flags are merged in afterwards
//! (see [crate::cli::CliArgs::apply_to_config]).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context};
use pqc_results_util::file::write_file;
use serde::{Deserialize, Serialize};

use crate::layout::ROOT_MARKER;

/// How the averager compares the declared group key with the key cells of a run row
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// The trimmed key cell equals the declared name
    #[default]
    Exact,
    /// The declared name occurs anywhere in the key cell, so `Kyber512` also
    /// picks up `Kyber512-90s` rows
    Substring,
}

impl MatchMode {
    pub fn matches(self, declared: &str, cell: &str) -> bool {
        match self {
            MatchMode::Exact => cell.trim() == declared,
            MatchMode::Substring => cell.contains(declared),
        }
    }
}

/// What to do when a machine already has parsed results
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Ask on the terminal
    #[default]
    Prompt,
    /// Delete the old results of the machine
    Overwrite,
    /// Stop the whole run without touching anything
    Abort,
    /// Wait until the old results have been moved away
    Wait,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Classic signature algorithms and curves used in the classic handshake tests
    pub classic_algs: Vec<String>,

    /// TLS 1.3 ciphersuites used in the classic handshake tests
    pub ciphers: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            classic_algs: [
                "RSA_2048",
                "RSA_3072",
                "RSA_4096",
                "prime256v1",
                "secp384r1",
                "secp521r1",
            ]
            .map(String::from)
            .to_vec(),
            ciphers: [
                "TLS_AES_256_GCM_SHA384",
                "TLS_CHACHA20_POLY1305_SHA256",
                "TLS_AES_128_GCM_SHA256",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    /// project root, the directory holding the root marker file
    ///
    /// If unset, the root is searched for starting at the current directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// how group keys are matched while averaging
    pub match_mode: MatchMode,

    /// what to do when a machine was parsed before
    pub collision: CollisionPolicy,

    /// seconds between checks while waiting for old results to be moved away
    pub poll_interval_secs: u64,

    pub tls: TlsConfig,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            root: None,
            match_mode: MatchMode::default(),
            collision: CollisionPolicy::default(),
            poll_interval_secs: 5,
            tls: TlsConfig::default(),
        }
    }
}

impl ResultsConfig {
    /// load configuration from a TOML file
    ///
    /// NOTE: no validation is conducted, call [Self::validate] for that.
    pub fn load<P: AsRef<Path>>(p: P) -> anyhow::Result<Self> {
        let p = p.as_ref();
        let text =
            fs::read_to_string(p).with_context(|| format!("could not read config file {p:?}"))?;
        let mut config: Self = toml::from_str(&text)?;

        if let Some(root) = config.root.as_mut() {
            util::resolve_path_with_tilde(root);
        }

        Ok(config)
    }

    /// Write a config to a file
    pub fn store<P: AsRef<Path>>(&self, p: P) -> anyhow::Result<()> {
        let serialized_config = toml::to_string_pretty(&self)?;
        write_file(p, serialized_config.as_bytes())
    }

    /// The configuration generated by `gen-config`
    ///
    /// `root` is left out so the project root is searched for.
    pub fn example_config() -> Self {
        Self::default()
    }

    /// Validate a configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(root) = self.root.as_ref() {
            ensure!(
                root.join(ROOT_MARKER).is_file(),
                "project root {root:?} does not contain the marker file {ROOT_MARKER:?}"
            );
        }

        ensure!(
            self.poll_interval_secs > 0,
            "poll_interval_secs must be at least 1"
        );

        ensure!(
            !self.tls.classic_algs.is_empty(),
            "tls.classic_algs must name at least one algorithm"
        );
        ensure!(
            !self.tls.ciphers.is_empty(),
            "tls.ciphers must name at least one ciphersuite"
        );
        for name in self.tls.classic_algs.iter().chain(self.tls.ciphers.iter()) {
            ensure!(
                !name.trim().is_empty() && !name.contains(['/', '\\']),
                "{name:?} can not be used as part of a file name"
            );
        }

        Ok(())
    }
}

pub mod util {
    use std::path::PathBuf;
    /// takes a path that can potentially start with a `~` and resolves that `~` to the
    /// user's home directory
    ///
    /// ## Example
    /// ```
    /// use pqc_results::config::util::resolve_path_with_tilde;
    /// std::env::set_var("HOME","/home/dummy");
    /// let mut path = std::path::PathBuf::from("~/pqc");
    /// resolve_path_with_tilde(&mut path);
    /// assert!(path == std::path::PathBuf::from("/home/dummy/pqc"));
    /// ```
    pub fn resolve_path_with_tilde(path: &mut PathBuf) {
        let starts_with_tilde = !path.has_root() && path.iter().next().is_some_and(|s| s == "~");
        if !starts_with_tilde {
            return;
        }
        let Some(home_dir) = home::home_dir() else {
            log::warn!("path {path:?} starts with \"~\" but the home directory is unknown");
            return;
        };
        let resolved: PathBuf = std::iter::once(home_dir.into_os_string())
            .chain(path.iter().skip(1).map(|s| s.to_owned()))
            .collect();
        *path = resolved;
    }

    #[cfg(test)]
    mod test {
        use super::*;
        #[test]
        fn test_resolve_path_with_tilde() {
            let test = |path_str: &str, resolved: &str| {
                let mut path = PathBuf::from(path_str);
                resolve_path_with_tilde(&mut path);
                assert!(
                    path == PathBuf::from(resolved),
                    "Path {:?} has been resolved to {:?} but should have been resolved to {:?}.",
                    path_str,
                    path,
                    resolved
                );
            };
            std::env::set_var("HOME", "/home/dummy");

            test("~/pqc", "/home/dummy/pqc");
            test("~//pqc", "/home/dummy/pqc");
            test("~", "/home/dummy");

            // left alone
            test("/~/pqc", "/~/pqc");
            test("pqc/~", "pqc/~");
            test("~pqc", "~pqc");
            test("./~", "./~");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_example_config_round_trips_and_validates() -> anyhow::Result<()> {
        let dir = TempDir::with_prefix("pqc-results-config")?;
        let path = dir.path().join("example.toml");
        ResultsConfig::example_config().store(&path)?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("match_mode = \"exact\""), "{text}");
        assert!(text.contains("[tls]"), "{text}");
        assert!(!text.contains("root"), "{text}");

        let loaded = ResultsConfig::load(&path)?;
        assert_eq!(loaded, ResultsConfig::example_config());
        loaded.validate()?;
        Ok(())
    }

    #[test]
    fn test_empty_config_is_default() -> anyhow::Result<()> {
        let config: ResultsConfig = toml::from_str("")?;
        assert_eq!(config, ResultsConfig::default());
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.tls.classic_algs.len(), 6);
        Ok(())
    }

    #[test]
    fn test_partial_config() -> anyhow::Result<()> {
        let config: ResultsConfig = toml::from_str(
            "match_mode = \"substring\"\ncollision = \"wait\"\n[tls]\nciphers = [\"TLS_AES_128_GCM_SHA256\"]\n",
        )?;
        assert_eq!(config.match_mode, MatchMode::Substring);
        assert_eq!(config.collision, CollisionPolicy::Wait);
        assert_eq!(config.tls.ciphers, vec!["TLS_AES_128_GCM_SHA256"]);
        assert_eq!(config.tls.classic_algs, TlsConfig::default().classic_algs);
        Ok(())
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(toml::from_str::<ResultsConfig>("collision = \"sometimes\"").is_err());
    }

    #[test]
    fn test_store_and_load() -> anyhow::Result<()> {
        let dir = TempDir::with_prefix("pqc-results-config")?;
        std::fs::write(dir.path().join(ROOT_MARKER), "")?;
        let path = dir.path().join("config.toml");

        let mut config = ResultsConfig::default();
        config.root = Some(dir.path().to_owned());
        config.collision = CollisionPolicy::Overwrite;
        config.store(&path)?;

        let loaded = ResultsConfig::load(&path)?;
        assert_eq!(loaded.root, config.root);
        assert_eq!(loaded.collision, CollisionPolicy::Overwrite);
        loaded.validate()?;
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_values() -> anyhow::Result<()> {
        let dir = TempDir::with_prefix("pqc-results-config")?;

        let mut config = ResultsConfig::default();
        config.root = Some(dir.path().to_owned());
        assert!(config.validate().is_err());

        let mut config = ResultsConfig::default();
        config.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ResultsConfig::default();
        config.tls.ciphers.clear();
        assert!(config.validate().is_err());

        let mut config = ResultsConfig::default();
        config.tls.classic_algs.push("a/b".into());
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn test_match_mode() {
        assert!(MatchMode::Exact.matches("Kyber512", " Kyber512 "));
        assert!(!MatchMode::Exact.matches("Kyber512", "Kyber512-90s"));
        assert!(MatchMode::Substring.matches("Kyber512", "Kyber512-90s"));
        assert!(!MatchMode::Substring.matches("Kyber768", "Kyber512"));
    }
}
