//! Where raw benchmark output is read from and where parsed results go.
//!
//! All paths hang off the project root, the directory holding the
//! [ROOT_MARKER] file:
//!
//! ```text
//! <root>/test-data/alg-lists/                         algorithm lists
//! <root>/test-data/up-results/<tool>/machine-<id>/    raw ("unparsed") results
//! <root>/test-data/results/<tool>/machine-<id>/       parsed results
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pqc_results_util::file::find_upwards;

use crate::algorithms::{AlgClass, TlsFamily};
use crate::Error;

/// File marking the project root
pub const ROOT_MARKER: &str = ".pqc_eval_dir_marker.tmp";

/// Identifies the machine a set of results was gathered on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(String);

impl MachineId {
    /// Name of the per machine results directory
    pub fn dir_name(&self) -> String {
        format!("machine-{}", self.0)
    }
}

impl FromStr for MachineId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("machine id must not be empty".to_owned());
        }
        if s.contains(['/', '\\']) || s == "." || s == ".." {
            return Err(format!("machine id {s:?} can not be used as a directory name"));
        }
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The benchmarking suites whose output is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Liboqs,
    OqsProvider,
}

impl Tool {
    pub fn dir_name(self) -> &'static str {
        match self {
            Tool::Liboqs => "liboqs",
            Tool::OqsProvider => "oqs-provider",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    dir: PathBuf,
}

impl ProjectRoot {
    /// Search `start` and its parents for the [ROOT_MARKER] file
    pub fn discover<P: AsRef<Path>>(start: P) -> Result<Self, Error> {
        let start = start.as_ref();
        find_upwards(start, ROOT_MARKER)
            .map(|dir| Self { dir })
            .ok_or_else(|| Error::RootNotFound {
                start: start.to_owned(),
                marker: ROOT_MARKER,
            })
    }

    /// Use `dir` as project root; it must hold the [ROOT_MARKER] file
    pub fn at<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref();
        match dir.join(ROOT_MARKER).is_file() {
            true => Ok(Self {
                dir: dir.to_owned(),
            }),
            false => Err(Error::RootNotFound {
                start: dir.to_owned(),
                marker: ROOT_MARKER,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn alg_lists_dir(&self) -> PathBuf {
        self.dir.join("test-data").join("alg-lists")
    }

    pub fn results_dir(&self, tool: Tool) -> PathBuf {
        self.dir.join("test-data").join("results").join(tool.dir_name())
    }

    pub fn up_results_dir(&self, tool: Tool) -> PathBuf {
        self.dir
            .join("test-data")
            .join("up-results")
            .join(tool.dir_name())
    }

    /// Directory holding the liboqs `test_kem` and `test_sig` binaries
    pub fn liboqs_test_bins(&self) -> PathBuf {
        self.dir
            .join("lib")
            .join("liboqs")
            .join("build")
            .join("tests")
    }

    /// Installation prefix of the OpenSSL build carrying the OQS provider
    pub fn openssl_dir(&self) -> PathBuf {
        self.dir.join("lib").join("openssl_3.2")
    }

    pub fn liboqs(&self, machine: &MachineId) -> LiboqsPaths {
        LiboqsPaths::new(self, machine)
    }

    pub fn provider(&self, machine: &MachineId) -> ProviderPaths {
        ProviderPaths::new(self, machine)
    }
}

/// Input and output locations of the liboqs results of one machine
#[derive(Debug, Clone)]
pub struct LiboqsPaths {
    /// `results/liboqs/machine-<id>`
    pub machine_results: PathBuf,
    /// Parsed CPU speed tables
    pub speed: PathBuf,
    /// Parsed memory tables
    pub mem: PathBuf,
    raw_speed: PathBuf,
    raw_mem: PathBuf,
}

impl LiboqsPaths {
    fn new(root: &ProjectRoot, machine: &MachineId) -> Self {
        let machine_results = root.results_dir(Tool::Liboqs).join(machine.dir_name());
        let machine_up = root.up_results_dir(Tool::Liboqs).join(machine.dir_name());
        Self {
            speed: machine_results.join("speed-results"),
            mem: machine_results.join("mem-results"),
            machine_results,
            raw_speed: machine_up.join("raw-speed-results"),
            raw_mem: machine_up.join("mem-results"),
        }
    }

    /// Directories whose presence means this machine was parsed before
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        vec![self.speed.clone(), self.mem.clone()]
    }

    /// Speed tool output of one run
    pub fn raw_speed_report(&self, class: AlgClass, run: usize) -> PathBuf {
        self.raw_speed
            .join(format!("test-{}-speed-{run}.csv", class.name()))
    }

    /// Massif report of one algorithm operation in one run
    pub fn raw_mem_report(
        &self,
        class: AlgClass,
        alg: &str,
        op_index: usize,
        run: usize,
    ) -> PathBuf {
        self.raw_mem
            .join(format!("{}-mem-metrics", class.name()))
            .join(format!("{alg}-{op_index}-{run}.txt"))
    }

    pub fn speed_run(&self, class: AlgClass, run: usize) -> PathBuf {
        self.speed.join(format!("test-{}-speed-{run}.csv", class.name()))
    }

    pub fn speed_avg(&self, class: AlgClass) -> PathBuf {
        self.speed.join(format!("{}-speed-avg.csv", class.name()))
    }

    pub fn mem_run(&self, class: AlgClass, run: usize) -> PathBuf {
        self.mem
            .join(format!("{}-mem-metrics-{run}.csv", class.name()))
    }

    pub fn mem_avg(&self, class: AlgClass) -> PathBuf {
        self.mem.join(format!("{}-mem-avg.csv", class.name()))
    }
}

/// Input and output locations of the OQS-Provider TLS results of one machine
#[derive(Debug, Clone)]
pub struct ProviderPaths {
    /// `results/oqs-provider/machine-<id>`
    pub machine_results: PathBuf,
    /// Parsed handshake tables
    pub handshake: PathBuf,
    /// Parsed `openssl speed` tables
    pub speed: PathBuf,
    raw_handshake: PathBuf,
    raw_speed: PathBuf,
}

impl ProviderPaths {
    fn new(root: &ProjectRoot, machine: &MachineId) -> Self {
        let machine_results = root
            .results_dir(Tool::OqsProvider)
            .join(machine.dir_name());
        let machine_up = root
            .up_results_dir(Tool::OqsProvider)
            .join(machine.dir_name());
        Self {
            handshake: machine_results.join("handshake-results"),
            speed: machine_results.join("speed-results"),
            machine_results,
            raw_handshake: machine_up.join("handshake-results"),
            raw_speed: machine_up.join("speed-results"),
        }
    }

    pub fn output_dirs(&self) -> Vec<PathBuf> {
        vec![self.handshake.clone(), self.speed.clone()]
    }

    pub fn family_dir(&self, family: TlsFamily) -> PathBuf {
        self.handshake.join(family.name())
    }

    pub fn classic_dir(&self) -> PathBuf {
        self.handshake.join("classic")
    }

    /// Holds the unsplit handshake tables of every run
    pub fn base_dir(&self, family: TlsFamily) -> PathBuf {
        self.family_dir(family).join("base-results")
    }

    pub fn base_run(&self, family: TlsFamily, run: usize) -> PathBuf {
        self.base_dir(family)
            .join(format!("{}-base-results-run-{run}.csv", family.name()))
    }

    pub fn sig_dir(&self, family: TlsFamily, sig: &str) -> PathBuf {
        self.family_dir(family).join(sig)
    }

    pub fn sig_run(&self, family: TlsFamily, sig: &str, run: usize) -> PathBuf {
        self.sig_dir(family, sig)
            .join(format!("tls-handshake-{sig}-run-{run}.csv"))
    }

    pub fn sig_avg(&self, family: TlsFamily, sig: &str) -> PathBuf {
        self.sig_dir(family, sig)
            .join(format!("tls-handshake-{sig}-avg.csv"))
    }

    /// `s_time` transcript of one signature/KEM combination in one run
    pub fn raw_handshake(&self, family: TlsFamily, run: usize, sig: &str, kem: &str) -> PathBuf {
        self.raw_handshake
            .join(family.name())
            .join(format!("tls-handshake-{run}-{sig}-{kem}.txt"))
    }

    /// `s_time` transcript of one ciphersuite/classic algorithm combination in one run
    pub fn raw_classic(&self, run: usize, cipher: &str, alg: &str) -> PathBuf {
        self.raw_handshake
            .join("classic")
            .join(format!("tls-handshake-classic-{run}-{cipher}-{alg}.txt"))
    }

    pub fn classic_run(&self, run: usize) -> PathBuf {
        self.classic_dir()
            .join(format!("classic-results-run-{run}.csv"))
    }

    pub fn classic_avg(&self) -> PathBuf {
        self.classic_dir().join("classic-speed-avg.csv")
    }

    /// `openssl speed` output of one run
    pub fn raw_speed(&self, family: TlsFamily, class: AlgClass, run: usize) -> PathBuf {
        self.raw_speed.join(family.name()).join(format!(
            "{}-{}-{run}.txt",
            family.speed_prefix(),
            class.name()
        ))
    }

    pub fn speed_run(&self, family: TlsFamily, class: AlgClass, run: usize) -> PathBuf {
        self.speed.join(format!(
            "{}-{}-{run}.csv",
            family.speed_prefix(),
            class.name()
        ))
    }

    pub fn speed_avg(&self, family: TlsFamily, class: AlgClass) -> PathBuf {
        self.speed.join(format!(
            "{}-{}-avg.csv",
            family.speed_prefix(),
            class.name()
        ))
    }
}
