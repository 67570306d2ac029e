//! Algorithm lists driving the parsing and averaging loops.
//!
//! The lists are plain text files with one algorithm name per line, kept in
//! `test-data/alg-lists/` below the project root. They are produced by the
//! `gen-alg-lists` command (see [crate::alg_lists]) or supplied by hand.

use std::fs;
use std::path::Path;

use anyhow::Context;
use pqc_results_util::file::LoadValue;

use crate::config::TlsConfig;
use crate::layout::ProjectRoot;

pub const KEM_ALGS_FILE: &str = "kem-algs.txt";
pub const SIG_ALGS_FILE: &str = "sig-algs.txt";
pub const TLS_KEM_ALGS_FILE: &str = "tls-kem-algs.txt";
pub const TLS_SIG_ALGS_FILE: &str = "tls-sig-algs.txt";
pub const TLS_HYBRID_KEM_ALGS_FILE: &str = "tls-hybr-kem-algs.txt";
pub const TLS_HYBRID_SIG_ALGS_FILE: &str = "tls-hybr-sig-algs.txt";
pub const TLS_SPEED_KEM_ALGS_FILE: &str = "tls-speed-kem-algs.txt";
pub const TLS_SPEED_SIG_ALGS_FILE: &str = "tls-speed-sig-algs.txt";
pub const CLASSIC_KEM_ALGS_FILE: &str = "classic-tls-kem-algs.txt";
pub const CLASSIC_SIG_ALGS_FILE: &str = "classic-tls-sig-algs.txt";

/// Key encapsulation or digital signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgClass {
    Kem,
    Sig,
}

impl AlgClass {
    pub fn all() -> [AlgClass; 2] {
        [AlgClass::Kem, AlgClass::Sig]
    }

    /// Short name used in file names (`kem`, `sig`)
    pub fn name(self) -> &'static str {
        match self {
            AlgClass::Kem => "kem",
            AlgClass::Sig => "sig",
        }
    }

    /// The operations benchmarked for every algorithm of this class, in output order
    pub fn operations(self) -> &'static [&'static str] {
        match self {
            AlgClass::Kem => &["keygen", "encaps", "decaps"],
            AlgClass::Sig => &["keypair", "sign", "verify"],
        }
    }
}

/// PQC-only or PQC-hybrid TLS testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsFamily {
    Pqc,
    Hybrid,
}

impl TlsFamily {
    pub fn all() -> [TlsFamily; 2] {
        [TlsFamily::Pqc, TlsFamily::Hybrid]
    }

    /// Directory name (`pqc`, `hybrid`)
    pub fn name(self) -> &'static str {
        match self {
            TlsFamily::Pqc => "pqc",
            TlsFamily::Hybrid => "hybrid",
        }
    }

    /// File name prefix of the `openssl speed` results
    pub fn speed_prefix(self) -> &'static str {
        match self {
            TlsFamily::Pqc => "tls-speed",
            TlsFamily::Hybrid => "tls-speed-hybrid",
        }
    }
}

/// An ordered list of algorithm names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlgorithmList {
    names: Vec<String>,
}

impl AlgorithmList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// One name per line; surrounding whitespace and blank lines are dropped
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned),
        )
    }

    /// Write one name per line
    pub fn to_text(&self) -> String {
        self.names.iter().map(|n| format!("{n}\n")).collect()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl LoadValue for AlgorithmList {
    type Error = anyhow::Error;

    fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read algorithm list {path:?}"))?;
        let list = Self::parse(&text);
        if list.is_empty() {
            log::warn!("algorithm list {path:?} is empty");
        }
        Ok(list)
    }
}

/// Algorithms benchmarked by the liboqs test suite
#[derive(Debug, Clone, Default)]
pub struct LiboqsAlgorithms {
    pub kem: AlgorithmList,
    pub sig: AlgorithmList,
}

impl LiboqsAlgorithms {
    pub fn load(root: &ProjectRoot) -> anyhow::Result<Self> {
        let dir = root.alg_lists_dir();
        Ok(Self {
            kem: AlgorithmList::load(dir.join(KEM_ALGS_FILE))?,
            sig: AlgorithmList::load(dir.join(SIG_ALGS_FILE))?,
        })
    }

    pub fn get(&self, class: AlgClass) -> &AlgorithmList {
        match class {
            AlgClass::Kem => &self.kem,
            AlgClass::Sig => &self.sig,
        }
    }
}

/// Algorithms benchmarked by the OQS-Provider TLS test suite
#[derive(Debug, Clone, Default)]
pub struct ProviderAlgorithms {
    pub pqc_kem: AlgorithmList,
    pub pqc_sig: AlgorithmList,
    pub hybrid_kem: AlgorithmList,
    pub hybrid_sig: AlgorithmList,
    /// Classic signature algorithms / curves for the classic handshake tests
    pub classic_algs: AlgorithmList,
    /// TLS 1.3 ciphersuites for the classic handshake tests
    pub ciphers: AlgorithmList,
}

impl ProviderAlgorithms {
    pub fn load(root: &ProjectRoot, tls: &TlsConfig) -> anyhow::Result<Self> {
        let dir = root.alg_lists_dir();
        Ok(Self {
            pqc_kem: AlgorithmList::load(dir.join(TLS_KEM_ALGS_FILE))?,
            pqc_sig: AlgorithmList::load(dir.join(TLS_SIG_ALGS_FILE))?,
            hybrid_kem: AlgorithmList::load(dir.join(TLS_HYBRID_KEM_ALGS_FILE))?,
            hybrid_sig: AlgorithmList::load(dir.join(TLS_HYBRID_SIG_ALGS_FILE))?,
            classic_algs: AlgorithmList::new(tls.classic_algs.iter().cloned()),
            ciphers: AlgorithmList::new(tls.ciphers.iter().cloned()),
        })
    }

    pub fn kems(&self, family: TlsFamily) -> &AlgorithmList {
        match family {
            TlsFamily::Pqc => &self.pqc_kem,
            TlsFamily::Hybrid => &self.hybrid_kem,
        }
    }

    pub fn sigs(&self, family: TlsFamily) -> &AlgorithmList {
        match family {
            TlsFamily::Pqc => &self.pqc_sig,
            TlsFamily::Hybrid => &self.hybrid_sig,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_list() {
        let list = AlgorithmList::parse("Kyber512\n  Kyber768 \n\nBIKE-L1\r\n");
        assert_eq!(list.names(), &["Kyber512", "Kyber768", "BIKE-L1"]);
        assert!(list.contains("Kyber768"));
        assert!(!list.contains("Kyber"));
        assert_eq!(AlgorithmList::parse(&list.to_text()), list);
    }

    #[test]
    fn test_operations() {
        assert_eq!(AlgClass::Kem.operations(), &["keygen", "encaps", "decaps"]);
        assert_eq!(AlgClass::Sig.operations(), &["keypair", "sign", "verify"]);
    }

    #[test]
    fn test_missing_list_is_an_error() {
        let err = AlgorithmList::load("/nonexistent/kem-algs.txt").unwrap_err();
        assert!(format!("{err:#}").contains("kem-algs.txt"));
    }
}
