//! Incremental digests over a single pass of bytes.
//!
//! A [`HashCalculatorManager`] fans every slice out to any number of
//! [`HashCalculator`]s, so adding an algorithm costs one more `update` per
//! slice rather than another pass over the data. Finalizing consumes the
//! manager and yields an immutable [`HashInfo`] snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use digest::Digest;
use serde::{Deserialize, Serialize};

/// An incremental digest computation.
///
/// Built-in algorithms are provided through [`HashAlgorithm`]; custom
/// checksums implement this trait directly and register with
/// [`HashCalculatorManager::add`].
pub trait HashCalculator: Send {
    /// Identifier used as the key in [`HashInfo`].
    fn name(&self) -> &str;

    /// Feeds the next slice of bytes.
    fn update(&mut self, data: &[u8]);

    /// Consumes the calculator and returns the lowercase hex digest.
    fn finalize(self: Box<Self>) -> String;
}

/// Standard digest algorithms. Serialized by canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashAlgorithm {
    Md2,
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// All built-in algorithms.
    pub const ALL: [Self; 6] = [
        Self::Md2,
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
    ];

    /// Canonical algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md2 => "MD2",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Parses an algorithm name, ignoring case and an optional dash.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "MD2" => Some(Self::Md2),
            "MD5" => Some(Self::Md5),
            "SHA1" => Some(Self::Sha1),
            "SHA256" => Some(Self::Sha256),
            "SHA384" => Some(Self::Sha384),
            "SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// Creates a fresh calculator for this algorithm.
    #[must_use]
    pub fn calculator(self) -> Box<dyn HashCalculator> {
        let name = self.name();
        match self {
            Self::Md2 => Box::new(DigestCalculator::<md2::Md2>::new(name)),
            Self::Md5 => Box::new(DigestCalculator::<md5::Md5>::new(name)),
            Self::Sha1 => Box::new(DigestCalculator::<sha1::Sha1>::new(name)),
            Self::Sha256 => Box::new(DigestCalculator::<sha2::Sha256>::new(name)),
            Self::Sha384 => Box::new(DigestCalculator::<sha2::Sha384>::new(name)),
            Self::Sha512 => Box::new(DigestCalculator::<sha2::Sha512>::new(name)),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = UnknownAlgorithm;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HashAlgorithm> for String {
    fn from(value: HashAlgorithm) -> Self {
        value.name().to_string()
    }
}

/// Returned when an algorithm name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

/// Adapter from any RustCrypto [`Digest`] to [`HashCalculator`].
pub struct DigestCalculator<D> {
    name: &'static str,
    digest: D,
}

impl<D: Digest> DigestCalculator<D> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            digest: D::new(),
        }
    }
}

impl<D: Digest + Send> HashCalculator for DigestCalculator<D> {
    fn name(&self) -> &str {
        self.name
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.digest, data);
    }

    fn finalize(self: Box<Self>) -> String {
        hex::encode(self.digest.finalize())
    }
}

/// Name-keyed set of calculators fed in one pass.
#[derive(Default)]
pub struct HashCalculatorManager {
    calculators: Vec<Box<dyn HashCalculator>>,
}

impl fmt::Debug for HashCalculatorManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashCalculatorManager")
            .field("names", &self.names())
            .finish()
    }
}

impl HashCalculatorManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager computing every algorithm in `algorithms`.
    #[must_use]
    pub fn with_algorithms(algorithms: impl IntoIterator<Item = HashAlgorithm>) -> Self {
        algorithms
            .into_iter()
            .fold(Self::new(), Self::with_algorithm)
    }

    /// Adds a built-in algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.add_algorithm(algorithm);
        self
    }

    /// Adds a built-in algorithm, replacing any calculator with the same name.
    pub fn add_algorithm(&mut self, algorithm: HashAlgorithm) {
        self.add(algorithm.calculator());
    }

    /// Registers a calculator. A calculator already registered under the same
    /// name is replaced in place.
    pub fn add(&mut self, calculator: Box<dyn HashCalculator>) {
        match self
            .calculators
            .iter()
            .position(|c| c.name() == calculator.name())
        {
            Some(index) => self.calculators[index] = calculator,
            None => self.calculators.push(calculator),
        }
    }

    /// Feeds `data` to every registered calculator.
    pub fn update(&mut self, data: &[u8]) {
        for calculator in &mut self.calculators {
            calculator.update(data);
        }
    }

    /// Names of the registered calculators, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.calculators.iter().map(|c| c.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calculators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calculators.is_empty()
    }

    /// Finalizes every calculator.
    #[must_use]
    pub fn hash_info(self) -> HashInfo {
        let values = self
            .calculators
            .into_iter()
            .map(|c| (c.name().to_string(), c.finalize()))
            .collect();
        HashInfo { values }
    }
}

/// Immutable `{algorithm name -> hex digest}` snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashInfo {
    values: BTreeMap<String, String>,
}

impl HashInfo {
    /// Digest recorded under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Digest for a built-in algorithm.
    #[must_use]
    pub fn get_algorithm(&self, algorithm: HashAlgorithm) -> Option<&str> {
        self.get(algorithm.name())
    }

    #[must_use]
    pub fn md2(&self) -> Option<&str> {
        self.get_algorithm(HashAlgorithm::Md2)
    }

    #[must_use]
    pub fn md5(&self) -> Option<&str> {
        self.get_algorithm(HashAlgorithm::Md5)
    }

    #[must_use]
    pub fn sha1(&self) -> Option<&str> {
        self.get_algorithm(HashAlgorithm::Sha1)
    }

    #[must_use]
    pub fn sha256(&self) -> Option<&str> {
        self.get_algorithm(HashAlgorithm::Sha256)
    }

    #[must_use]
    pub fn sha384(&self) -> Option<&str> {
        self.get_algorithm(HashAlgorithm::Sha384)
    }

    #[must_use]
    pub fn sha512(&self) -> Option<&str> {
        self.get_algorithm(HashAlgorithm::Sha512)
    }

    /// Iterates `(name, hex digest)` pairs ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
