//! Tracking algorithm kinds and the ordered set of kinds the running
//! environment actually provides.

use crate::error::Error;
use crate::tracker::TrackerBackend;
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Csrt,
    Kcf,
    Boosting,
    Mil,
    Tld,
    MedianFlow,
    Mosse,
}

impl Algorithm {
    /// Discovery order. Digit keys index into the available subset of this list,
    /// so the order is user visible.
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Csrt,
        Algorithm::Kcf,
        Algorithm::Boosting,
        Algorithm::Mil,
        Algorithm::Tld,
        Algorithm::MedianFlow,
        Algorithm::Mosse,
    ];

    pub const DEFAULT: Algorithm = Algorithm::Kcf;

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Csrt => "CSRT",
            Algorithm::Kcf => "KCF",
            Algorithm::Boosting => "Boosting",
            Algorithm::Mil => "MIL",
            Algorithm::Tld => "TLD",
            Algorithm::MedianFlow => "MedianFlow",
            Algorithm::Mosse => "MOSSE",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alg = match s.trim().to_ascii_lowercase().as_str() {
            "csrt" => Algorithm::Csrt,
            "kcf" => Algorithm::Kcf,
            "boosting" => Algorithm::Boosting,
            "mil" => Algorithm::Mil,
            "tld" => Algorithm::Tld,
            "medianflow" | "median_flow" | "median-flow" => Algorithm::MedianFlow,
            "mosse" => Algorithm::Mosse,
            _ => return Err(Error::UnknownAlgorithm(s.to_string())),
        };

        Ok(alg)
    }
}

/// Algorithms available in this environment, in [`Algorithm::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    available: Vec<Algorithm>,
}

impl Registry {
    pub fn new<I: IntoIterator<Item = Algorithm>>(algorithms: I) -> Self {
        let mut available: Vec<Algorithm> = Vec::new();

        for alg in algorithms {
            if !available.contains(&alg) {
                available.push(alg);
            }
        }

        Self { available }
    }

    /// Constructs one instance of every kind and keeps the ones the backend
    /// manages to create.
    pub fn discover<F, B: TrackerBackend<F>>(backend: &B) -> Self {
        let available = Algorithm::ALL.into_iter().filter(|&alg| match backend.create(alg) {
            Ok(_) => true,
            Err(err) => {
                log::debug!("tracker {} is not available: {}", alg, err);
                false
            }
        });

        let registry = Self::new(available);
        log::info!(
            "available trackers: [{}]",
            registry
                .iter()
                .enumerate()
                .map(|(idx, alg)| format!("{}: {}", idx + 1, alg))
                .collect::<Vec<_>>()
                .join(", ")
        );

        registry
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.available.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.available.iter().copied()
    }

    /// Zero-based lookup; digit key `1` maps to index `0`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Algorithm> {
        self.available.get(index).copied()
    }

    #[inline]
    pub fn contains(&self, alg: Algorithm) -> bool {
        self.available.contains(&alg)
    }

    /// [`Algorithm::DEFAULT`] when available, otherwise the first available kind.
    pub fn fallback(&self) -> Option<Algorithm> {
        if self.contains(Algorithm::DEFAULT) {
            Some(Algorithm::DEFAULT)
        } else {
            self.get(0)
        }
    }

    /// Maps a user supplied name onto an available algorithm.
    ///
    /// Unknown and unavailable names are not errors: they resolve to
    /// [`Registry::fallback`] with a warning. Only an empty registry fails.
    pub fn resolve(&self, requested: &str) -> Result<Algorithm, Error> {
        let fallback = self.fallback().ok_or(Error::NoAlgorithms)?;

        match requested.parse::<Algorithm>() {
            Ok(alg) if self.contains(alg) => Ok(alg),
            Ok(alg) => {
                log::warn!(
                    "tracker {} is not available in this build, using {}",
                    alg,
                    fallback
                );
                Ok(fallback)
            }
            Err(err) => {
                log::warn!("{}, using {}", err, fallback);
                Ok(fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!("KCF".parse::<Algorithm>().unwrap(), Algorithm::Kcf);
        assert_eq!(" csrt ".parse::<Algorithm>().unwrap(), Algorithm::Csrt);
        assert_eq!(
            "median-flow".parse::<Algorithm>().unwrap(),
            Algorithm::MedianFlow
        );
        assert!(matches!(
            "goturn".parse::<Algorithm>(),
            Err(Error::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn registry_keeps_first_occurrence_order() {
        let reg = Registry::new([Algorithm::Mil, Algorithm::Csrt, Algorithm::Mil]);

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(0), Some(Algorithm::Mil));
        assert_eq!(reg.get(1), Some(Algorithm::Csrt));
        assert_eq!(reg.get(2), None);
    }

    #[test]
    fn unavailable_name_falls_back_to_default() {
        let reg = Registry::new([Algorithm::Csrt, Algorithm::Kcf, Algorithm::Mil]);

        assert_eq!(reg.resolve("mosse").unwrap(), Algorithm::Kcf);
        assert_eq!(reg.resolve("no-such-tracker").unwrap(), Algorithm::Kcf);
        assert_eq!(reg.resolve("mil").unwrap(), Algorithm::Mil);
    }

    #[test]
    fn fallback_without_default_uses_first() {
        let reg = Registry::new([Algorithm::Mil, Algorithm::Csrt]);

        assert_eq!(reg.resolve("kcf").unwrap(), Algorithm::Mil);
    }

    #[test]
    fn empty_registry_fails() {
        let reg = Registry::new([]);

        assert!(matches!(reg.resolve("kcf"), Err(Error::NoAlgorithms)));
    }
}
