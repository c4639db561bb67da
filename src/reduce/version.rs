// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Release versions and version-range specifiers, e.g. ">=1.2, <2".

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use lazy_static::lazy_static;
use regex::Regex;

use super::CitlaliError;

lazy_static! {
    static ref RELEASE: Regex = Regex::new(r"^v?(\d+(?:\.\d+)*)").unwrap();
    static ref CLAUSE: Regex =
        Regex::new(r"^\s*(~=|===|==|!=|>=|<=|>|<)\s*(v?\d+(?:\.\d+)*)(\.\*)?\s*$").unwrap();
}

/// The numeric release segment of a version string. Anything after the
/// release numbers (e.g. a git describe suffix) is ignored.
/// Missing trailing segments are zero, so "1.3" == "1.3.0".
#[derive(Debug, Clone)]
pub struct Version(Vec<u64>);

impl Version {
    fn segment(&self, i: usize) -> u64 {
        self.0.get(i).copied().unwrap_or(0)
    }

    fn starts_with(&self, prefix: &Version) -> bool {
        (0..prefix.0.len()).all(|i| self.segment(i) == prefix.segment(i))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let n = self.0.len().max(other.0.len());
        (0..n)
            .map(|i| self.segment(i).cmp(&other.segment(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl FromStr for Version {
    type Err = CitlaliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RELEASE
            .captures(s.trim())
            .ok_or_else(|| CitlaliError::BadVersion(s.to_string()))?;
        caps[1]
            .split('.')
            .map(|n| n.parse().map_err(|_| CitlaliError::BadVersion(s.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Version)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Compatible,
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    op: Op,
    version: Version,
    wildcard: bool,
}

impl Clause {
    fn contains(&self, v: &Version) -> bool {
        match (self.op, self.wildcard) {
            (Op::Equal, true) => v.starts_with(&self.version),
            (Op::NotEqual, true) => !v.starts_with(&self.version),
            (Op::Equal, false) => v == &self.version,
            (Op::NotEqual, false) => v != &self.version,
            (Op::GreaterEqual, _) => v >= &self.version,
            (Op::LessEqual, _) => v <= &self.version,
            (Op::Greater, _) => v > &self.version,
            (Op::Less, _) => v < &self.version,
            // "~=1.4.2" is ">=1.4.2, ==1.4.*".
            (Op::Compatible, _) => {
                let n = self.version.0.len().saturating_sub(1).max(1);
                let prefix = Version(self.version.0[..n].to_vec());
                v >= &self.version && v.starts_with(&prefix)
            }
        }
    }
}

/// A comma-separated set of version clauses that must all hold.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionSpecifiers {
    clauses: Vec<Clause>,
    text: String,
}

impl VersionSpecifiers {
    pub fn contains(&self, v: &Version) -> bool {
        self.clauses.iter().all(|c| c.contains(v))
    }
}

impl FromStr for VersionSpecifiers {
    type Err = CitlaliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || CitlaliError::BadVersionSpecifiers(s.to_string());
        let clauses = s
            .split(',')
            .filter(|c| !c.trim().is_empty())
            .map(|c| {
                let caps = CLAUSE.captures(c).ok_or_else(bad)?;
                let op = match &caps[1] {
                    "~=" => Op::Compatible,
                    "==" | "===" => Op::Equal,
                    "!=" => Op::NotEqual,
                    ">=" => Op::GreaterEqual,
                    "<=" => Op::LessEqual,
                    ">" => Op::Greater,
                    _ => Op::Less,
                };
                let wildcard = caps.get(3).is_some();
                if wildcard && !matches!(op, Op::Equal | Op::NotEqual) {
                    return Err(bad());
                }
                Ok(Clause {
                    op,
                    version: caps[2].parse().map_err(|_| bad())?,
                    wildcard,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if clauses.is_empty() {
            return Err(bad());
        }
        Ok(VersionSpecifiers {
            clauses,
            text: s.trim().to_string(),
        })
    }
}

impl Display for VersionSpecifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
