use std::fmt;
use std::str::FromStr;

/// Which cell a pending input belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellAddress {
    /// A condition leaf, or one inner rule of a group (`inner` is 0 for plain leaves).
    Condition {
        row: usize,
        column: usize,
        inner: usize,
    },
    Result { row: usize, key: String },
}

/// Part of a composite input that is buffered separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySuffix {
    Min,
    Max,
    List,
}

impl KeySuffix {
    const ALL: [KeySuffix; 3] = [KeySuffix::Min, KeySuffix::Max, KeySuffix::List];

    fn as_str(self) -> &'static str {
        match self {
            KeySuffix::Min => "min",
            KeySuffix::Max => "max",
            KeySuffix::List => "list",
        }
    }
}

/// Typed key of the pending input cache.
///
/// The string form matches the editor's historic keys: `"{row}-{column}-{inner}"` for
/// condition cells and `"result-{row}-{key}"` for result cells, each optionally followed
/// by `-min`, `-max` or `-list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub address: CellAddress,
    pub suffix: Option<KeySuffix>,
}

impl CacheKey {
    pub fn condition(row: usize, column: usize, inner: usize) -> Self {
        Self {
            address: CellAddress::Condition { row, column, inner },
            suffix: None,
        }
    }

    pub fn result(row: usize, key: impl Into<String>) -> Self {
        Self {
            address: CellAddress::Result {
                row,
                key: key.into(),
            },
            suffix: None,
        }
    }

    pub fn with_suffix(mut self, suffix: KeySuffix) -> Self {
        self.suffix = Some(suffix);
        self
    }

    /// The key without its composite suffix.
    pub fn base(&self) -> CacheKey {
        CacheKey {
            address: self.address.clone(),
            suffix: None,
        }
    }

    pub fn row(&self) -> usize {
        match self.address {
            CellAddress::Condition { row, .. } | CellAddress::Result { row, .. } => row,
        }
    }

    pub(crate) fn set_row(&mut self, new_row: usize) {
        match &mut self.address {
            CellAddress::Condition { row, .. } | CellAddress::Result { row, .. } => {
                *row = new_row
            }
        }
    }

    pub fn is_condition(&self) -> bool {
        matches!(self.address, CellAddress::Condition { .. })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            CellAddress::Condition { row, column, inner } => {
                write!(f, "{}-{}-{}", row, column, inner)?
            }
            CellAddress::Result { row, key } => write!(f, "result-{}-{}", row, key)?,
        }
        if let Some(suffix) = self.suffix {
            write!(f, "-{}", suffix.as_str())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError(pub String);

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pending input key '{}'", self.0)
    }
}

impl std::error::Error for ParseKeyError {}

impl FromStr for CacheKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseKeyError(s.to_string());

        let (body, suffix) = KeySuffix::ALL
            .iter()
            .find_map(|suffix| {
                s.strip_suffix(suffix.as_str())
                    .and_then(|rest| rest.strip_suffix('-'))
                    .map(|rest| (rest, Some(*suffix)))
            })
            .unwrap_or((s, None));

        let address = if let Some(rest) = body.strip_prefix("result-") {
            let (row, key) = rest.split_once('-').ok_or_else(invalid)?;
            if key.is_empty() {
                return Err(invalid());
            }
            CellAddress::Result {
                row: row.parse().map_err(|_| invalid())?,
                key: key.to_string(),
            }
        } else {
            let mut parts = body.split('-');
            let mut next = || -> Result<usize, ParseKeyError> {
                parts
                    .next()
                    .and_then(|p| p.parse().ok())
                    .ok_or_else(invalid)
            };
            let address = CellAddress::Condition {
                row: next()?,
                column: next()?,
                inner: next()?,
            };
            if parts.next().is_some() {
                return Err(invalid());
            }
            address
        };

        Ok(CacheKey { address, suffix })
    }
}
