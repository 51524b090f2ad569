//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for remote identifiers, file names and backup
//! periods. Each newtype ensures data validity at construction time, so
//! values that reach a query expression or a local path are already safe.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// CycleId
// ============================================================================

/// Identifier of a single sync cycle, used to correlate log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(Uuid);

impl CycleId {
    /// Create a new random CycleId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CycleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CycleId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid CycleId: {e}")))
    }
}

// ============================================================================
// RemoteId
// ============================================================================

/// Remote store identifier for a file or a container
///
/// Drive ids are opaque strings made of ASCII letters, digits, `-` and `_`.
/// The alias `root` is also accepted. Anything else is rejected, which keeps
/// ids safe to embed in a quoted query literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Alias the remote store accepts for the user's root container
    pub const ROOT_ALIAS: &'static str = "root";

    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRemoteId` if the id is empty or contains
    /// characters outside `[A-Za-z0-9_-]`
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// The `root` alias
    #[must_use]
    pub fn root() -> Self {
        Self(Self::ROOT_ALIAS.to_string())
    }

    /// Returns true if this is the `root` alias rather than a concrete id
    #[must_use]
    pub fn is_root_alias(&self) -> bool {
        self.0 == Self::ROOT_ALIAS
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// FileName
// ============================================================================

/// A remote file name that maps onto exactly one entry of the download
/// directory
///
/// Rejects names that would escape the directory or address a different
/// entry: empty names, `.`/`..`, and names containing `/`, `\` or NUL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    /// Create a new FileName
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFileName` if the name is not a single
    /// path component
    pub fn new(name: String) -> Result<Self, DomainError> {
        if name.is_empty() || name == "." || name == ".." {
            return Err(DomainError::InvalidFileName(format!(
                "Not a usable file name: '{name}'"
            )));
        }

        if name.contains(['/', '\\', '\0']) {
            return Err(DomainError::InvalidFileName(format!(
                "File name contains a path separator: {name}"
            )));
        }

        Ok(Self(name))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for FileName {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileName> for String {
    fn from(name: FileName) -> Self {
        name.0
    }
}

impl AsRef<std::path::Path> for FileName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

// ============================================================================
// BackupPeriod
// ============================================================================

/// Calendar year and month naming a backup container, rendered `yyyyMM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupPeriod {
    year: i32,
    month: u32,
}

impl BackupPeriod {
    /// Create a period from its parts
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPeriod` for a month outside 1..=12 or a
    /// year outside 1000..=9999
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::InvalidPeriod(format!(
                "month out of range: {month}"
            )));
        }
        if !(1000..=9999).contains(&year) {
            return Err(DomainError::InvalidPeriod(format!(
                "year out of range: {year}"
            )));
        }
        Ok(Self { year, month })
    }

    /// The period containing the given instant on the host's local calendar
    ///
    /// Backup folders are named after the month the user sees on the
    /// machine, so an upload at 23:30 on the last day of the month lands
    /// in that month even when UTC has already rolled over.
    #[must_use]
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self::of_in(instant, &Local)
    }

    /// The period containing `instant` on the calendar of `tz`
    #[must_use]
    pub fn of_in<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> Self {
        let local = instant.with_timezone(tz);
        Self {
            year: local.year(),
            month: local.month(),
        }
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Container name for this period
    #[must_use]
    pub fn container_name(&self) -> String {
        self.to_string()
    }
}

impl Display for BackupPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for BackupPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidPeriod(format!(
                "expected yyyyMM, got '{s}'"
            )));
        }
        let year = s[..4]
            .parse::<i32>()
            .map_err(|e| DomainError::InvalidPeriod(format!("{s}: {e}")))?;
        let month = s[4..]
            .parse::<u32>()
            .map_err(|e| DomainError::InvalidPeriod(format!("{s}: {e}")))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for BackupPeriod {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BackupPeriod> for String {
    fn from(period: BackupPeriod) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod remote_id_tests {
        use super::*;

        #[test]
        fn test_valid_drive_id() {
            let id = RemoteId::new("1AbC-x_9zQ".to_string()).unwrap();
            assert_eq!(id.as_str(), "1AbC-x_9zQ");
            assert!(!id.is_root_alias());
        }

        #[test]
        fn test_root_alias() {
            let id = RemoteId::root();
            assert_eq!(id.as_str(), "root");
            assert!(id.is_root_alias());
        }

        #[test]
        fn test_empty_rejected() {
            assert!(RemoteId::new(String::new()).is_err());
        }

        #[test]
        fn test_quote_rejected() {
            let result = RemoteId::new("abc' or '1".to_string());
            assert!(matches!(result, Err(DomainError::InvalidRemoteId(_))));
        }

        #[test]
        fn test_serde_roundtrip() {
            let id = RemoteId::new("folder_01".to_string()).unwrap();
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, "\"folder_01\"");
            let back: RemoteId = serde_json::from_str(&json).unwrap();
            assert_eq!(back, id);
        }

        #[test]
        fn test_deserialize_invalid_fails() {
            let result: Result<RemoteId, _> = serde_json::from_str("\"a b\"");
            assert!(result.is_err());
        }
    }

    mod file_name_tests {
        use super::*;

        #[test]
        fn test_plain_name() {
            let name = FileName::new("IMG_0001.jpg".to_string()).unwrap();
            assert_eq!(name.as_str(), "IMG_0001.jpg");
            assert_eq!(name.to_string(), "IMG_0001.jpg");
        }

        #[test]
        fn test_unicode_and_spaces_allowed() {
            assert!(FileName::new("写真 2026.png".to_string()).is_ok());
        }

        #[test]
        fn test_traversal_rejected() {
            assert!(FileName::new("..".to_string()).is_err());
            assert!(FileName::new(".".to_string()).is_err());
            assert!(FileName::new("../etc/passwd".to_string()).is_err());
            assert!(FileName::new("a\\b.jpg".to_string()).is_err());
            assert!(FileName::new(String::new()).is_err());
        }

        #[test]
        fn test_joins_as_single_component() {
            let name = FileName::new("a.jpg".to_string()).unwrap();
            let path = std::path::Path::new("/tmp/downloads").join(&name);
            assert_eq!(path, std::path::PathBuf::from("/tmp/downloads/a.jpg"));
        }
    }

    mod backup_period_tests {
        use super::*;

        #[test]
        fn test_of_instant() {
            let t = Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap();
            let period = BackupPeriod::of(t);
            assert_eq!(period.year(), 2026);
            assert_eq!(period.month(), 3);
            assert_eq!(period.container_name(), "202603");
        }

        #[test]
        fn test_of_uses_the_local_calendar() {
            let t = Utc.with_ymd_and_hms(2026, 3, 31, 23, 30, 0).unwrap();
            let expected = t.with_timezone(&Local);
            let period = BackupPeriod::of(t);
            assert_eq!(period.year(), expected.year());
            assert_eq!(period.month(), expected.month());
        }

        #[test]
        fn test_of_in_month_boundary_follows_the_zone() {
            let t = Utc.with_ymd_and_hms(2026, 3, 31, 23, 30, 0).unwrap();
            let madrid_summer = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
            let new_york = chrono::FixedOffset::west_opt(4 * 3600).unwrap();

            assert_eq!(BackupPeriod::of_in(t, &Utc).container_name(), "202603");
            assert_eq!(BackupPeriod::of_in(t, &madrid_summer).container_name(), "202604");
            assert_eq!(BackupPeriod::of_in(t, &new_york).container_name(), "202603");

            let new_year = Utc.with_ymd_and_hms(2027, 1, 1, 2, 0, 0).unwrap();
            assert_eq!(BackupPeriod::of_in(new_year, &new_york).container_name(), "202612");
        }

        #[test]
        fn test_parse() {
            let period: BackupPeriod = "202612".parse().unwrap();
            assert_eq!(period, BackupPeriod::new(2026, 12).unwrap());
        }

        #[test]
        fn test_parse_invalid() {
            assert!("2026-1".parse::<BackupPeriod>().is_err());
            assert!("202613".parse::<BackupPeriod>().is_err());
            assert!("202600".parse::<BackupPeriod>().is_err());
            assert!("abcdef".parse::<BackupPeriod>().is_err());
        }

        #[test]
        fn test_ordering_follows_calendar() {
            let dec = BackupPeriod::new(2025, 12).unwrap();
            let jan = BackupPeriod::new(2026, 1).unwrap();
            assert!(dec < jan);
        }

        #[test]
        fn test_serde_as_string() {
            let period = BackupPeriod::new(2026, 10).unwrap();
            let json = serde_json::to_string(&period).unwrap();
            assert_eq!(json, "\"202610\"");
        }
    }

    #[test]
    fn test_cycle_ids_are_unique() {
        assert_ne!(CycleId::new(), CycleId::new());
    }

    #[test]
    fn test_cycle_id_parse_roundtrip() {
        let id = CycleId::new();
        let parsed: CycleId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
