//! Long-term support branch discovery
//!
//! LTS branches are not found by scanning branches. Each supported major has
//! a registry dist-tag `v{major}-lts` pointing at its most recent patch
//! release, and the branch is derived from that version.

use crate::error::{Error, Result};
use crate::registry::PackageRegistry;
use crate::types::{LtsBranch, LtsBranches, PackageMetadata};
use crate::version::Version;
use chrono::{DateTime, Months, Utc};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Months a major stays in active development after its release
pub const ACTIVE_SUPPORT_MONTHS: u32 = 6;

/// Months of long-term support following active support
pub const LONG_TERM_SUPPORT_MONTHS: u32 = 12;

static LTS_DIST_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v(\d+)-lts$").expect("valid regex"));

/// Dist-tag marking a major as being in long-term support
pub fn lts_dist_tag_for_major(major: u64) -> String {
    format!("v{major}-lts")
}

/// Major version encoded in an LTS dist-tag, if `tag` is one
pub fn major_of_lts_dist_tag(tag: &str) -> Option<u64> {
    LTS_DIST_TAG
        .captures(tag)
        .and_then(|caps| caps[1].parse().ok())
}

/// Date on which support for a major ends, given the release date of its
/// `{major}.0.0` version
pub fn compute_lts_end_date(major_release: DateTime<Utc>) -> Result<DateTime<Utc>> {
    major_release
        .checked_add_months(Months::new(
            ACTIVE_SUPPORT_MONTHS + LONG_TERM_SUPPORT_MONTHS,
        ))
        .ok_or_else(|| Error::Internal(format!("LTS end date overflows for {major_release}")))
}

/// Split the LTS dist-tags of a package into active and inactive branches
pub fn classify_lts_branches(metadata: &PackageMetadata, now: DateTime<Utc>) -> Result<LtsBranches> {
    let mut branches = LtsBranches::default();

    for (tag, version) in &metadata.dist_tags {
        let Some(major) = major_of_lts_dist_tag(tag) else {
            continue;
        };
        let version = Version::parse(version)?;
        if version.major != major {
            return Err(Error::Registry(format!(
                "dist-tag {tag} points to {version}, which is not a v{major} release"
            )));
        }

        let major_release = Version::new(major, 0, 0).to_string();
        let released = metadata.publish_times.get(&major_release).ok_or_else(|| {
            Error::Registry(format!(
                "no publish time recorded for {major_release}, cannot compute LTS end date"
            ))
        })?;
        let end = compute_lts_end_date(*released)?;

        let branch = LtsBranch {
            name: version.version_branch_name(),
            version,
            dist_tag: tag.clone(),
        };
        debug!(branch = %branch.name, %end, "classified LTS branch");

        if now <= end {
            branches.active.push(branch);
        } else {
            branches.inactive.push(branch);
        }
    }

    branches.active.sort_by(|a, b| b.version.cmp(&a.version));
    branches.inactive.sort_by(|a, b| b.version.cmp(&a.version));
    Ok(branches)
}

/// Query the registry for the LTS branches of the primary package
pub async fn find_lts_branches(
    registry: &dyn PackageRegistry,
    primary_package: &str,
    now: DateTime<Utc>,
) -> Result<LtsBranches> {
    let metadata = registry.fetch_package_metadata(primary_package).await?;
    classify_lts_branches(&metadata, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_major_of_lts_dist_tag() {
        assert_eq!(major_of_lts_dist_tag("v10-lts"), Some(10));
        assert_eq!(major_of_lts_dist_tag(&lts_dist_tag_for_major(7)), Some(7));
        assert_eq!(major_of_lts_dist_tag("latest"), None);
        assert_eq!(major_of_lts_dist_tag("v10-lts-old"), None);
    }

    #[test]
    fn test_end_date_is_eighteen_months_later() {
        assert_eq!(compute_lts_end_date(at(2020, 6, 24)).unwrap(), at(2021, 12, 24));
        // Clamped to the last day of the month
        assert_eq!(compute_lts_end_date(at(2020, 8, 31)).unwrap(), at(2022, 2, 28));
    }

    #[test]
    fn test_end_date_is_inclusive() {
        let mut metadata = PackageMetadata::default();
        metadata
            .dist_tags
            .insert("v9-lts".to_string(), "9.0.1".to_string());
        metadata
            .publish_times
            .insert("9.0.0".to_string(), at(2020, 1, 1));

        let branches = classify_lts_branches(&metadata, at(2021, 7, 1)).unwrap();
        assert_eq!(branches.active.len(), 1);

        let branches = classify_lts_branches(&metadata, at(2021, 7, 2)).unwrap();
        assert_eq!(branches.inactive.len(), 1);
    }

    #[test]
    fn test_missing_major_release_time() {
        let mut metadata = PackageMetadata::default();
        metadata
            .dist_tags
            .insert("v9-lts".to_string(), "9.0.1".to_string());
        assert!(matches!(
            classify_lts_branches(&metadata, at(2021, 1, 1)),
            Err(Error::Registry(_))
        ));
    }
}
