//! Age-based retention.
//!
//! Age is the floor of the elapsed time in whole days, measured from the
//! snapshot's modification time. This is *not* a calendar-day difference: a
//! snapshot taken at 23:59 is still zero days old at 00:01 the next morning.

use stockpile_storage::SnapshotRecord;
use time::OffsetDateTime;

pub const DEFAULT_MAX_AGE_DAYS: u32 = stockpile_config::DEFAULT_RETENTION_DAYS;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days elapsed between the snapshot's modification time and `now`.
///
/// Snapshots from the future (clock skew) have a negative age.
pub fn age_days(record: &SnapshotRecord, now: OffsetDateTime) -> i64 {
    (now - record.created_at).whole_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Snapshots strictly older than `max_age_days`.
///
/// A snapshot exactly `max_age_days` old is kept for one more day.
pub fn select_expired(records: &[SnapshotRecord], max_age_days: u32, now: OffsetDateTime) -> Vec<&SnapshotRecord> {
    records.iter().filter(|record| age_days(record, now) > i64::from(max_age_days)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::Duration;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-06-15 12:00:00 UTC);

    fn aged(age: Duration) -> SnapshotRecord {
        SnapshotRecord::new("/backups/inventory_backup_20240101_000000.db", 0, NOW - age)
    }

    #[rstest]
    #[case(Duration::ZERO, 0)]
    #[case(Duration::hours(23) + Duration::minutes(59), 0)]
    #[case(Duration::days(1), 1)]
    #[case(Duration::days(30) + Duration::hours(23), 30)]
    #[case(Duration::seconds(-1), -1)]
    fn test_age_days_floors(#[case] age: Duration, #[case] expected: i64) {
        assert_eq!(age_days(&aged(age), NOW), expected);
    }

    #[rstest]
    #[case(Duration::days(30), false)]
    #[case(Duration::days(30) + Duration::hours(23) + Duration::minutes(59), false)]
    #[case(Duration::days(31), true)]
    #[case(Duration::days(365), true)]
    #[case(Duration::days(-5), false)]
    fn test_boundary(#[case] age: Duration, #[case] expired: bool) {
        let records = [aged(age)];
        assert_eq!(!select_expired(&records, 30, NOW).is_empty(), expired);
    }

    #[test]
    fn test_mixed_ages() {
        let records: Vec<_> = [10, 29, 30, 31, 45].into_iter().map(|days| aged(Duration::days(days))).collect();
        let expired: Vec<_> = select_expired(&records, DEFAULT_MAX_AGE_DAYS, NOW)
            .into_iter()
            .map(|record| age_days(record, NOW))
            .collect();
        assert_eq!(expired, vec![31, 45]);
    }

    #[test]
    fn test_zero_keeps_only_today() {
        let records = [aged(Duration::hours(1)), aged(Duration::hours(25))];
        let expired = select_expired(&records, 0, NOW);
        assert_eq!(expired, vec![&records[1]]);
    }
}
