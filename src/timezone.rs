use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Get the UTC offset of a canonical timezone such as "Pacific/Auckland" at `at`.
pub fn get_local_offset(canonical_timezone: &str, at: OffsetDateTime) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&at).to_utc())
}

/// The current time in a canonical timezone.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if `canonical_timezone` is not a known timezone.
pub fn now_in_timezone(canonical_timezone: &str) -> Result<OffsetDateTime, Error> {
    let now = OffsetDateTime::now_utc();
    let offset = get_local_offset(canonical_timezone, now)
        .ok_or_else(|| Error::InvalidTimezoneError(canonical_timezone.to_owned()))?;

    Ok(now.to_offset(offset))
}
