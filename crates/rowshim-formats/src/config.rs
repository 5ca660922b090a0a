//! Conversion configuration threaded into schema and value converters.
//!
//! There is no process-wide state: every read/write pass receives its own
//! [`ConversionConfig`] at construction time.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
};

/// Calendar used to place dates and timestamps in host time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostZone {
    /// The process-local time zone.
    #[default]
    Local,
    /// UTC.
    Utc,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl HostZone {
    /// Returns the start of `date` in this zone.
    ///
    /// When local midnight falls in a DST gap, the day starts at the first
    /// instant after the gap.
    #[must_use]
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<FixedOffset> {
        self.localize(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Interprets a wall-clock time in this zone.
    ///
    /// Ambiguous times take the earlier instant. Times skipped by a DST gap
    /// are pushed forward by the length of the gap.
    #[must_use]
    pub fn localize(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        match self {
            Self::Local => wall_time(&Local, naive),
            Self::Utc => Utc.from_utc_datetime(&naive).fixed_offset(),
            Self::Fixed(offset) => wall_time(offset, naive),
        }
    }

    /// Moves a UTC instant into this zone.
    #[must_use]
    pub fn in_zone(&self, utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Local => utc.with_timezone(&Local).fixed_offset(),
            Self::Utc => utc.fixed_offset(),
            Self::Fixed(offset) => utc.with_timezone(offset),
        }
    }

    /// Returns the calendar date of `instant` as seen in this zone.
    #[must_use]
    pub fn date_of(&self, instant: &DateTime<FixedOffset>) -> NaiveDate {
        self.in_zone(instant.with_timezone(&Utc)).date_naive()
    }
}

fn wall_time<Tz: TimeZone>(zone: &Tz, naive: NaiveDateTime) -> DateTime<FixedOffset> {
    if let Some(instant) = zone.from_local_datetime(&naive).earliest() {
        return instant.fixed_offset();
    }
    // Inside a gap: apply the offset in force a day earlier, before the gap.
    let earlier = naive.checked_sub_signed(TimeDelta::days(1)).unwrap_or(naive);
    let offset = zone.offset_from_utc_datetime(&earlier).fix();
    zone.from_utc_datetime(&(naive - offset)).fixed_offset()
}

/// What happens to a row when one of its fields fails to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldErrorPolicy {
    /// The failed field becomes absent; the row is still emitted.
    #[default]
    AbsentOnError,
    /// The whole row is rejected with the first conversion error.
    FailRow,
}

str_enum!(FieldErrorPolicy, lowercase, "field_error_policy",
    AbsentOnError => "absent_on_error", "null", "permissive";
    FailRow => "fail_row", "strict");

/// Settings shared by every converter in a read or write pass.
#[derive(Debug, Clone, Default)]
pub struct ConversionConfig {
    /// Calendar for epoch-day dates and timestamp display.
    pub zone: HostZone,

    /// Whether field names of the form `name<DELIM>type<DELIM>nullable`
    /// written by older schema marshalling are decoded (default: `false`).
    pub legacy_field_names: bool,

    /// Row-assembly rule for field conversion failures.
    pub field_error_policy: FieldErrorPolicy,
}

impl ConversionConfig {
    /// Creates a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host calendar.
    #[must_use]
    pub fn with_zone(mut self, zone: HostZone) -> Self {
        self.zone = zone;
        self
    }

    /// Enables or disables legacy compound field-name decoding.
    #[must_use]
    pub fn with_legacy_field_names(mut self, enabled: bool) -> Self {
        self.legacy_field_names = enabled;
        self
    }

    /// Sets the field error policy.
    #[must_use]
    pub fn with_field_error_policy(mut self, policy: FieldErrorPolicy) -> Self {
        self.field_error_policy = policy;
        self
    }
}
