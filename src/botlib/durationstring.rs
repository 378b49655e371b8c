use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Any magnitude above this is clamped, keeping every span well inside i64 seconds
pub const MAX_MAGNITUDE: u64 = 999;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;
const SECONDS_PER_DAY: u64 = 86400;
const SECONDS_PER_WEEK: u64 = 604800;

/// One capture group per unit, in `Unit::ALL` order
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?:([0-9]+)\s*y(?:ears|ear|rs|r)?)?\s*",
        r"(?:([0-9]+)\s*mo(?:nths|nth)?)?\s*",
        r"(?:([0-9]+)\s*w(?:eeks|eek|ks|k)?)?\s*",
        r"(?:([0-9]+)\s*d(?:ays|ay)?)?\s*",
        r"(?:([0-9]+)\s*h(?:ours|our|rs|r)?)?\s*",
        r"(?:([0-9]+)\s*m(?:inutes|inute|ins|in)?)?\s*",
        r"(?:([0-9]+)\s*s(?:econds|econd|ecs|ec)?)?",
    ))
    .expect("duration regex is valid")
});

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Unit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl Unit {
    /// Every unit, in the order they must appear in a duration string
    pub const ALL: [Unit; 7] = [
        Unit::Years,
        Unit::Months,
        Unit::Weeks,
        Unit::Days,
        Unit::Hours,
        Unit::Minutes,
        Unit::Seconds,
    ];

    /// Plural name of the unit
    pub fn name(&self) -> &'static str {
        match self {
            Unit::Years => "years",
            Unit::Months => "months",
            Unit::Weeks => "weeks",
            Unit::Days => "days",
            Unit::Hours => "hours",
            Unit::Minutes => "minutes",
            Unit::Seconds => "seconds",
        }
    }

    /// Name of the unit with `magnitude` in front, singular when the magnitude is exactly 1
    pub fn format(&self, magnitude: u64) -> String {
        let name = self.name();

        if magnitude == 1 {
            format!("{} {}", magnitude, &name[..name.len() - 1])
        } else {
            format!("{} {}", magnitude, name)
        }
    }
}

/// Magnitude of every unit in a duration string, each within `0..=MAX_MAGNITUDE`
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct DurationSpec {
    pub years: u64,
    pub months: u64,
    pub weeks: u64,
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl DurationSpec {
    pub fn get(&self, unit: Unit) -> u64 {
        match unit {
            Unit::Years => self.years,
            Unit::Months => self.months,
            Unit::Weeks => self.weeks,
            Unit::Days => self.days,
            Unit::Hours => self.hours,
            Unit::Minutes => self.minutes,
            Unit::Seconds => self.seconds,
        }
    }

    fn set(&mut self, unit: Unit, value: u64) {
        let slot = match unit {
            Unit::Years => &mut self.years,
            Unit::Months => &mut self.months,
            Unit::Weeks => &mut self.weeks,
            Unit::Days => &mut self.days,
            Unit::Hours => &mut self.hours,
            Unit::Minutes => &mut self.minutes,
            Unit::Seconds => &mut self.seconds,
        };

        *slot = value.min(MAX_MAGNITUDE);
    }

    pub fn is_zero(&self) -> bool {
        Unit::ALL.iter().all(|unit| self.get(*unit) == 0)
    }

    /// Days with years and months folded in (1 year = 365 days, 1 month = 30 days)
    pub fn effective_days(&self) -> u64 {
        self.days + self.years * 365 + self.months * 30
    }

    /// Length of the span in seconds
    pub fn total_seconds(&self) -> u64 {
        self.weeks * SECONDS_PER_WEEK
            + self.effective_days() * SECONDS_PER_DAY
            + self.hours * SECONDS_PER_HOUR
            + self.minutes * SECONDS_PER_MINUTE
            + self.seconds
    }

    /// Human readable form, e.g. `1 year 2 months 1 day`. Zero units are left out
    pub fn display(&self) -> String {
        Unit::ALL
            .iter()
            .filter(|unit| self.get(**unit) > 0)
            .map(|unit| unit.format(self.get(*unit)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParsedDuration {
    pub spec: DurationSpec,
    pub display: String,
    /// Unix timestamp (seconds) at which the duration runs out
    pub expires_at: i64,
}

impl ParsedDuration {
    pub fn total_seconds(&self) -> u64 {
        self.spec.total_seconds()
    }
}

/// Extracts the magnitudes of the first duration found in `s`
///
/// Only the first match that captured at least one `<number><unit>` token is used,
/// anything after it is ignored. Fails if no token is found or every magnitude is zero
pub fn parse_duration_spec(s: &str) -> Result<DurationSpec, crate::Error> {
    let Some(captures) = DURATION_REGEX
        .captures_iter(s)
        .find(|c| c.iter().skip(1).any(|group| group.is_some()))
    else {
        return Err(format!(
            "Could not find a duration in `{}`. Try something like `1d`, `2h30m` or `1y2mo`",
            s
        )
        .into());
    };

    let mut spec = DurationSpec::default();

    for (i, unit) in Unit::ALL.iter().enumerate() {
        if let Some(value) = captures.get(i + 1) {
            // Only ASCII digits are captured, so a parse failure means the number overflowed
            let value = value.as_str().parse::<u64>().unwrap_or(MAX_MAGNITUDE);
            spec.set(*unit, value);
        }
    }

    if spec.is_zero() {
        return Err("Duration must be longer than zero".into());
    }

    Ok(spec)
}

/// Given a free form duration such as `1y2mo3d` or `2 days 3 hours`, return its
/// display string and the unix timestamp it expires at when counted from `now`
pub fn parse_duration_at(s: &str, now: DateTime<Utc>) -> Result<ParsedDuration, crate::Error> {
    let spec = parse_duration_spec(s)?;

    Ok(ParsedDuration {
        display: spec.display(),
        expires_at: now.timestamp() + spec.total_seconds() as i64,
        spec,
    })
}

/// Same as `parse_duration_at`, counted from the current time
pub fn parse_duration(s: &str) -> Result<ParsedDuration, crate::Error> {
    parse_duration_at(s, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(NOW, 0).unwrap()
    }

    #[test]
    fn single_day() {
        let d = parse_duration_at("1d", now()).unwrap();
        assert_eq!(d.display, "1 day");
        assert_eq!(d.expires_at, NOW + 86400);
    }

    #[test]
    fn spaced_units_are_pluralized() {
        let d = parse_duration_at("2 days 3 hours", now()).unwrap();
        assert_eq!(d.display, "2 days 3 hours");
        assert_eq!(d.expires_at, NOW + 2 * 86400 + 3 * 3600);
    }

    #[test]
    fn years_and_months_fold_into_days() {
        let d = parse_duration_at("1y", now()).unwrap();
        assert_eq!(d.display, "1 year");
        assert_eq!(d.expires_at, NOW + 365 * 86400);

        let d = parse_duration_at("1y2mo3d", now()).unwrap();
        assert_eq!(d.display, "1 year 2 months 3 days");
        assert_eq!(d.spec.effective_days(), 365 + 60 + 3);
        assert_eq!(d.expires_at, NOW + (365 + 60 + 3) * 86400);
    }

    #[test]
    fn magnitudes_are_clamped() {
        let d = parse_duration_at("1000d", now()).unwrap();
        assert_eq!(d.display, "999 days");
        assert_eq!(d.expires_at, NOW + 999 * 86400);

        let d = parse_duration_at("99999999999999999999999999s", now()).unwrap();
        assert_eq!(d.spec.seconds, MAX_MAGNITUDE);
    }

    #[test]
    fn largest_span_does_not_overflow() {
        let d = parse_duration_at("999y999mo999w999d999h999m999s", now()).unwrap();
        assert!(d.expires_at > NOW);
        assert_eq!(d.spec.total_seconds(), d.total_seconds());
    }

    #[test]
    fn minutes_and_months_are_told_apart() {
        let d = parse_duration_at("10m", now()).unwrap();
        assert_eq!(d.display, "10 minutes");
        assert_eq!(d.expires_at, NOW + 600);

        let d = parse_duration_at("3mo", now()).unwrap();
        assert_eq!(d.display, "3 months");

        let d = parse_duration_at("1h 30min", now()).unwrap();
        assert_eq!(d.display, "1 hour 30 minutes");
        assert_eq!(d.expires_at, NOW + 5400);
    }

    #[test]
    fn suffix_spellings() {
        for s in ["2w", "2wk", "2wks", "2 week", "2 weeks"] {
            assert_eq!(parse_duration_at(s, now()).unwrap().spec.weeks, 2, "{}", s);
        }

        for s in ["5s", "5sec", "5secs", "5 second", "5 seconds"] {
            assert_eq!(parse_duration_at(s, now()).unwrap().spec.seconds, 5, "{}", s);
        }

        for s in ["4h", "4hr", "4hrs", "4 hour", "4 hours"] {
            assert_eq!(parse_duration_at(s, now()).unwrap().spec.hours, 4, "{}", s);
        }
    }

    #[test]
    fn only_first_duration_is_used() {
        let d = parse_duration_at("for 2d then 5h", now()).unwrap();
        assert_eq!(d.display, "2 days");
    }

    #[test]
    fn out_of_order_units_start_a_new_match() {
        // `1h` closes the first match since days may not follow hours
        let d = parse_duration_at("1h 2d", now()).unwrap();
        assert_eq!(d.display, "1 hour");
    }

    #[test]
    fn empty_and_zero_durations_are_rejected() {
        assert!(parse_duration_at("", now()).is_err());
        assert!(parse_duration_at("forever", now()).is_err());
        assert!(parse_duration_at("0d", now()).is_err());
        assert!(parse_duration_at("0h 0m", now()).is_err());
    }

    #[test]
    fn expiry_is_not_in_the_past() {
        let start = Utc::now().timestamp();
        let d = parse_duration("1s").unwrap();
        assert!(d.expires_at >= start);
    }
}
