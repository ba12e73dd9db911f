//! Reminder durations and the VALARM blocks built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::CalDavError;
use crate::ics::escape_text;

/// A duration before the event start at which a display alarm fires.
///
/// Only weeks, days, hours, minutes and seconds are representable; months
/// and years have no fixed length and are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reminder {
    pub weeks: Option<u32>,
    pub days: Option<u32>,
    pub hours: Option<u32>,
    pub minutes: Option<u32>,
    pub seconds: Option<u32>,
}

impl Reminder {
    pub fn minutes(minutes: u32) -> Self {
        Reminder {
            minutes: Some(minutes),
            ..Default::default()
        }
    }

    /// `TRIGGER` value: always relative to and before the start.
    pub fn trigger(&self) -> String {
        format!("-{}", self)
    }

    /// Read a `TRIGGER` value. Only before-start (`-P...`) triggers count.
    pub fn from_trigger(value: &str) -> Option<Self> {
        value.trim().strip_prefix('-')?.parse().ok()
    }

    /// Human text, e.g. `1 day 2 Hr`. Falls back to the ISO form when only
    /// seconds are present.
    pub fn to_text(&self, labels: &UnitLabels) -> String {
        let mut parts = Vec::new();
        if let Some(w) = self.weeks {
            parts.push(format!("{} {}", w, labels.pick(w, labels.week, labels.weeks)));
        }
        if let Some(d) = self.days {
            parts.push(format!("{} {}", d, labels.pick(d, labels.day, labels.days)));
        }
        if let Some(h) = self.hours {
            parts.push(format!("{} {}", h, labels.hour));
        }
        if let Some(m) = self.minutes {
            parts.push(format!("{} {}", m, labels.minute));
        }

        if parts.is_empty() {
            self.to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Logical lines of one VALARM block.
    pub fn valarm_lines(&self, title: &str) -> Vec<String> {
        vec![
            "BEGIN:VALARM".to_string(),
            "ACTION:DISPLAY".to_string(),
            format!("DESCRIPTION:{}", escape_text(title)),
            format!("TRIGGER:{}", self.trigger()),
            "END:VALARM".to_string(),
        ]
    }
}

/// Parse one reminder per non-empty entry, failing on the first invalid one.
pub fn parse_reminders<I, S>(entries: I) -> Result<Vec<Reminder>, CalDavError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter(|entry| !entry.as_ref().trim().is_empty())
        .map(|entry| entry.as_ref().parse())
        .collect()
}

impl FromStr for Reminder {
    type Err = CalDavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_uppercase();
        let invalid = || {
            CalDavError::validation(
                "reminder",
                format!(
                    "'{}' is not a supported duration. Examples: PT15M (15 Min), PT1H (1 Hr), P1D (1 day), P1W (1 week)",
                    s.trim()
                ),
            )
        };

        let rest = input.strip_prefix('P').ok_or_else(invalid)?;
        let (date_part, time_part) = match rest.split_once('T') {
            Some((date, time)) => {
                if time.is_empty() {
                    return Err(invalid());
                }
                (date, Some(time))
            }
            None => (rest, None),
        };

        let mut reminder = Reminder::default();
        {
            let mut date_slots: [(char, &mut Option<u32>); 2] =
                [('W', &mut reminder.weeks), ('D', &mut reminder.days)];
            parse_components(date_part, &mut date_slots).ok_or_else(invalid)?;
        }
        if let Some(time_part) = time_part {
            let mut time_slots: [(char, &mut Option<u32>); 3] = [
                ('H', &mut reminder.hours),
                ('M', &mut reminder.minutes),
                ('S', &mut reminder.seconds),
            ];
            parse_components(time_part, &mut time_slots).ok_or_else(invalid)?;
        }

        if reminder == Reminder::default() {
            return Err(invalid());
        }
        Ok(reminder)
    }
}

/// Fill `slots` from `<digits><unit>` pairs. Units must appear at most once
/// and in slot order.
fn parse_components(input: &str, slots: &mut [(char, &mut Option<u32>)]) -> Option<()> {
    let mut next_slot = 0;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return None;
        }
        let offset = slots[next_slot..].iter().position(|(unit, _)| *unit == c)?;
        let slot = next_slot + offset;
        *slots[slot].1 = Some(digits.parse().ok()?);
        next_slot = slot + 1;
        digits.clear();
    }

    digits.is_empty().then_some(())
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P")?;
        if let Some(w) = self.weeks {
            write!(f, "{}W", w)?;
        }
        if let Some(d) = self.days {
            write!(f, "{}D", d)?;
        }
        if self.hours.is_some() || self.minutes.is_some() || self.seconds.is_some() {
            write!(f, "T")?;
            if let Some(h) = self.hours {
                write!(f, "{}H", h)?;
            }
            if let Some(m) = self.minutes {
                write!(f, "{}M", m)?;
            }
            if let Some(s) = self.seconds {
                write!(f, "{}S", s)?;
            }
        }
        Ok(())
    }
}

impl Serialize for Reminder {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Unit names for [`Reminder::to_text`]. Plurals only affect display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitLabels {
    pub week: &'static str,
    pub weeks: &'static str,
    pub day: &'static str,
    pub days: &'static str,
    pub hour: &'static str,
    pub minute: &'static str,
}

impl UnitLabels {
    pub const fn english() -> Self {
        UnitLabels {
            week: "week",
            weeks: "weeks",
            day: "day",
            days: "days",
            hour: "Hr",
            minute: "Min",
        }
    }

    pub const fn german() -> Self {
        UnitLabels {
            week: "Woche",
            weeks: "Wochen",
            day: "Tag",
            days: "Tage",
            hour: "Std",
            minute: "Min",
        }
    }

    fn pick(&self, count: u32, singular: &'static str, plural: &'static str) -> &'static str {
        if count > 1 { plural } else { singular }
    }
}

impl Default for UnitLabels {
    fn default() -> Self {
        UnitLabels::english()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifteen_minutes_renders_as_min() {
        let reminder: Reminder = "PT15M".parse().unwrap();
        assert_eq!(reminder, Reminder::minutes(15));
        assert_eq!(reminder.to_text(&UnitLabels::english()), "15 Min");
        assert_eq!(reminder.to_text(&UnitLabels::german()), "15 Min");
    }

    #[test]
    fn years_and_months_are_rejected() {
        assert!("P1Y".parse::<Reminder>().is_err());
        assert!("P1M".parse::<Reminder>().is_err());
    }

    #[test]
    fn empty_and_malformed_durations_are_rejected() {
        for input in ["", "P", "PT", "P1DT", "15M", "PT15", "PTM", "PT15M1H", "P1D1W", "P1D1D"] {
            assert!(input.parse::<Reminder>().is_err(), "{} should fail", input);
        }
    }

    #[test]
    fn accepts_lowercase_and_combined_components() {
        let reminder: Reminder = " p1dt2h30m ".parse().unwrap();
        assert_eq!(reminder.days, Some(1));
        assert_eq!(reminder.hours, Some(2));
        assert_eq!(reminder.minutes, Some(30));
        assert_eq!(reminder.to_string(), "P1DT2H30M");
        assert_eq!(reminder.to_text(&UnitLabels::english()), "1 day 2 Hr 30 Min");
    }

    #[test]
    fn plural_units_in_both_locales() {
        let reminder: Reminder = "P2W3D".parse().unwrap();
        assert_eq!(reminder.to_text(&UnitLabels::english()), "2 weeks 3 days");
        assert_eq!(reminder.to_text(&UnitLabels::german()), "2 Wochen 3 Tage");
        let single: Reminder = "P1W".parse().unwrap();
        assert_eq!(single.to_text(&UnitLabels::german()), "1 Woche");
    }

    #[test]
    fn seconds_only_falls_back_to_iso() {
        let reminder: Reminder = "PT30S".parse().unwrap();
        assert_eq!(reminder.to_text(&UnitLabels::english()), "PT30S");
    }

    #[test]
    fn trigger_round_trip() {
        let reminder: Reminder = "PT1H".parse().unwrap();
        assert_eq!(reminder.trigger(), "-PT1H");
        assert_eq!(Reminder::from_trigger("-PT1H"), Some(reminder));
        assert_eq!(Reminder::from_trigger("PT1H"), None);
    }

    #[test]
    fn valarm_block_escapes_title() {
        let lines = Reminder::minutes(10).valarm_lines("Lunch, then coffee");
        assert_eq!(
            lines,
            vec![
                "BEGIN:VALARM",
                "ACTION:DISPLAY",
                "DESCRIPTION:Lunch\\, then coffee",
                "TRIGGER:-PT10M",
                "END:VALARM",
            ]
        );
    }

    #[test]
    fn parse_reminders_skips_blank_entries() {
        let reminders = parse_reminders(["PT15M", " ", "P1D"]).unwrap();
        assert_eq!(reminders.len(), 2);
        assert!(parse_reminders(["PT15M", "P1Y"]).is_err());
    }
}
