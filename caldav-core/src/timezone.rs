//! VTIMEZONE definitions for zoned events.

use indoc::indoc;

/// Supplies VTIMEZONE blocks for TZIDs written into new events.
pub trait TimezoneProvider {
    /// Logical lines from `BEGIN:VTIMEZONE` to `END:VTIMEZONE`, or `None`
    /// when the zone is unknown (or needs no definition, like UTC).
    fn vtimezone(&self, tzid: &str) -> Option<Vec<String>>;
}

/// Simplified rules for a handful of common zones.
///
/// Each zone has a single current DAYLIGHT/STANDARD pair; historical rule
/// changes are not represented.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTimezones;

impl BuiltinTimezones {
    fn definition(tzid: &str) -> Option<&'static str> {
        let text = match tzid {
            "Europe/Berlin" => indoc! {"
                BEGIN:VTIMEZONE
                TZID:Europe/Berlin
                BEGIN:DAYLIGHT
                TZOFFSETFROM:+0100
                TZOFFSETTO:+0200
                TZNAME:CEST
                DTSTART:19700329T020000
                RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU
                END:DAYLIGHT
                BEGIN:STANDARD
                TZOFFSETFROM:+0200
                TZOFFSETTO:+0100
                TZNAME:CET
                DTSTART:19701025T030000
                RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU
                END:STANDARD
                END:VTIMEZONE
            "},
            "Europe/London" => indoc! {"
                BEGIN:VTIMEZONE
                TZID:Europe/London
                BEGIN:DAYLIGHT
                TZOFFSETFROM:+0000
                TZOFFSETTO:+0100
                TZNAME:BST
                DTSTART:19700329T010000
                RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=-1SU
                END:DAYLIGHT
                BEGIN:STANDARD
                TZOFFSETFROM:+0100
                TZOFFSETTO:+0000
                TZNAME:GMT
                DTSTART:19701025T020000
                RRULE:FREQ=YEARLY;BYMONTH=10;BYDAY=-1SU
                END:STANDARD
                END:VTIMEZONE
            "},
            "America/New_York" => indoc! {"
                BEGIN:VTIMEZONE
                TZID:America/New_York
                BEGIN:DAYLIGHT
                TZOFFSETFROM:-0500
                TZOFFSETTO:-0400
                TZNAME:EDT
                DTSTART:19700308T020000
                RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=2SU
                END:DAYLIGHT
                BEGIN:STANDARD
                TZOFFSETFROM:-0400
                TZOFFSETTO:-0500
                TZNAME:EST
                DTSTART:19701101T020000
                RRULE:FREQ=YEARLY;BYMONTH=11;BYDAY=1SU
                END:STANDARD
                END:VTIMEZONE
            "},
            "America/Los_Angeles" => indoc! {"
                BEGIN:VTIMEZONE
                TZID:America/Los_Angeles
                BEGIN:DAYLIGHT
                TZOFFSETFROM:-0800
                TZOFFSETTO:-0700
                TZNAME:PDT
                DTSTART:19700308T020000
                RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=2SU
                END:DAYLIGHT
                BEGIN:STANDARD
                TZOFFSETFROM:-0700
                TZOFFSETTO:-0800
                TZNAME:PST
                DTSTART:19701101T020000
                RRULE:FREQ=YEARLY;BYMONTH=11;BYDAY=1SU
                END:STANDARD
                END:VTIMEZONE
            "},
            "Asia/Tokyo" => indoc! {"
                BEGIN:VTIMEZONE
                TZID:Asia/Tokyo
                BEGIN:STANDARD
                TZOFFSETFROM:+0900
                TZOFFSETTO:+0900
                TZNAME:JST
                DTSTART:19700101T000000
                END:STANDARD
                END:VTIMEZONE
            "},
            "Asia/Shanghai" => indoc! {"
                BEGIN:VTIMEZONE
                TZID:Asia/Shanghai
                BEGIN:STANDARD
                TZOFFSETFROM:+0800
                TZOFFSETTO:+0800
                TZNAME:CST
                DTSTART:19700101T000000
                END:STANDARD
                END:VTIMEZONE
            "},
            _ => return None,
        };
        Some(text)
    }
}

impl TimezoneProvider for BuiltinTimezones {
    fn vtimezone(&self, tzid: &str) -> Option<Vec<String>> {
        BuiltinTimezones::definition(tzid)
            .map(|text| text.lines().map(str::to_string).collect())
    }
}
