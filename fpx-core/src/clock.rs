//! Date/time acquisition is explicitly out of core scope (spec.md §1); the
//! core only needs a value it can format for `__DATE__`/`__TIME__`/
//! `__TIMESTAMP__`. This trait is the narrow interface the driver injects a
//! real implementation through (see `fpx::clock::ChronoClock`).

/// A point in time broken into the fields the built-in macros format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRecord {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// 0 = Monday .. 6 = Sunday, used for the `ddd` pattern code.
    pub weekday: u32,
}

pub trait Clock {
    fn now(&self) -> DateRecord;
}

const MONTH_ABBR: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
const WEEKDAY_ABBR: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl DateRecord {
    /// Formats per the small set of pattern codes used by the built-in
    /// tokens: `MMM`, `dd`, `yyyy`, `HH`, `mm`, `ss`, `ddd`, `MM`.
    pub fn format(&self, pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len());
        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let rest: String = chars[i..].iter().collect();
            if rest.starts_with("yyyy") {
                out.push_str(&format!("{:04}", self.year));
                i += 4;
            } else if rest.starts_with("MMM") {
                out.push_str(MONTH_ABBR[(self.month.saturating_sub(1) as usize) % 12]);
                i += 3;
            } else if rest.starts_with("MM") {
                out.push_str(&format!("{:02}", self.month));
                i += 2;
            } else if rest.starts_with("ddd") {
                out.push_str(WEEKDAY_ABBR[(self.weekday as usize) % 7]);
                i += 3;
            } else if rest.starts_with("dd") {
                out.push_str(&format!("{:02}", self.day));
                i += 2;
            } else if rest.starts_with("HH") {
                out.push_str(&format!("{:02}", self.hour));
                i += 2;
            } else if rest.starts_with("mm") {
                out.push_str(&format!("{:02}", self.minute));
                i += 2;
            } else if rest.starts_with("ss") {
                out.push_str(&format!("{:02}", self.second));
                i += 2;
            } else {
                out.push(chars[i]);
                i += 1;
            }
        }
        out
    }
}

/// Fixed clock for tests and any caller that needs deterministic output.
pub struct FixedClock(pub DateRecord);

impl Clock for FixedClock {
    fn now(&self) -> DateRecord {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_date_pattern() {
        let d = DateRecord { year: 2026, month: 8, day: 1, hour: 9, minute: 5, second: 3, weekday: 5 };
        assert_eq!(d.format("MMM-dd-yyyy"), "Aug-01-2026");
        assert_eq!(d.format("HH:mm:ss"), "09:05:03");
        assert_eq!(d.format("ddd MM yyyy HH:mm:ss"), "Sat 08 2026 09:05:03");
    }
}
