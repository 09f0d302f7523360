use crate::date::DayKey;

pub const PROMPTS: [&str; 5] = [
    "One thing that went well…",
    "Today felt like…",
    "A small win was…",
    "Something I’m proud of…",
    "One gentle goal for tomorrow…",
];

/// Writing prompt for a day, rotating with the day of the month.
pub fn prompt_for(day: DayKey) -> &'static str {
    PROMPTS[day.day_of_month() as usize % PROMPTS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_rotates_by_day_of_month() {
        let first: DayKey = "2025-10-01".parse().unwrap();
        let fifth: DayKey = "2025-10-05".parse().unwrap();
        let sixth: DayKey = "2025-11-06".parse().unwrap();
        assert_eq!(prompt_for(first), "Today felt like…");
        assert_eq!(prompt_for(fifth), "One thing that went well…");
        assert_eq!(prompt_for(sixth), prompt_for(first));
    }
}
