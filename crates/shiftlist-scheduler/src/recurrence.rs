//! Recurrence evaluation against a resolved date.

use shiftlist_core::recurrence::RecurrenceRule;
use shiftlist_core::types::{Shift, TaskTemplate};

use crate::calendar::ResolvedDate;

/// Whether `rule` is due on `date`.
///
/// A plain weekly rule and a rotation-bound weekly rule on the same weekday are
/// independent: both fire when the rotation week matches.
pub fn is_due(rule: &RecurrenceRule, date: &ResolvedDate) -> bool {
    match rule {
        RecurrenceRule::Daily => true,
        RecurrenceRule::Weekly { weekday, cycle } => {
            date.weekday == *weekday && cycle.is_none_or(|c| c == date.cycle_position)
        }
        RecurrenceRule::Monthly { day_of_month } => date.day_of_month == *day_of_month,
        RecurrenceRule::Once => false,
    }
}

/// Shifts the template needs an instance for on `date`; empty when not due.
pub fn due_shifts(template: &TaskTemplate, date: &ResolvedDate) -> &'static [Shift] {
    if template.active && is_due(&template.recurrence, date) {
        template.shift_scope.shifts()
    } else {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::resolve;
    use chrono::{NaiveDate, Weekday};
    use shiftlist_core::types::ShiftScope;

    fn on(y: i32, m: u32, d: u32) -> ResolvedDate {
        resolve(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn template(scope: ShiftScope, rule: RecurrenceRule) -> TaskTemplate {
        TaskTemplate {
            id: 1,
            title: "t".into(),
            description: None,
            category: None,
            shift_scope: scope,
            recurrence: rule,
            store_id: None,
            requires_evidence: false,
            active: true,
        }
    }

    #[test]
    fn test_daily_always_due() {
        assert!(is_due(&RecurrenceRule::Daily, &on(2026, 7, 4)));
        assert!(!is_due(&RecurrenceRule::Once, &on(2026, 7, 4)));
    }

    #[test]
    fn test_plain_weekly_ignores_rotation() {
        let monday = RecurrenceRule::Weekly {
            weekday: Weekday::Mon,
            cycle: None,
        };
        // Mondays in rotation weeks 2, 3 and 2.
        assert!(is_due(&monday, &on(2026, 1, 5)));
        assert!(is_due(&monday, &on(2026, 6, 1)));
        assert!(is_due(&monday, &on(2026, 2, 2)));
        assert!(!is_due(&monday, &on(2026, 1, 6)));
    }

    #[test]
    fn test_rotation_weekly_and_plain_both_fire() {
        let plain = RecurrenceRule::Weekly {
            weekday: Weekday::Mon,
            cycle: None,
        };
        let week2 = RecurrenceRule::Weekly {
            weekday: Weekday::Mon,
            cycle: Some(2),
        };
        let monday_w2 = on(2026, 1, 5);
        let monday_w3 = on(2026, 6, 1);
        assert_eq!(monday_w2.cycle_position, 2);
        assert_eq!(monday_w3.cycle_position, 3);

        assert!(is_due(&plain, &monday_w2) && is_due(&week2, &monday_w2));
        assert!(is_due(&plain, &monday_w3));
        assert!(!is_due(&week2, &monday_w3));
    }

    #[test]
    fn test_monthly_independent_of_weekday() {
        let fifteenth = RecurrenceRule::Monthly { day_of_month: 15 };
        assert!(is_due(&fifteenth, &on(2026, 3, 15))); // Sunday
        assert!(is_due(&fifteenth, &on(2026, 4, 15))); // Wednesday
        assert!(!is_due(&fifteenth, &on(2026, 4, 16)));
    }

    #[test]
    fn test_due_shifts_expansion() {
        let both = template(ShiftScope::Both, RecurrenceRule::Daily);
        assert_eq!(due_shifts(&both, &on(2026, 1, 1)), &[Shift::Early, Shift::Late]);
        let early = template(ShiftScope::Early, RecurrenceRule::Daily);
        assert_eq!(due_shifts(&early, &on(2026, 1, 1)), &[Shift::Early]);

        let sunday_only = template(
            ShiftScope::Early,
            RecurrenceRule::Weekly {
                weekday: Weekday::Sun,
                cycle: None,
            },
        );
        // 2026-03-04 is a Wednesday.
        assert!(due_shifts(&sunday_only, &on(2026, 3, 4)).is_empty());

        let mut inactive = both.clone();
        inactive.active = false;
        assert!(due_shifts(&inactive, &on(2026, 1, 1)).is_empty());
    }
}
