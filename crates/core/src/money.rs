use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

pub const DEFAULT_BAR_NIGHT_COST: Decimal = Decimal::from_parts(1200, 0, 0, false, 0);

const CURRENCY_SYMBOL: &str = "£";

/// Renders amounts as pounds alongside how many bar nights they would pay for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoneyFormatter {
    bar_night_cost: Decimal,
}

impl Default for MoneyFormatter {
    fn default() -> Self {
        Self { bar_night_cost: DEFAULT_BAR_NIGHT_COST }
    }
}

impl MoneyFormatter {
    pub fn new(bar_night_cost: Decimal) -> Self {
        Self { bar_night_cost }
    }

    pub fn bar_night_cost(&self) -> Decimal {
        self.bar_night_cost
    }

    pub fn format(&self, amount: Decimal) -> String {
        let nights = self.bar_nights(amount);
        let label = if nights == 1 { "bar night" } else { "bar nights" };
        format!("{} ({nights} {label})", format_currency(amount))
    }

    /// Whole bar nights covered by `amount`, truncating both operands first.
    /// Counts beyond `u64::MAX` saturate.
    pub fn bar_nights(&self, amount: Decimal) -> u64 {
        let whole = amount.trunc();
        let cost = self.bar_night_cost.trunc();
        if whole <= Decimal::ZERO || cost <= Decimal::ZERO {
            return 0;
        }
        whole
            .checked_div(cost)
            .map_or(u64::MAX, |nights| nights.trunc().to_u64().unwrap_or(u64::MAX))
    }
}

pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{CURRENCY_SYMBOL}{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{format_currency, MoneyFormatter};

    #[test]
    fn two_full_units_are_plural() {
        let formatted = MoneyFormatter::default().format(Decimal::new(2400, 0));
        assert_eq!(formatted, "£2,400.00 (2 bar nights)");
    }

    #[test]
    fn exactly_one_unit_is_singular() {
        let formatted = MoneyFormatter::default().format(Decimal::new(1200, 0));
        assert!(formatted.contains("1 bar night)"), "got {formatted}");
    }

    #[test]
    fn zero_is_plural() {
        let formatted = MoneyFormatter::default().format(Decimal::ZERO);
        assert_eq!(formatted, "£0.00 (0 bar nights)");
    }

    #[test]
    fn partial_units_truncate() {
        let formatter = MoneyFormatter::default();
        assert_eq!(formatter.bar_nights(Decimal::new(239_999, 2)), 1);
        assert_eq!(formatter.bar_nights(Decimal::new(119_999, 2)), 0);
    }

    #[test]
    fn custom_cost_is_respected() {
        let formatter = MoneyFormatter::new(Decimal::new(100, 0));
        assert_eq!(formatter.format(Decimal::new(350, 0)), "£350.00 (3 bar nights)");
    }

    #[test]
    fn negative_amounts_count_no_bar_nights() {
        let formatted = MoneyFormatter::default().format(Decimal::new(-5000, 0));
        assert_eq!(formatted, "-£5,000.00 (0 bar nights)");
    }

    #[test]
    fn amounts_beyond_machine_integers_still_count() {
        let formatter = MoneyFormatter::default();
        let huge = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        assert_eq!(
            formatter.format(huge),
            "£100,000,000,000,000,000,000.00 (83333333333333333 bar nights)"
        );

        let cheap = MoneyFormatter::new(Decimal::ONE);
        assert_eq!(cheap.bar_nights(Decimal::MAX), u64::MAX);
    }

    #[test]
    fn currency_groups_thousands_and_rounds_to_pennies() {
        assert_eq!(format_currency(Decimal::new(123_456_789, 2)), "£1,234,567.89");
        assert_eq!(format_currency(Decimal::new(999, 0)), "£999.00");
        assert_eq!(format_currency(Decimal::new(1005, 3)), "£1.00");
        assert_eq!(format_currency(Decimal::new(1015, 3)), "£1.02");
    }
}
