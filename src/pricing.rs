//! Cart and order arithmetic.
//!
//! All amounts are integer cents. Only selected lines contribute to totals.

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Tax rate in basis points (800 = 8%).
    pub tax_rate_bps: i64,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: i64,
    pub flat_shipping_fee: i64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate_bps: 800,
            free_shipping_threshold: 10_000,
            flat_shipping_fee: 1_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub unit_price: i64,
    pub quantity: i32,
    pub selected: bool,
}

impl LineAmount {
    pub fn line_total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CartTotals {
    pub item_count: i64,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping: i64,
    pub total: i64,
}

impl PricingPolicy {
    pub fn totals(&self, lines: &[LineAmount]) -> CartTotals {
        let (item_count, subtotal) = lines
            .iter()
            .filter(|line| line.selected)
            .fold((0_i64, 0_i64), |(count, sum), line| {
                (count + i64::from(line.quantity), sum + line.line_total())
            });
        self.quote(item_count, subtotal)
    }

    pub fn quote(&self, item_count: i64, subtotal: i64) -> CartTotals {
        let tax = self.tax_for(subtotal);
        let shipping = self.shipping_for(subtotal);
        CartTotals {
            item_count,
            subtotal,
            tax,
            shipping,
            total: subtotal + tax + shipping,
        }
    }

    /// Rounds half up to the nearest cent.
    pub fn tax_for(&self, subtotal: i64) -> i64 {
        (subtotal * self.tax_rate_bps + 5_000) / 10_000
    }

    pub fn shipping_for(&self, subtotal: i64) -> i64 {
        if subtotal <= 0 || subtotal >= self.free_shipping_threshold {
            0
        } else {
            self.flat_shipping_fee
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(unit_price: i64, quantity: i32, selected: bool) -> LineAmount {
        LineAmount {
            unit_price,
            quantity,
            selected,
        }
    }

    #[test]
    fn empty_cart_costs_nothing() {
        let totals = PricingPolicy::default().totals(&[]);
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.total, 0);
    }

    #[test]
    fn below_threshold_pays_flat_shipping() {
        let totals = PricingPolicy::default().totals(&[line(2_500, 2, true)]);
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.subtotal, 5_000);
        assert_eq!(totals.tax, 400);
        assert_eq!(totals.shipping, 1_000);
        assert_eq!(totals.total, 6_400);
    }

    #[test]
    fn threshold_is_inclusive() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.shipping_for(9_999), 1_000);
        assert_eq!(policy.shipping_for(10_000), 0);
    }

    #[test]
    fn unselected_lines_are_ignored() {
        let totals =
            PricingPolicy::default().totals(&[line(12_000, 1, true), line(500, 3, false)]);
        assert_eq!(totals.item_count, 1);
        assert_eq!(totals.subtotal, 12_000);
        assert_eq!(totals.shipping, 0);
    }

    #[test]
    fn tax_rounds_half_up() {
        let policy = PricingPolicy {
            tax_rate_bps: 850,
            ..PricingPolicy::default()
        };
        // 1_234 * 0.085 = 104.89
        assert_eq!(policy.tax_for(1_234), 105);
        // 100 * 0.085 = 8.5
        assert_eq!(policy.tax_for(100), 9);
    }
}
