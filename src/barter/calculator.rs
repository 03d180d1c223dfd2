use super::rates::EquivalencyTable;

/// 公平交换允许的偏差，±5%
pub const FAIRNESS_TOLERANCE: f64 = 0.05;

/// 以物易物兑换计算
#[derive(Debug, Clone)]
pub struct BarterCalculator {
    table: EquivalencyTable,
}

impl Default for BarterCalculator {
    fn default() -> Self {
        Self::new(EquivalencyTable::marketplace_defaults())
    }
}

impl BarterCalculator {
    pub fn new(table: EquivalencyTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EquivalencyTable {
        &self.table
    }

    pub fn commodities(&self) -> Vec<&str> {
        self.table.commodities()
    }

    /// `quantity` 单位的 `from` 可换得多少 `to`
    ///
    /// 优先使用直接兑换率，没有时用反向兑换率的倒数。
    /// 任一商品不在表中，或两者之间没有兑换率时返回 `None`。
    pub fn calculate_exchange(&self, from: &str, quantity: f64, to: &str) -> Option<f64> {
        if !self.table.contains(from) || !self.table.contains(to) {
            return None;
        }
        if from == to {
            return Some(quantity);
        }

        if let Some(rate) = self.table.rate(from, to) {
            return Some(quantity * rate);
        }
        self.table.rate(to, from).map(|rate| quantity / rate)
    }

    /// 可被视为公平的 `to` 数量区间，闭区间
    pub fn fair_range(&self, from: &str, quantity: f64, to: &str) -> Option<(f64, f64)> {
        let expected = self.calculate_exchange(from, quantity, to)?;
        Some((
            expected * (1.0 - FAIRNESS_TOLERANCE),
            expected * (1.0 + FAIRNESS_TOLERANCE),
        ))
    }

    /// 提议的交换是否在期望数量的 ±5% 以内；无法计算时视为不公平
    pub fn is_fair(&self, from: &str, quantity_from: f64, to: &str, quantity_to: f64) -> bool {
        match self.fair_range(from, quantity_from, to) {
            Some((low, high)) => quantity_to >= low && quantity_to <= high,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn calculator() -> BarterCalculator {
        BarterCalculator::new(
            EquivalencyTable::new()
                .with_rate("Maize", "Beans", 0.6)
                .with_rate("Rice", "Maize", 2.0)
                .with_rate("Maize", "Rice", 0.45)
                .with_commodity("Wheat"),
        )
    }

    #[test]
    fn identity_trade_returns_same_quantity() {
        assert_eq!(calculator().calculate_exchange("Maize", 10.0, "Maize"), Some(10.0));
    }

    #[test]
    fn direct_rate_is_used() {
        let result = calculator().calculate_exchange("Maize", 10.0, "Beans").unwrap();
        assert!(approx_eq(result, 6.0));
    }

    #[test]
    fn reverse_rate_falls_back_to_reciprocal() {
        let result = calculator().calculate_exchange("Beans", 10.0, "Maize").unwrap();
        assert!(approx_eq(result, 10.0 / 0.6));
    }

    #[test]
    fn direct_rate_wins_over_asymmetric_reverse() {
        let calc = calculator();

        let result = calc.calculate_exchange("Maize", 10.0, "Rice").unwrap();
        assert!(approx_eq(result, 4.5));
        let result = calc.calculate_exchange("Rice", 10.0, "Maize").unwrap();
        assert!(approx_eq(result, 20.0));
    }

    #[test]
    fn unknown_commodity_is_not_representable() {
        let calc = calculator();

        assert_eq!(calc.calculate_exchange("Unknown", 5.0, "Maize"), None);
        assert_eq!(calc.calculate_exchange("Maize", 5.0, "Unknown"), None);
        assert_eq!(calc.calculate_exchange("Unknown", 5.0, "Unknown"), None);
    }

    #[test]
    fn commodities_without_a_path_are_not_representable() {
        assert_eq!(calculator().calculate_exchange("Wheat", 5.0, "Beans"), None);
    }

    #[test]
    fn fairness_accepts_within_five_percent() {
        let calc = BarterCalculator::default();

        assert!(calc.is_fair("Maize", 100.0, "Beans", 61.0));
        assert!(calc.is_fair("Maize", 100.0, "Beans", 60.0));
        assert!(calc.is_fair("Maize", 100.0, "Beans", 57.5));
        assert!(!calc.is_fair("Maize", 100.0, "Beans", 70.0));
        assert!(!calc.is_fair("Maize", 100.0, "Beans", 56.0));
    }

    #[test]
    fn fairness_bounds_are_inclusive() {
        let calc = BarterCalculator::new(EquivalencyTable::new().with_rate("A", "B", 1.0));
        let (low, high) = calc.fair_range("A", 100.0, "B").unwrap();

        assert!(calc.is_fair("A", 100.0, "B", low));
        assert!(calc.is_fair("A", 100.0, "B", high));
    }

    #[test]
    fn unverifiable_trade_is_unfair() {
        let calc = calculator();

        assert!(!calc.is_fair("Unknown", 5.0, "Maize", 5.0));
        assert!(!calc.is_fair("Wheat", 5.0, "Beans", 0.0));
    }

    #[test]
    fn round_trip_is_fair_within_tolerance() {
        let calc = BarterCalculator::default();

        let beans = calc.calculate_exchange("Maize", 100.0, "Beans").unwrap();
        let maize = calc.calculate_exchange("Beans", beans, "Maize").unwrap();
        assert!(calc.is_fair("Beans", beans, "Maize", maize));
        assert!(calc.is_fair("Maize", 100.0, "Beans", beans));
    }
}
