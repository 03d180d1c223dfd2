use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 商品兑换率表
///
/// `rates[a][b]` 表示 1 单位 `a` 可换得的 `b` 的数量。
/// 表不保证对称，`rates[a][b]` 与 `1 / rates[b][a]` 可以不相等。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquivalencyTable {
    rates: HashMap<String, HashMap<String, f64>>,
}

impl EquivalencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个商品，没有任何兑换率也可以作为兑换的目标
    pub fn with_commodity(mut self, commodity: &str) -> Self {
        self.rates.entry(commodity.to_string()).or_default();
        self
    }

    /// 登记 `from -> to` 的兑换率，两个商品都会被加入表中
    pub fn with_rate(mut self, from: &str, to: &str, rate: f64) -> Self {
        self.rates.entry(to.to_string()).or_default();
        self.rates
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string(), rate);
        self
    }

    pub fn contains(&self, commodity: &str) -> bool {
        self.rates.contains_key(commodity)
    }

    /// 直接登记的兑换率，不做反向推导
    pub fn rate(&self, from: &str, to: &str) -> Option<f64> {
        self.rates.get(from)?.get(to).copied()
    }

    /// 某个商品登记的所有兑换率，按名称排序
    pub fn rates_from(&self, commodity: &str) -> Option<BTreeMap<&str, f64>> {
        self.rates.get(commodity).map(|targets| {
            targets
                .iter()
                .map(|(name, rate)| (name.as_str(), *rate))
                .collect()
        })
    }

    /// 所有商品名称，按名称排序
    pub fn commodities(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// 从 JSON 解析，并校验兑换率均为正数
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::RatesFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (from, targets) in &self.rates {
            for (to, rate) in targets {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(ConfigError::InvalidRate {
                        from: from.clone(),
                        to: to.clone(),
                        rate: *rate,
                    });
                }
            }
        }
        Ok(())
    }

    /// 平台内置的默认兑换率
    pub fn marketplace_defaults() -> Self {
        Self::new()
            .with_rate("Maize", "Beans", 0.6)
            .with_rate("Maize", "Rice", 0.5)
            .with_rate("Maize", "Wheat", 0.8)
            .with_rate("Maize", "Sorghum", 1.1)
            .with_rate("Maize", "Millet", 0.9)
            .with_rate("Maize", "Cassava", 2.5)
            .with_rate("Maize", "Potatoes", 2.0)
            .with_rate("Beans", "Rice", 0.8)
            .with_rate("Beans", "Wheat", 1.3)
            .with_rate("Rice", "Wheat", 1.6)
            .with_rate("Sorghum", "Millet", 0.85)
            .with_rate("Cassava", "Potatoes", 0.8)
    }
}
