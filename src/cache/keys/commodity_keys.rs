/// 商品列表缓存键
const COMMODITY_LIST_KEY: &str = "commodity:list";

/// 单个商品兑换率缓存键前缀
const COMMODITY_RATES_PREFIX: &str = "commodity:rates:";

/// 生成商品列表缓存键
pub fn commodity_list_key() -> String {
    COMMODITY_LIST_KEY.to_string()
}

/// 生成商品兑换率缓存键
pub fn commodity_rates_key(commodity: &str) -> String {
    format!("{}{}", COMMODITY_RATES_PREFIX, commodity)
}

/// 所有商品相关缓存键的前缀，兑换表更新时按前缀失效
pub fn commodity_prefix() -> &'static str {
    "commodity:"
}
