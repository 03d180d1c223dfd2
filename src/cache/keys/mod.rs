/// 缓存键模块
/// 提供各种缓存键生成函数

// 商品缓存键模块
pub mod commodity_keys;

pub use commodity_keys::{commodity_list_key, commodity_prefix, commodity_rates_key};
