// 以物易物模块
// 商品兑换率表与兑换计算

mod calculator;
mod rates;

pub use calculator::{BarterCalculator, FAIRNESS_TOLERANCE};
pub use rates::EquivalencyTable;
