pub mod evaluator;
pub mod types;

pub use evaluator::{evaluate, signed_spread_bps};
pub use types::Verdict;
