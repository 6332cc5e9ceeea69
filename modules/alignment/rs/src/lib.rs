pub use alignfarm_core_rs::num::Score;

pub mod pairwise;
