pub use fault::{Fault, Status};
pub use mode::Mode;
pub use parallelism::Parallelism;

mod fault;
mod mode;
pub mod num;
pub mod parallelism;
