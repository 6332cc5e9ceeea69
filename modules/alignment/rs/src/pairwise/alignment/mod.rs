pub use alignment::Alignment;
pub use op::Op;
pub use step::Step;

mod alignment;
mod op;
mod step;
