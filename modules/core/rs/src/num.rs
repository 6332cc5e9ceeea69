use std::fmt::Debug;

/// T values are signed primitive integers, suitable to accumulate alignment scores
pub trait Score: ::num::PrimInt + ::num::Signed + Debug + Default + Send + Sync + 'static {}

impl<T: ::num::PrimInt + ::num::Signed + Debug + Default + Send + Sync + 'static> Score for T {}
