pub mod learner;
pub mod sync;
pub mod trainer;
