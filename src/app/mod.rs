pub mod errors;
pub mod library;
pub mod task_runner;

pub use errors::AppError;
pub use library::{IndexOutcome, Library};
