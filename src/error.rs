pub mod edf_error;

pub use edf_error::EdfError;

pub type Result<T> = std::result::Result<T, EdfError>;
