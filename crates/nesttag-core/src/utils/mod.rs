/// Utility modules
pub mod csv;
pub mod logging;
pub mod s3_url;
pub mod sanitization;
pub mod validation;

pub use logging::*;
pub use sanitization::*;
pub use validation::*;
