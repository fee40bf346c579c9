pub mod error;
pub mod imaging;
pub mod logger;
pub mod validation;
