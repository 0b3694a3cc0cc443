pub mod logger;
pub mod reporter;
