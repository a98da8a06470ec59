mod types;

pub use types::HookscanError;
