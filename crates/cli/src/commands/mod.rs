//! Command implementations.

mod info;
mod record;
mod validate;

pub use info::run_info;
pub use record::run_record;
pub use validate::run_validate;
