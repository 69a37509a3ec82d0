mod check;
mod get;
mod migrate;

pub use check::execute_check;
pub use get::execute_get;
pub use migrate::execute_migrate;
