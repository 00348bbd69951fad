pub mod dates;
pub mod money;
