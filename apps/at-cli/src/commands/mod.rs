pub mod state;
pub mod validate;
