pub mod lookup;
pub mod token;
