pub mod phase;
pub mod privilege;
