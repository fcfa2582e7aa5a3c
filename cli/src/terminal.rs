pub mod colors;
pub mod format;
pub mod logging;
pub mod print;
pub mod prompt;
pub mod spinner;
pub mod viewer;
