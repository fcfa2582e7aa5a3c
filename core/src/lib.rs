pub mod discovery;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod session;
pub mod supervisor;
pub mod system;
