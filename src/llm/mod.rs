pub mod anthropic;
pub mod openai;
pub mod prompts;
pub mod provider;

pub use anthropic::*;
pub use openai::*;
pub use prompts::*;
pub use provider::*;
