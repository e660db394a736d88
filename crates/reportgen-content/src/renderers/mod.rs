pub mod generative;
pub mod template;
