pub mod identify;
pub mod prepare;
pub mod states;
