pub mod combine;
pub mod completions;
pub mod evaluate;
