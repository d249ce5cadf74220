pub mod instance;
pub mod series;
