pub mod aging;
pub mod portfolio;
