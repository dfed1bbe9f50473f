pub mod document;
pub mod interview;
pub mod rating;
pub mod user;
