pub mod items;
pub mod upload;
