pub mod catalog;
pub mod line_item;
