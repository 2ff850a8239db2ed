pub mod date_input;
pub mod item_grid;
pub mod popup;
