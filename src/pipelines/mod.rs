pub mod detailed;
pub mod retrieve;

pub use detailed::{build_detailed_menu, retrieve_detailed_menu};
pub use retrieve::{parse_label_page, parse_menu_page, retrieve_label, retrieve_menu};
