use scraper::{ElementRef, Selector};

mod label;
mod menu;
mod nutrient;

pub use label::{parse_ingredients, LabelExtractor};
pub use menu::{clean_category_name, extract_metadata, MenuExtractor};
pub use nutrient::{normalize_nutrient_name, order_nutrients, parse_nutrient_text, CANONICAL_ORDER};

/// Parse a selector literal. Only called with constants from this module tree.
fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector literal must parse")
}

/// Element text with runs of whitespace (including non-breaking spaces)
/// collapsed to single spaces and the ends trimmed.
fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Total\u{a0}Fat \n 10g "), "Total Fat 10g");
        assert_eq!(collapse_whitespace("\u{a0}"), "");
    }
}
