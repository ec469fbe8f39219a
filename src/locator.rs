//! Listing page addresses for the dining hall.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::config::ScraperConfig;
use crate::error::MenuError;

const LISTING_PAGE: &str = "longmenucopy.aspx";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meal {
    Breakfast,
    Lunch,
    Dinner,
}

impl Meal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Meal::Breakfast => "Breakfast",
            Meal::Lunch => "Lunch",
            Meal::Dinner => "Dinner",
        }
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Meal {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(Meal::Breakfast),
            "lunch" => Ok(Meal::Lunch),
            "dinner" => Ok(Meal::Dinner),
            _ => Err(MenuError::UnknownMeal(s.to_string())),
        }
    }
}

/// Listing locator for `date` and `meal` on the default origin.
pub fn menu_url(date: NaiveDate, meal: Meal) -> String {
    listing_url(&ScraperConfig::default().base_url, date, meal)
}

/// Listing locator relative to `base_url`.
///
/// The query is emitted pre-encoded in the form the site itself links to;
/// month and day are not zero-padded.
pub fn listing_url(base_url: &str, date: NaiveDate, meal: Meal) -> String {
    format!(
        "{}/{LISTING_PAGE}?sName=HARVARD+UNIVERSITY+DINING+SERVICES\
         &locationNum=30\
         &locationName=Dining+Hall\
         &naFlag=1\
         &WeeksMenus=This+Week%27s+Menus\
         &dtdate={}%2f{}%2f{}\
         &mealName={}+Menu",
        base_url.trim_end_matches('/'),
        date.month(),
        date.day(),
        date.year(),
        meal
    )
}
