use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use foodpro_nutrition::{
    aggregate, load_config, save_json, DetailedMenu, Meal, MenuError, MenuScraper, Selections,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Dining hall menu and nutrition scraper")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the menu structure of a listing page
    Menu {
        url: String,
    },
    /// Print one item's nutrition label
    Label {
        url: String,
    },
    /// Fetch a listing page and every item's nutrition label
    Detailed {
        url: String,
        #[command(flatten)]
        detail: DetailArgs,
    },
    /// Print the listing locator for a date and meal
    Url(MealArgs),
    /// Build the listing locator and fetch the detailed menu in one step
    Fetch {
        #[command(flatten)]
        meal: MealArgs,
        #[command(flatten)]
        detail: DetailArgs,
    },
    /// Total nutrition for selected items of a saved detailed menu
    Aggregate(AggregateArgs),
}

#[derive(Debug, Args)]
struct MealArgs {
    /// Menu date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,

    /// breakfast, lunch or dinner
    #[arg(long)]
    meal: Meal,
}

#[derive(Debug, Args)]
struct DetailArgs {
    /// Only fetch nutrition for the first N items of each category
    #[arg(long)]
    limit: Option<usize>,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct AggregateArgs {
    /// Detailed menu JSON produced by `detailed` or `fetch`
    #[arg(long)]
    menu: PathBuf,

    /// Item and quantity, e.g. --select "Scrambled Eggs=2"
    #[arg(long = "select", value_parser = parse_selection)]
    selections: Vec<(String, Value)>,

    /// JSON object of item name to quantity, merged before --select
    #[arg(long)]
    selections_file: Option<PathBuf>,

    /// Write JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

/// `Name=Qty`, split at the last `=` so names may contain one. Quantities
/// that are not numbers are passed through and dropped during aggregation.
fn parse_selection(arg: &str) -> Result<(String, Value), MenuError> {
    let (name, quantity) = arg
        .rsplit_once('=')
        .ok_or_else(|| MenuError::Parse(format!("expected NAME=QTY, got '{arg}'")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(MenuError::Parse(format!("missing item name in '{arg}'")));
    }
    let quantity = quantity.trim();
    let value = quantity
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(quantity.to_string()));
    Ok((name.to_string(), value))
}

fn emit<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<(), MenuError> {
    match output {
        Some(path) => save_json(path, value),
        None => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
    }
}

fn scraper(detail: &DetailArgs) -> Result<MenuScraper, MenuError> {
    let mut builder = MenuScraper::builder().config(load_config()?);
    if let Some(limit) = detail.limit {
        builder = builder.max_items_per_category(limit);
    }
    builder.build()
}

fn run_aggregate(args: &AggregateArgs) -> Result<(), MenuError> {
    let menu: DetailedMenu = serde_json::from_str(&fs::read_to_string(&args.menu)?)?;

    let mut selections = match &args.selections_file {
        Some(path) => serde_json::from_str::<Selections>(&fs::read_to_string(path)?)?,
        None => Selections::new(),
    };
    for (name, quantity) in &args.selections {
        selections.insert(name.as_str(), quantity.clone());
    }

    let report = aggregate(&menu, &selections);
    info!(
        "Aggregated {} items, {} missing",
        report.items_aggregated,
        report.missing_items.len()
    );
    emit(&report, args.output.as_ref())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let cli = Cli::parse();
    debug!("{:?}", cli);

    match &cli.command {
        Command::Menu { url } => {
            let scraper = MenuScraper::from_config(load_config()?)?;
            emit(&scraper.menu(url)?, None)?;
        }
        Command::Label { url } => {
            let scraper = MenuScraper::from_config(load_config()?)?;
            emit(&scraper.label(url)?, None)?;
        }
        Command::Detailed { url, detail } => {
            let menu = scraper(detail)?.detailed_menu(url)?;
            emit(&menu, detail.output.as_ref())?;
        }
        Command::Url(args) => {
            let scraper = MenuScraper::from_config(load_config()?)?;
            println!("{}", scraper.menu_url(args.date, args.meal));
        }
        Command::Fetch { meal, detail } => {
            let scraper = scraper(detail)?;
            let url = scraper.menu_url(meal.date, meal.meal);
            info!("Fetching {} for {}: {}", meal.meal, meal.date, url);
            emit(&scraper.detailed_menu(&url)?, detail.output.as_ref())?;
        }
        Command::Aggregate(args) => run_aggregate(args)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("Scrambled Eggs=2").unwrap(),
            ("Scrambled Eggs".to_string(), json!(2.0))
        );
        assert_eq!(
            parse_selection("a=b = 1.5").unwrap(),
            ("a=b".to_string(), json!(1.5))
        );
        assert_eq!(
            parse_selection("Toast=lots").unwrap(),
            ("Toast".to_string(), json!("lots"))
        );
        assert!(matches!(
            parse_selection("Toast"),
            Err(MenuError::Parse(msg)) if msg == "expected NAME=QTY, got 'Toast'"
        ));
        assert!(matches!(parse_selection("=2"), Err(MenuError::Parse(_))));
    }

    #[test]
    fn test_parse_fetch_args() {
        let cli = Cli::try_parse_from([
            "foodpro-nutrition",
            "fetch",
            "--date",
            "2025-09-29",
            "--meal",
            "Lunch",
            "--limit",
            "3",
        ])
        .unwrap();

        match cli.command {
            Command::Fetch { meal, detail } => {
                assert_eq!(meal.date, NaiveDate::from_ymd_opt(2025, 9, 29).unwrap());
                assert_eq!(meal.meal, Meal::Lunch);
                assert_eq!(detail.limit, Some(3));
                assert!(detail.output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_malformed_selection_rejected() {
        let result = Cli::try_parse_from([
            "foodpro-nutrition",
            "aggregate",
            "--menu",
            "lunch.json",
            "--select",
            "Toast",
        ]);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Failed to parse input: expected NAME=QTY"));
    }

    #[test]
    fn test_unknown_meal_rejected() {
        let result = Cli::try_parse_from([
            "foodpro-nutrition",
            "url",
            "--date",
            "2025-09-29",
            "--meal",
            "brunch",
        ]);
        assert!(result.is_err());
    }
}
