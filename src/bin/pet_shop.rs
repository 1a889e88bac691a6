//! Pet shop demo: loads the "Pets" tab, makes sure Fluffy and Buddy are
//! listed, celebrates Buddy's birthday and saves.

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use sheet_orm::impl_record;
use sheet_orm::MemoryStore;
use sheet_orm::SheetConfig;
use sheet_orm::SheetsStore;
use sheet_orm::StaticToken;
use sheet_orm::Table;
use sheet_orm::TabularStore;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default, PartialEq)]
struct Pet {
    name: String,
    species: String,
    age: i32,
    price: f64,
    color: String,
}

impl_record!(Pet, primary_key = name, {
    name => "Name",
    species => "Species",
    age => "Age",
    price => "Price",
    color => "Color",
});

#[derive(Parser, Debug)]
#[command(name = "pet_shop")]
#[command(about = "Keeps a pet list in a spreadsheet tab", long_about = None)]
struct Args {
    /// TOML file with the spreadsheet settings.
    #[arg(long, default_value = "sheet_orm.toml")]
    config: PathBuf,
    /// Run against an in-process sheet instead of the Sheets API.
    #[arg(long, default_value_t = false)]
    memory: bool,
}

/// Files that hold OAuth client secrets and must stay out of source control.
const SECRET_FILES: [&str; 2] = ["credentials.json", "token.json"];

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pet_shop=info,sheet_orm=info,warn")),
        )
        .init();
    let args = Args::parse();

    for file in SECRET_FILES {
        if Path::new(file).exists() {
            warn!("'{}' holds sensitive data: add it to .gitignore and never commit it", file);
        }
    }

    if args.memory {
        let config = SheetConfig {
            sheet_name: "Pets".to_owned(),
            ..SheetConfig::default()
        };
        let store = MemoryStore::new().with_sheet(&config.sheet_name, Vec::new()).await;
        return run(Table::from_config(store, &config)?).await;
    }

    let mut config = if args.config.exists() {
        SheetConfig::from_file(&args.config)?
    } else {
        info!("No config file at '{}', using defaults", args.config.display());
        SheetConfig::default()
    };
    config.apply_env_overrides()?;
    let credentials = StaticToken::from_config(&config).context("Set SHEET_ORM_ACCESS_TOKEN to an OAuth access token")?;
    let store = SheetsStore::new(&config, Arc::new(credentials))?;
    run(Table::from_config(store, &config)?).await
}

async fn run<S: TabularStore>(mut pets: Table<Pet, S>) -> Result<()> {
    let report = pets.load().await?;
    for error in &report.errors {
        warn!("{}", error);
    }

    if !pets.iter().any(|pet| pet.name == "Fluffy") {
        pets.add(Pet {
            name: "Fluffy".to_owned(),
            species: "Cat".to_owned(),
            age: 3,
            price: 100.0,
            color: "White".to_owned(),
        })?;
    }
    if !pets.iter().any(|pet| pet.name == "Buddy") {
        pets.add(Pet {
            name: "Buddy".to_owned(),
            species: "Dog".to_owned(),
            age: 1,
            price: 300.0,
            color: "Brown".to_owned(),
        })?;
    }
    if let Some(buddy) = pets.get_mut("Buddy") {
        buddy.age += 1;
    }

    let saved = pets.save().await?;
    info!("Saved {} pets to '{}'", saved, pets.sheet());

    println!("------------------------------------------------");
    println!("Name\tSpecies\tAge\tPrice\tColor");
    println!("------------------------------------------------");
    for pet in &pets {
        println!("{}\t{}\t{}\t{}\t{}", pet.name, pet.species, pet.age, pet.price, pet.color);
    }
    println!("------------------------------------------------");
    Ok(())
}
