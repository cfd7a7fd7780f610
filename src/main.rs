//! Wanderlens command line entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use wanderlens::cli::{Cli, Command};
use wanderlens::dispatcher::{ImageUpload, Query};
use wanderlens::models::{CoordinateKey, Itinerary, Place};
use wanderlens::{Session, WanderlensConfig, WanderlensError, telemetry, web};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        match e.downcast_ref::<WanderlensError>() {
            Some(err) => eprintln!("{}", err.user_message()),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config =
        WanderlensConfig::load_from_path(cli.config).context("Failed to load configuration")?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    telemetry::init(&config.logging).context("Failed to setup logging")?;
    info!("Wanderlens {} starting", wanderlens::VERSION);

    let session = Session::open(&config)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            web::run(Arc::new(session), &config.server).await?;
        }
        Command::Ideas { prompt, image } => {
            let image = match image {
                Some(path) => Some(ImageUpload::from_path(&path).await?),
                None => None,
            };
            let query = Query::new(prompt, image)?;
            let places = session.recommend(query).await?;
            if places.is_empty() {
                println!("No places found");
            }
            for place in &places {
                print_place(place);
            }
        }
        Command::Places => match session.places().read().await {
            Some(places) if !places.is_empty() => places.iter().for_each(print_place),
            Some(_) => println!("The last query found no places"),
            None => println!("No active places, run `wanderlens ideas` first"),
        },
        Command::Place { coordinates } => {
            let key: CoordinateKey = coordinates.parse()?;
            match session.places().find_by_coordinates(&key).await {
                Some(place) => print_place_details(&place),
                None => anyhow::bail!("No active place at {key}"),
            }
        }
        Command::Accessibility { name } => {
            let info = session.pipeline().classifier().classify(&name).await;
            let supported = info.supported();
            if supported.is_empty() {
                println!("{name}: no accessibility features reported");
            } else {
                println!("{name}: {}", supported.join(", "));
            }
        }
        Command::Save { coordinates } => {
            let key: CoordinateKey = coordinates.parse()?;
            match session.save_from_active(&key).await? {
                Some((place, true)) => println!("Saved {}", place.name),
                Some((place, false)) => println!("{} is already saved", place.name),
                None => anyhow::bail!("No active place at {key}"),
            }
        }
        Command::Unsave { name } => {
            if session.saved().unsave(&name).await? {
                println!("Removed {name}");
            } else {
                println!("{name} was not saved");
            }
        }
        Command::Saved => {
            let saved = session.saved().list().await?;
            if saved.is_empty() {
                println!("No saved places");
            }
            for entry in &saved {
                println!(
                    "{}  {}  (saved {})",
                    entry.place.key(),
                    entry.place.name,
                    entry.saved_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Command::Plan => {
            let outcome = session.plan_itinerary().await?;
            print_itinerary(&outcome.itinerary);
            if let Some(err) = outcome.clear_error {
                eprintln!(
                    "Warning: the itinerary was stored but saved places could not be cleared: {err}"
                );
            }
        }
        Command::Itineraries => {
            let itineraries = session.itineraries().list().await?;
            if itineraries.is_empty() {
                println!("No itineraries");
            }
            for itinerary in &itineraries {
                print_itinerary(itinerary);
            }
        }
        Command::DeleteItinerary { id } => {
            if session.itineraries().delete(&id).await? {
                println!("Deleted itinerary {id}");
            } else {
                anyhow::bail!("No itinerary with id {id}");
            }
        }
        Command::Reset => {
            session.teardown().await;
            println!("Active place list cleared");
        }
    }

    Ok(())
}

fn print_place(place: &Place) {
    let accessibility = place
        .accessibility
        .map(|info| info.supported().join(", "))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}  {}  ({:.1}, {} reviews)  accessibility: {}",
        place.key(),
        place.name,
        place.rating,
        place.review_count,
        accessibility
    );
}

fn print_place_details(place: &Place) {
    print_place(place);
    if !place.address.is_empty() {
        println!("  {}", place.address);
    }
    let description = place
        .translated_description
        .as_deref()
        .unwrap_or(&place.long_description);
    if !description.is_empty() {
        println!("  {description}");
    }
    if let Some(summary) = &place.translated_review_summary {
        println!("  Reviews: {summary}");
    }
    if let Some(website) = &place.website_uri {
        println!("  {website}");
    }
}

fn print_itinerary(itinerary: &Itinerary) {
    println!(
        "{}  {}  ({} places, created {})",
        itinerary.id,
        itinerary.title.as_deref().unwrap_or("Itinerary"),
        itinerary.places.len(),
        itinerary.created_at.format("%Y-%m-%d %H:%M")
    );
    for stop in &itinerary.stops {
        let marker = if stop.is_transit { "->" } else { "* " };
        println!("  {} {} {}", stop.timestamp, marker, stop.description);
    }
}
