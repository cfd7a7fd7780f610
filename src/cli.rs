//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wanderlens - place recommendations from a photo or a prompt
#[derive(Parser, Debug)]
#[command(
    name = "wanderlens",
    about = "Photo and prompt driven place recommendations with itinerary planning",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Port to listen on, overrides the configured one
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Recommend places for a prompt and/or a photo
    Ideas {
        #[arg(short, long)]
        prompt: Option<String>,

        /// Image file (jpg, png, gif, webp, heic, bmp)
        #[arg(short, long, value_name = "PATH")]
        image: Option<PathBuf>,
    },

    /// Show the active place list
    Places,

    /// Show one active place by its coordinates
    Place {
        /// Coordinates as `lat,lng`
        #[arg(value_name = "LAT,LNG", allow_hyphen_values = true)]
        coordinates: String,
    },

    /// Classify the accessibility of a place by name
    Accessibility { name: String },

    /// Save an active place for itinerary planning
    Save {
        #[arg(value_name = "LAT,LNG", allow_hyphen_values = true)]
        coordinates: String,
    },

    /// Remove a saved place by name
    Unsave { name: String },

    /// List saved places, most recent first
    Saved,

    /// Plan an itinerary from the saved places
    Plan,

    /// List stored itineraries, newest first
    Itineraries,

    /// Delete a stored itinerary
    DeleteItinerary { id: String },

    /// End the session and drop the active place list
    Reset,
}
