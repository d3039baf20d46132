use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::metadata::{PKG_DESCRIPTION, PKG_NAME, PKG_VERSION};
use crate::settings::Overrides;
use crate::types::{DEFAULT_DAYS, MAX_DAYS, MIN_DAYS, PlanRequest, TravelStyle, Travelers};

#[derive(Parser, Debug, Clone)]
#[command(name = PKG_NAME)]
#[command(version = PKG_VERSION)]
#[command(about = PKG_DESCRIPTION, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Model used for generation
    #[arg(long, env = "ROADTRIP_MODEL", global = true)]
    pub model: Option<String>,

    /// Base URL of the generative language API
    #[arg(long, env = "ROADTRIP_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Directory holding history and settings
    #[arg(long, env = "ROADTRIP_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Location hint as "<lat>,<lng>" to bias map results
    #[arg(long, env = "ROADTRIP_LOCATION", global = true)]
    pub location: Option<String>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            endpoint: self.endpoint.clone(),
            location: self.location.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a new itinerary
    Plan(PlanArgs),
    /// Show a saved plan (the latest when no id is given)
    Show {
        id: Option<String>,
        /// Print the plan and its blocks as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved plans, newest first
    History {
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved plan
    Remove { id: String },
    /// Delete all saved plans
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print a share link for a saved plan (the latest when no id is given)
    Share {
        id: Option<String>,
        /// Page the link points at
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Open a share link or bare share token
    Open {
        input: String,
        /// Keep the opened plan in history
        #[arg(long)]
        save: bool,
    },
    /// Show the resolved configuration
    Status,
    /// Open an interactive editor for settings.json
    Config,
    /// Run the MCP server on stdio
    Serve,
    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Where the trip goes
    pub destination: Option<String>,

    /// Trip length in days
    #[arg(short, long, default_value_t = DEFAULT_DAYS,
          value_parser = clap::value_parser!(u8).range(MIN_DAYS as i64..=MAX_DAYS as i64))]
    pub days: u8,

    /// solo, couple, family or group
    #[arg(short, long, default_value_t = Travelers::Couple)]
    pub travelers: Travelers,

    /// adventure, luxury, budget, culture or nature
    #[arg(short, long, default_value_t = TravelStyle::Adventure)]
    pub style: TravelStyle,

    /// An interest to plan around (repeatable)
    #[arg(short = 'i', long = "interest")]
    pub interests: Vec<String>,

    /// Fill in the trip form interactively
    #[arg(long)]
    pub interactive: bool,

    /// Print the plan as JSON instead of rendering it
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    /// The request described by the flags, if a destination was given.
    pub fn to_request(&self) -> Option<PlanRequest> {
        let destination = self.destination.as_deref()?.trim();
        if destination.is_empty() {
            return None;
        }
        Some(
            PlanRequest::new(destination)
                .with_days(self.days)
                .with_travelers(self.travelers)
                .with_style(self.style)
                .with_interests(self.interests.iter().cloned()),
        )
    }
}
