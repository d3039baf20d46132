use std::io::IsTerminal;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use roadtrip_planner::{
    app::AppState,
    cli::{Cli, Command},
    client::GeminiClient,
    commands, form,
    handler::PlannerHandler,
    metadata::{PKG_NAME, PKG_VERSION},
    planner::Planner,
    server::start_server,
    settings::Settings,
    storage::FileStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout belongs to the MCP transport when serving, so logs go to stderr
    let default_level = if matches!(cli.command, Command::Serve) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Command::Version = cli.command {
        println!("{PKG_NAME} {PKG_VERSION}");
        return Ok(());
    }

    let root = match cli.global.data_dir.clone() {
        Some(dir) => dir,
        None => FileStore::default_root()?,
    };
    let mut settings_store = FileStore::new(root.clone());
    let mut settings = Settings::load(&settings_store);

    if let Command::Config = cli.command {
        let edited = form::edit_settings(&settings)?;
        edited.validate().map_err(|e| format!("invalid settings: {e}"))?;
        edited.save(&mut settings_store)?;
        println!(
            "Saved settings to {}",
            settings_store.root().join("settings.json").display()
        );
        return Ok(());
    }

    settings.apply(cli.global.overrides());
    settings.validate().map_err(|e| format!("invalid settings: {e}"))?;

    let generator = Arc::new(GeminiClient::new(settings.gemini_config()));
    let planner = Planner::new(generator).with_vehicle(settings.vehicle.clone());
    let mut state = AppState::new(planner, Box::new(FileStore::new(root.clone())));
    state.set_location(settings.location_hint());

    let output = match cli.command {
        Command::Plan(args) => {
            let request = match args.to_request() {
                Some(request) if !args.interactive => request,
                seed => form::prompt_request(seed.as_ref())?,
            };
            if std::io::stderr().is_terminal() {
                eprintln!("Planning {} ({} days)...", request.destination, request.days);
            }
            commands::plan(&mut state, request, args.json)?
        }
        Command::Show { id, json } => commands::show(&state, id.as_deref(), json)?,
        Command::History { json } => commands::history(&state, json)?,
        Command::Remove { id } => commands::remove(&mut state, &id)?,
        Command::Clear { yes } => {
            if !yes && !form::confirm("Delete all saved trips?")? {
                return Ok(());
            }
            commands::clear(&mut state)?
        }
        Command::Share { id, base_url } => {
            commands::share(&state, &settings, id.as_deref(), base_url.as_deref())?
        }
        Command::Open { input, save } => commands::open(&mut state, &input, save)?,
        Command::Status => commands::status(&state, &settings, settings_store.root()),
        Command::Serve => {
            start_server(PlannerHandler::new(state, settings.share_base_url.clone())).await?;
            return Ok(());
        }
        Command::Config | Command::Version => return Ok(()),
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(())
}
