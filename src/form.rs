//! Interactive prompts for the trip form and the settings editor.

use dialoguer::{Confirm, Input, MultiSelect, Password, Select, theme::ColorfulTheme};

use crate::error::ServiceResult;
use crate::settings::Settings;
use crate::types::{
    INTEREST_OPTIONS, MAX_DAYS, MIN_DAYS, PlanRequest, TravelStyle, Travelers,
};

/// Asks for every field of a trip request. `seed` pre-fills the answers.
pub fn prompt_request(seed: Option<&PlanRequest>) -> ServiceResult<PlanRequest> {
    let theme = ColorfulTheme::default();
    let seed = seed.cloned().unwrap_or_else(|| PlanRequest::new(""));

    let destination: String = Input::with_theme(&theme)
        .with_prompt("Destination")
        .with_initial_text(seed.destination.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Enter a destination")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let days: u8 = Input::with_theme(&theme)
        .with_prompt(format!("Days ({MIN_DAYS}-{MAX_DAYS})"))
        .default(seed.days)
        .validate_with(|days: &u8| -> Result<(), String> {
            if (MIN_DAYS..=MAX_DAYS).contains(days) {
                Ok(())
            } else {
                Err(format!("Pick between {MIN_DAYS} and {MAX_DAYS} days"))
            }
        })
        .interact_text()?;

    let labels: Vec<&str> = Travelers::ALL.iter().map(Travelers::label).collect();
    let travelers = Travelers::ALL[Select::with_theme(&theme)
        .with_prompt("Who is travelling")
        .items(&labels[..])
        .default(Travelers::ALL.iter().position(|t| *t == seed.travelers).unwrap_or(0))
        .interact()?];

    let labels: Vec<&str> = TravelStyle::ALL.iter().map(TravelStyle::label).collect();
    let style = TravelStyle::ALL[Select::with_theme(&theme)
        .with_prompt("Travel style")
        .items(&labels[..])
        .default(TravelStyle::ALL.iter().position(|s| *s == seed.style).unwrap_or(0))
        .interact()?];

    let checked: Vec<bool> = INTEREST_OPTIONS
        .iter()
        .map(|option| seed.interests.iter().any(|i| i == option))
        .collect();
    let picked = MultiSelect::with_theme(&theme)
        .with_prompt("Interests (space to toggle)")
        .items(&INTEREST_OPTIONS[..])
        .defaults(&checked)
        .interact()?;

    Ok(PlanRequest::new(destination.trim())
        .with_days(days)
        .with_travelers(travelers)
        .with_style(style)
        .with_interests(picked.into_iter().map(|i| INTEREST_OPTIONS[i])))
}

/// Walks through the stored settings and returns the edited copy.
pub fn edit_settings(current: &Settings) -> ServiceResult<Settings> {
    let theme = ColorfulTheme::default();
    let mut settings = current.clone();

    let replace_key = !settings.has_api_key()
        || Confirm::with_theme(&theme)
            .with_prompt("An API key is stored. Replace it?")
            .default(false)
            .interact()?;
    if replace_key {
        let key = Password::with_theme(&theme)
            .with_prompt("Gemini API key (empty to leave unset)")
            .allow_empty_password(true)
            .interact()?;
        settings.api_key = Some(key).filter(|k| !k.trim().is_empty());
    }

    settings.model = Input::with_theme(&theme)
        .with_prompt("Model")
        .default(settings.model.clone())
        .interact_text()?;
    settings.vehicle = Input::with_theme(&theme)
        .with_prompt("Vehicle")
        .default(settings.vehicle.clone())
        .interact_text()?;

    let location: String = Input::with_theme(&theme)
        .with_prompt("Location hint as <lat>,<lng> (empty for none)")
        .with_initial_text(settings.location.clone().unwrap_or_default())
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            if input.trim().is_empty() {
                return Ok(());
            }
            input
                .trim()
                .parse::<crate::types::LatLng>()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;
    settings.location = Some(location.trim().to_string()).filter(|l| !l.is_empty());

    settings.share_base_url = Input::with_theme(&theme)
        .with_prompt("Share link base URL")
        .default(settings.share_base_url.clone())
        .interact_text()?;

    Ok(settings)
}

/// Yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> ServiceResult<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
