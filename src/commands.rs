//! Command bodies for the `roadtrip` binary. Each one returns the text to
//! print; prompting happens in the caller.

use serde_json::json;
use std::fmt::Write;
use std::path::Path;

use crate::app::AppState;
use crate::error::{GENERIC_UPSTREAM_MESSAGE, ServiceError, ServiceResult};
use crate::links::link_cards;
use crate::metadata::{PKG_NAME, PKG_VERSION};
use crate::render::render_blocks;
use crate::settings::Settings;
use crate::share;
use crate::terminal::{format_history, format_plan};
use crate::types::{Plan, PlanRequest};

fn plan_output(plan: &Plan, as_json: bool) -> ServiceResult<String> {
    if !as_json {
        return Ok(format_plan(plan));
    }
    let value = json!({
        "plan": plan,
        "blocks": render_blocks(&plan.content),
        "links": link_cards(&plan.links),
    });
    Ok(serde_json::to_string_pretty(&value)?)
}

fn saved_or_latest<'a>(state: &'a AppState, id: Option<&str>) -> ServiceResult<&'a Plan> {
    match id {
        Some(id) => state
            .history()
            .get(id)
            .ok_or_else(|| ServiceError::PlanNotFound(id.to_string())),
        None => state
            .history()
            .latest()
            .ok_or_else(|| ServiceError::FromString("No saved trips yet.".to_string())),
    }
}

pub fn plan(state: &mut AppState, request: PlanRequest, as_json: bool) -> ServiceResult<String> {
    match state.submit(request) {
        Some(plan) => plan_output(plan, as_json),
        None => Err(ServiceError::FromString(
            state
                .last_error()
                .unwrap_or(GENERIC_UPSTREAM_MESSAGE)
                .to_string(),
        )),
    }
}

pub fn show(state: &AppState, id: Option<&str>, as_json: bool) -> ServiceResult<String> {
    plan_output(saved_or_latest(state, id)?, as_json)
}

pub fn history(state: &AppState, as_json: bool) -> ServiceResult<String> {
    if as_json {
        return Ok(serde_json::to_string_pretty(state.history().as_slice())?);
    }
    Ok(format_history(state.history()))
}

pub fn remove(state: &mut AppState, id: &str) -> ServiceResult<String> {
    if state.delete(id)? {
        Ok(format!("Removed {id}"))
    } else {
        Err(ServiceError::PlanNotFound(id.to_string()))
    }
}

pub fn clear(state: &mut AppState) -> ServiceResult<String> {
    let count = state.history().len();
    state.clear_history()?;
    Ok(format!("Removed {count} saved trip(s)"))
}

pub fn share(
    state: &AppState,
    settings: &Settings,
    id: Option<&str>,
    base_url: Option<&str>,
) -> ServiceResult<String> {
    let plan = saved_or_latest(state, id)?;
    let base = base_url.unwrap_or(&settings.share_base_url);
    Ok(share::share_url(base, &share::encode(plan)?)?)
}

pub fn open(state: &mut AppState, input: &str, save: bool) -> ServiceResult<String> {
    let token = share::token_from_input(input)
        .ok_or_else(|| ServiceError::FromString("No share token found in input".to_string()))?;
    let plan = state.open(&token)?.clone();
    let mut out = format_plan(&plan);
    if save {
        state.keep(plan.clone())?;
        let _ = writeln!(out, "\nSaved as {}", plan.id);
    }
    Ok(out)
}

pub fn status(state: &AppState, settings: &Settings, data_dir: &Path) -> String {
    let location = settings
        .location_hint()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "none".to_string());
    let mut out = String::new();
    let _ = writeln!(out, "{PKG_NAME} {PKG_VERSION}");
    let _ = writeln!(
        out,
        "API key:     {}",
        if settings.has_api_key() { "configured" } else { "missing" }
    );
    let _ = writeln!(out, "Model:       {}", settings.model);
    let _ = writeln!(out, "Endpoint:    {}", settings.endpoint);
    let _ = writeln!(out, "Vehicle:     {}", state.planner().vehicle());
    let _ = writeln!(out, "Location:    {location}");
    let _ = writeln!(out, "Share base:  {}", settings.share_base_url);
    let _ = writeln!(out, "Data dir:    {}", data_dir.display());
    let _ = writeln!(out, "Saved trips: {}", state.history().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Planner;
    use crate::planner::testing::FakeGenerator;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn state(generator: FakeGenerator) -> AppState {
        AppState::new(
            Planner::new(Arc::new(generator)),
            Box::new(MemoryStore::new()),
        )
    }

    #[test]
    fn plan_json_carries_blocks() {
        let mut state = state(FakeGenerator::replying("# Den 1"));
        let out = plan(&mut state, PlanRequest::new("Brno"), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["plan"]["content"], "# Den 1");
        assert_eq!(value["blocks"][0]["level"], 1);
    }

    #[test]
    fn failed_plan_reports_the_user_message() {
        let mut state = state(FakeGenerator::unconfigured());
        let err = plan(&mut state, PlanRequest::new("Brno"), false).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn show_and_remove_unknown_ids() {
        let mut state = state(FakeGenerator::replying("x"));
        assert!(show(&state, None, false).is_err());
        assert!(matches!(
            remove(&mut state, "nope"),
            Err(ServiceError::PlanNotFound(_))
        ));
    }

    #[test]
    fn share_then_open_with_save() {
        let mut state = state(FakeGenerator::replying("# Telč"));
        plan(&mut state, PlanRequest::new("Telč"), false).unwrap();
        let settings = Settings::default();
        let url = share(&state, &settings, None, Some("https://trips.example/?lang=cs")).unwrap();
        assert!(url.starts_with("https://trips.example/?lang=cs&share="));

        let out = open(&mut state, &url, true).unwrap();
        assert!(out.contains("Saved as shared-"));
        assert_eq!(state.history().len(), 2);
        assert!(open(&mut state, "https://trips.example/", false).is_err());
    }

    #[test]
    fn clear_reports_count() {
        let mut state = state(FakeGenerator::replying("x"));
        plan(&mut state, PlanRequest::new("A"), false).unwrap();
        plan(&mut state, PlanRequest::new("B"), false).unwrap();
        assert_eq!(clear(&mut state).unwrap(), "Removed 2 saved trip(s)");
        assert!(state.history().is_empty());
    }

    #[test]
    fn status_hides_the_key() {
        let state = AppState::new(
            Planner::new(Arc::new(FakeGenerator::replying("x"))).with_vehicle("Škoda Kodiaq"),
            Box::new(MemoryStore::new()),
        );
        let settings = Settings {
            api_key: Some("secret".into()),
            ..Settings::default()
        };
        let out = status(&state, &settings, Path::new("/tmp/roadtrip"));
        assert!(out.contains("API key:     configured"));
        assert!(!out.contains("secret"));
        assert!(out.contains("Saved trips: 0"));
        assert!(out.contains("Vehicle:     Škoda Kodiaq"));
        assert!(out.contains("Data dir:    /tmp/roadtrip"));
    }
}
