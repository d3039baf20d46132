use crate::types::PlanRequest;

pub const DEFAULT_VEHICLE: &str =
    "Hyundai i30 Fastback 1.5 T-GDi mild-hybrid (MHEV), reálná spotřeba cca 6.2l/100km";

/// Answer layout the model is asked to follow. The renderer relies on the
/// markdown headings, bullet lists and the pipe table it produces.
const RESPONSE_STRUCTURE: &str = r#"STRUKTURA ODPOVĚDI (používej Markdown a emoji):
1. Úvodní slovo o trase.
2. Itinerář den po dni (Dopoledne: památky/hrady, Oběd, Odpoledne: turistika/města, Večer: ubytování).
3. Tabulka "Logistika trasy": Sloupce: Den, Trasa, Km, Čas, Odhadovaná spotřeba (litry).
4. Tipy pro řidiče (kde tankovat, parkování u památek).

Odpovídej v češtině, buď konkrétní a doporučuj reálná místa."#;

pub fn build_prompt(request: &PlanRequest, vehicle: &str) -> String {
    let interests = if request.interests.is_empty() {
        "bez preferencí".to_string()
    } else {
        request.interests.join(", ")
    };
    format!(
        "Jsi expert na roadtripy a automobily. Navrhni detailní plán dovolené.\n\
         Cíl: {destination}\n\
         Délka: {days} dní\n\
         Styl: {style}\n\
         Cestovatelé: {travelers}\n\
         Zájmy: {interests}\n\
         Vozidlo: {vehicle}\n\
         \n\
         {structure}",
        destination = request.destination.trim(),
        days = request.days,
        style = request.style,
        travelers = request.travelers,
        structure = RESPONSE_STRUCTURE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TravelStyle, Travelers};

    #[test]
    fn prompt_embeds_request_fields() {
        let request = PlanRequest::new(" Toskánsko ")
            .with_days(5)
            .with_travelers(Travelers::Family)
            .with_style(TravelStyle::Culture)
            .with_interests(["Muzea", "Gastronomie"]);
        let prompt = build_prompt(&request, DEFAULT_VEHICLE);
        assert!(prompt.contains("Cíl: Toskánsko\n"));
        assert!(prompt.contains("Délka: 5 dní"));
        assert!(prompt.contains("Styl: culture"));
        assert!(prompt.contains("Cestovatelé: family"));
        assert!(prompt.contains("Zájmy: Muzea, Gastronomie"));
        assert!(prompt.contains("Vozidlo: Hyundai i30"));
        assert!(prompt.contains("Logistika trasy"));
    }

    #[test]
    fn prompt_without_interests() {
        let prompt = build_prompt(&PlanRequest::new("Alpy"), "Škoda Octavia");
        assert!(prompt.contains("Zájmy: bez preferencí"));
        assert!(prompt.contains("Vozidlo: Škoda Octavia"));
    }
}
