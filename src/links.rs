use serde::Serialize;

use crate::types::{GroundingLink, LinkKind};

pub const DEFAULT_LINK_TITLE: &str = "Source";

/// A grounding link ready for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCard {
    pub display_title: String,
    pub href: String,
    pub kind: LinkKind,
}

/// Builds cards in input order. Links without a uri are skipped.
pub fn link_cards(links: &[GroundingLink]) -> Vec<LinkCard> {
    links
        .iter()
        .filter_map(|link| {
            let source = link.source();
            let href = source.uri.trim();
            if href.is_empty() {
                return None;
            }
            let display_title = source
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_LINK_TITLE)
                .to_string();
            Some(LinkCard {
                display_title,
                href: href.to_string(),
                kind: link.kind(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LinkSource;

    #[test]
    fn cards_keep_order_and_kind() {
        let cards = link_cards(&[
            GroundingLink::web("https://a.example", "Castle guide"),
            GroundingLink::maps("https://maps.example/x", "Lednice"),
        ]);
        assert_eq!(
            cards,
            vec![
                LinkCard {
                    display_title: "Castle guide".into(),
                    href: "https://a.example".into(),
                    kind: LinkKind::Web,
                },
                LinkCard {
                    display_title: "Lednice".into(),
                    href: "https://maps.example/x".into(),
                    kind: LinkKind::Maps,
                },
            ]
        );
    }

    #[test]
    fn missing_or_blank_title_falls_back() {
        let cards = link_cards(&[
            GroundingLink::Web(LinkSource {
                uri: "https://a.example".into(),
                title: None,
            }),
            GroundingLink::Maps(LinkSource {
                uri: "https://maps.example".into(),
                title: Some("  ".into()),
            }),
        ]);
        assert!(cards.iter().all(|c| c.display_title == DEFAULT_LINK_TITLE));
    }

    #[test]
    fn links_without_uri_are_skipped() {
        let cards = link_cards(&[
            GroundingLink::web("", "Nowhere"),
            GroundingLink::web("https://b.example", "B"),
        ]);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].href, "https://b.example");
    }
}
