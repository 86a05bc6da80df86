//! Party search and party code handlers.

use crate::error::QueryResult;
use crate::handler::{QueryContext, cached_render, image_card};
use anise_model::Card;
use anise_resource::Ttl;
use serde_json::Value;
use tracing::{debug, warn};

/// Normalized party search text and the requested result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyPage {
    pub text: String,
    pub page: u32,
}

/// Splits a trailing page number off a search. Texts ending in `06` or
/// `02` are names, not page numbers, and keep page 1. Page numbers too
/// large for a `u32` are capped at `u32::MAX`.
pub fn split_page(text: &str) -> PartyPage {
    let text = text.trim();
    if !(text.ends_with("06") || text.ends_with("02")) {
        let digits = text.len() - text.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 {
            let (rest, number) = text.split_at(text.len() - digits);
            // Only overflow can fail here: `number` is all ASCII digits.
            let page = number.parse::<u32>().unwrap_or(u32::MAX);
            return PartyPage {
                text: rest.trim().to_string(),
                page,
            };
        }
    }
    PartyPage {
        text: text.to_string(),
        page: 1,
    }
}

/// Asks the origin whether the search has any parties on that page.
pub async fn probe(text: &str, ctx: &QueryContext) -> Option<PartyPage> {
    let page = split_page(text);
    if page.text.is_empty() {
        return None;
    }
    let url = ctx.cache.origin_url(&format!(
        "/api/v1/party/page/?search_text={}&page_index={}",
        urlencoding::encode(&page.text),
        page.page
    ));
    let response = match ctx.cache.fetcher().post(&url, ctx.party_search_timeout).await {
        Ok(response) if response.status == 200 => response,
        Ok(response) => {
            debug!(url = %url, status = response.status, "party search probe rejected");
            return None;
        }
        Err(e) => {
            debug!(url = %url, error = %e, "party search probe failed");
            return None;
        }
    };
    let body: Value = match serde_json::from_slice(&response.bytes) {
        Ok(body) => body,
        Err(e) => {
            debug!(url = %url, error = %e, "party search probe returned invalid json");
            return None;
        }
    };
    has_parties(&body).then_some(page)
}

fn has_parties(body: &Value) -> bool {
    match body.get("parties") {
        Some(Value::Array(parties)) => !parties.is_empty(),
        Some(Value::Object(parties)) => !parties.is_empty(),
        _ => false,
    }
}

pub async fn search_card(page: &PartyPage, ctx: &QueryContext) -> QueryResult<Option<Card>> {
    let cache = &ctx.cache;
    let url = cache.origin_url(&format!(
        "/pure/partySearcher/?q={}&page={}",
        urlencoding::encode(&page.text),
        page.page
    ));
    let request = cache.render_request(url.clone(), "#main-card");
    let logical_key = format!("{}_page{}", page.text, page.page);
    image_card(
        cached_render(ctx, "party_page", &logical_key, request, cache.default_ttl()).await,
        &url,
    )
}

/// A six character alphanumeric party code that is not all digits.
pub fn party_code(text: &str) -> Option<String> {
    let code = text.trim();
    let valid = code.len() == 6
        && code.chars().all(|c| c.is_ascii_alphanumeric())
        && !code.chars().all(|c| c.is_ascii_digit());
    valid.then(|| code.to_string())
}

/// Rendered party card, cached forever. Any failure means "no answer".
pub async fn refer_card(code: &str, ctx: &QueryContext) -> Option<Card> {
    let cache = &ctx.cache;
    let url = cache.origin_url(&format!("/card/party_refer/?id={code}"));
    let request = cache.render_request(url.clone(), "#main-card").wait_for("#card-complete");
    match cached_render(ctx, "party_refer", code, request, Ttl::Never).await {
        Ok(bytes) => Some(Card::image(bytes)),
        Err(e) => {
            warn!(code = %code, error = %e, "party card unavailable");
            None
        }
    }
}
