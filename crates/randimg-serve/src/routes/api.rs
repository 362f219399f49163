//! Random image endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::Response;
use randimg_core::metrics::{record_request, record_served};
use randimg_core::{
    ClientSignals, ImageSet, QueryParams, Resolved, ResponseShape, SelectionRequest,
    build_image_url, resolve,
};

use crate::config::Config;
use crate::error::ApiError;
use crate::render::{self, DebugInfo, ImagePick};
use crate::state::AppState;

/// Headers checked, in order, for the client address shown in debug output.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip", "x-forwarded-for"];

/// `GET|POST /api`
///
/// Resolves the query, samples from the matching image set and renders the
/// picks as JSON, text or a redirect. Without `type` a usage page is returned.
///
/// The query is taken as raw pairs so a repeated key keeps its first value
/// instead of failing the request.
pub async fn random_image(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let params = QueryParams::from_pairs(pairs);
    let user_agent = header_str(&headers, header::USER_AGENT.as_str());
    let signals = ClientSignals {
        user_agent,
        accept: header_str(&headers, header::ACCEPT.as_str()),
        mobile_hint: header_str(&headers, "sec-ch-ua-mobile"),
    };

    let request = match resolve(&params, &signals, &state.limits()) {
        Ok(Resolved::Select(request)) => request,
        Ok(Resolved::Help) => {
            record_request("help");
            let set = match state.library.current().await {
                Ok(set) => set,
                Err(err) => {
                    tracing::warn!(error = %err, "image library unavailable, showing empty help");
                    Arc::new(ImageSet::default())
                }
            };
            return Ok(render::help(&set, state.config.max_count));
        }
        Err(err) => {
            record_request("bad_request");
            tracing::debug!(error = %err, "rejected request");
            return Err(err.into());
        }
    };

    if request.is_detection_probe() {
        record_request("probe");
        return Ok(render::detection(
            request.device,
            user_agent,
            client_ip(&headers),
        ));
    }

    let picks = select_images(&state, &request, &headers).await?;

    record_request("ok");
    record_served(request.device, picks.len());
    tracing::debug!(
        device = %request.device,
        format = %request.format,
        count = picks.len(),
        shape = ?request.shape,
        "images selected"
    );

    Ok(match request.shape {
        ResponseShape::Redirect => render::redirect(&picks[0].url),
        ResponseShape::Text => render::text(&picks),
        ResponseShape::Json => {
            let debug = request
                .debug
                .then(|| DebugInfo::new(user_agent, client_ip(&headers), request.device));
            render::json(&request, &picks, debug)
        }
    })
}

/// Sample images for `request` and build their URLs. Never returns an empty list.
async fn select_images(
    state: &AppState,
    request: &SelectionRequest,
    headers: &HeaderMap,
) -> Result<Vec<ImagePick>, ApiError> {
    let set = state.library.current().await?;
    let entries = set.get(request.device);
    if entries.is_empty() {
        record_request("not_found");
        return Err(ApiError::NotFound(format!(
            "no images available for type {}",
            request.device
        )));
    }

    let indices = {
        let mut history = state.history.lock();
        state.sampler.sample_with_history(
            request.device,
            entries.len(),
            request.count,
            &mut history,
            &mut rand::rng(),
        )
    };

    let base = base_origin(&state.config, headers, request.external);
    Ok(indices
        .into_iter()
        .map(|index| {
            let filename = &entries[index];
            ImagePick {
                filename: filename.clone(),
                url: build_image_url(filename, request.device, request.format, &base),
            }
        })
        .collect())
}

/// Origin prepended to relative image paths.
///
/// `external=true` prefers the configured external origin, then the public
/// base URL, then the request's own `Host` (with `X-Forwarded-Proto`).
fn base_origin(config: &Config, headers: &HeaderMap, external: bool) -> String {
    if external {
        if let Some(external_base) = &config.external_base_url {
            return external_base.clone();
        }
    }

    if let Some(public) = &config.public_base_url {
        return public.clone();
    }

    let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost");
    let proto = header_str(headers, "x-forwarded-proto")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("http");

    format!("{proto}://{host}")
}

fn client_ip(headers: &HeaderMap) -> Option<&str> {
    CLIENT_IP_HEADERS
        .iter()
        .find_map(|name| header_str(headers, name))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
