//! Server-Sent Events stream of samples

use std::convert::Infallible;

use axum::{
    extract::State,
    http::header,
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
};
use futures::stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::Sample;
use crate::actors::{StreamEvent, Subscription};
use crate::api::{error::ApiResult, state::ApiState};

/// SSE handler
///
/// GET /sse
///
/// The first event carries the current latest sample. Heartbeats are sent as
/// `: ping` comments. The subscription is released when the client goes away
/// and axum drops the stream.
pub async fn sse_handler(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let subscription = state.monitor.subscribe().await?;
    debug!("SSE client connected as {}", subscription.id());

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events(subscription)),
    ))
}

fn events(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    subscription.filter_map(|event| async move {
        match event {
            StreamEvent::Sample(sample) => sample_event(&sample),
            StreamEvent::Heartbeat => Some(Ok(Event::default().comment("ping"))),
        }
    })
}

fn sample_event(sample: &Sample) -> Option<Result<Event, Infallible>> {
    match Event::default().json_data(sample) {
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            warn!("failed to encode sample {}: {}", sample.timestamp, e);
            None
        }
    }
}
