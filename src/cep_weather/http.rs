// cep_weather - Current temperature lookup by Brazilian postal code
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::client::{ClientError, ForecastClient, GeocodingClient, PostalClient};
use crate::convert::{convert, TemperatureResponse};
use crate::metrics::{Collaborator, TemperatureMetrics};
use crate::validate::PostalCode;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

const METRICS_PREFIX: &str = "cep_weather";
const OPENMETRICS_TEXT: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Clients and metrics shared by every request.
#[derive(Debug)]
pub struct RequestContext {
    postal: PostalClient,
    geocoding: GeocodingClient,
    forecast: ForecastClient,
    metrics: TemperatureMetrics,
    registry: Registry,
}

impl RequestContext {
    pub fn new(postal: PostalClient, geocoding: GeocodingClient, forecast: ForecastClient) -> Self {
        let mut registry = Registry::with_prefix(METRICS_PREFIX);
        let metrics = TemperatureMetrics::new(&mut registry);

        RequestContext {
            postal,
            geocoding,
            forecast,
            metrics,
            registry,
        }
    }
}

/// Reasons a temperature could not be returned for a request.
#[derive(Debug)]
pub enum LookupError {
    /// The `cep` parameter was missing or not eight digits.
    InvalidPostalCode(Option<String>),
    /// The postal lookup failed or the code has no locality.
    PostalCodeNotFound(PostalCode, Option<ClientError>),
    /// Geocoding or the weather request failed. A city the geocoder can't find
    /// ends up here too, not as a 404.
    Upstream(Collaborator, ClientError),
}

impl LookupError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPostalCode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PostalCodeNotFound(_, _) => StatusCode::NOT_FOUND,
            Self::Upstream(_, _) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients. Never includes the underlying cause.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidPostalCode(_) => "invalid zipcode",
            Self::PostalCodeNotFound(_, _) => "cannot find zipcode",
            Self::Upstream(_, _) => "unable to fetch temperature",
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPostalCode(Some(c)) => write!(f, "invalid postal code {:?}", c),
            Self::InvalidPostalCode(None) => write!(f, "missing postal code"),
            Self::PostalCodeNotFound(c, Some(e)) => write!(f, "postal code {} lookup failed: {}", c, e),
            Self::PostalCodeNotFound(c, None) => write!(f, "postal code {} has no locality", c),
            Self::Upstream(who, e) => write!(f, "{} request failed: {}", who, e),
        }
    }
}

impl error::Error for LookupError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::PostalCodeNotFound(_, Some(e)) => Some(e),
            Self::Upstream(_, e) => Some(e),
            _ => None,
        }
    }
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

/// Build the router for `/tempo` and `/metrics`. Any other path is a 404.
pub fn router(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/tempo", get(temperature))
        .route("/metrics", get(text_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

async fn temperature(
    State(context): State<Arc<RequestContext>>,
    params: Option<Query<Vec<(String, String)>>>,
) -> Response {
    let cep = params.and_then(|Query(pairs)| first_param(pairs, "cep"));
    let res = match lookup_temperature(&context, cep.as_deref()).await {
        Ok(temps) => (StatusCode::OK, Json(temps)).into_response(),
        Err(e) => {
            match &e {
                LookupError::InvalidPostalCode(_) => {
                    tracing::debug!(message = "rejected request", error = %e);
                }
                LookupError::PostalCodeNotFound(_, _) => {
                    tracing::info!(message = "postal code not found", error = %e);
                }
                LookupError::Upstream(_, _) => {
                    tracing::error!(message = "failed to fetch temperature", error = %e);
                }
            }

            e.into_response()
        }
    };

    context.metrics.response(res.status().as_u16());
    res
}

/// Resolve `cep` to a locality, the locality to coordinates, and fetch the current
/// temperature there. Each request depends on the previous one so they run in order.
pub async fn lookup_temperature(
    context: &RequestContext,
    cep: Option<&str>,
) -> Result<TemperatureResponse, LookupError> {
    let code = cep
        .and_then(PostalCode::parse)
        .ok_or_else(|| LookupError::InvalidPostalCode(cep.map(str::to_owned)))?;

    let location = timed(&context.metrics, Collaborator::Postal, context.postal.lookup(&code))
        .await
        .map_err(|e| LookupError::PostalCodeNotFound(code.clone(), Some(e)))?;
    if location.locality.is_empty() {
        return Err(LookupError::PostalCodeNotFound(code, None));
    }

    let coord = timed(
        &context.metrics,
        Collaborator::Geocoding,
        context.geocoding.coordinates(&location.locality),
    )
    .await
    .map_err(|e| LookupError::Upstream(Collaborator::Geocoding, e))?;

    let reading = timed(&context.metrics, Collaborator::Forecast, context.forecast.current(&coord))
        .await
        .map_err(|e| LookupError::Upstream(Collaborator::Forecast, e))?;

    tracing::debug!(
        message = "fetched current temperature",
        cep = %code,
        locality = %location.locality,
        region = %location.region,
        latitude = coord.latitude,
        longitude = coord.longitude,
        celsius = reading.temperature_celsius,
    );

    Ok(convert(reading.temperature_celsius))
}

/// Value of the first `name` pair in the query string. Later duplicates are ignored.
fn first_param(pairs: Vec<(String, String)>, name: &str) -> Option<String> {
    pairs.into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

async fn timed<T, F>(metrics: &TemperatureMetrics, collaborator: Collaborator, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    let start = Instant::now();
    let res = fut.await;
    metrics.upstream(collaborator, res.is_ok(), start.elapsed());
    res
}

async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();

    match encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, OPENMETRICS_TEXT)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{first_param, lookup_temperature, LookupError, RequestContext};
    use crate::client::{ClientError, ForecastClient, GeocodingClient, PostalClient};
    use crate::metrics::Collaborator;
    use crate::validate::PostalCode;
    use axum::http::StatusCode;
    use reqwest::{Client, Url};

    fn context() -> RequestContext {
        // Nothing listens here, validation failures must not make any requests.
        let base = Url::parse("http://127.0.0.1:9/").unwrap();
        RequestContext::new(
            PostalClient::new(Client::new(), base.clone()),
            GeocodingClient::new(Client::new(), base.clone()),
            ForecastClient::new(Client::new(), base),
        )
    }

    #[tokio::test]
    async fn test_lookup_temperature_missing_cep() {
        let res = lookup_temperature(&context(), None).await;
        assert!(matches!(res, Err(LookupError::InvalidPostalCode(None))));
    }

    #[tokio::test]
    async fn test_lookup_temperature_malformed_cep() {
        let res = lookup_temperature(&context(), Some("123")).await;
        match res {
            Err(LookupError::InvalidPostalCode(Some(c))) => assert_eq!("123", c),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_first_param_duplicates() {
        let pairs = vec![
            ("cep".to_owned(), "00000000".to_owned()),
            ("other".to_owned(), "1".to_owned()),
            ("cep".to_owned(), "abc".to_owned()),
        ];

        assert_eq!(Some("00000000".to_owned()), first_param(pairs, "cep"));
        assert_eq!(None, first_param(vec![("other".to_owned(), "1".to_owned())], "cep"));
    }

    #[test]
    fn test_lookup_error_status() {
        let code = PostalCode::parse("00000000").unwrap();

        assert_eq!(
            StatusCode::UNPROCESSABLE_ENTITY,
            LookupError::InvalidPostalCode(None).status()
        );
        assert_eq!(
            StatusCode::NOT_FOUND,
            LookupError::PostalCodeNotFound(code, None).status()
        );
        assert_eq!(
            StatusCode::INTERNAL_SERVER_ERROR,
            LookupError::Upstream(Collaborator::Geocoding, ClientError::NotFound("Nowhere".to_owned())).status()
        );
    }

    #[test]
    fn test_lookup_error_hides_cause() {
        let err = LookupError::Upstream(Collaborator::Geocoding, ClientError::NotFound("Nowhere".to_owned()));

        assert_eq!("geocoding request failed: no results for Nowhere", err.to_string());
        assert_eq!("unable to fetch temperature", err.public_message());
    }
}
