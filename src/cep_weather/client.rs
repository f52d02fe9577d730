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

use crate::validate::PostalCode;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::error;
use std::fmt;

const CLIENT_USER_AGENT: &str = concat!("cep_weather/", env!("CARGO_PKG_VERSION"));
const JSON_RESPONSE: &str = "application/json";

#[derive(Debug)]
pub enum ClientError {
    /// The request could not be sent or the response body could not be read.
    Transport(reqwest::Error),
    /// The service answered with a non-success status. Includes the response body.
    Upstream(StatusCode, Url, String),
    /// The response body was not the JSON we expected.
    Decode(serde_json::Error, Url),
    /// The service answered successfully but had no result for the query.
    NotFound(String),
    /// A request URL could not be built from the configured base URL.
    InvalidUrl(Url),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Upstream(status, url, body) => write!(f, "unexpected status {} for {}: {}", status, url, body),
            Self::Decode(e, url) => write!(f, "unable to decode response from {}: {}", url, e),
            Self::NotFound(q) => write!(f, "no results for {}", q),
            Self::InvalidUrl(url) => write!(f, "unable to build request URL from {}", url),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Decode(e, _) => Some(e),
            _ => None,
        }
    }
}

/// Locality and state for a postal code, as returned by the ViaCEP API.
///
/// ViaCEP reports unknown codes with a successful response that has none of
/// these fields so both default to empty strings. Callers must check `locality`.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PostalLookupResult {
    #[serde(alias = "localidade", default)]
    pub locality: String,
    #[serde(alias = "uf", default)]
    pub region: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherReading {
    pub temperature_celsius: f64,
}

#[derive(Deserialize, Debug)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeoCoordinate>,
}

#[derive(Deserialize, Debug)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Deserialize, Debug)]
struct CurrentWeather {
    temperature: f64,
}

/// Client for the ViaCEP postal code API.
#[derive(Debug, Clone)]
pub struct PostalClient {
    client: Client,
    base_url: Url,
}

impl PostalClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        PostalClient { client, base_url }
    }

    pub async fn lookup(&self, code: &PostalCode) -> Result<PostalLookupResult, ClientError> {
        let request_url = self.lookup_url(code)?;
        tracing::debug!(message = "making postal code lookup request", url = %request_url);
        get_json(&self.client, request_url).await
    }

    fn lookup_url(&self, code: &PostalCode) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map(|mut p| {
                p.pop_if_empty().push(code.as_str()).push("json").push("");
            })
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?;

        Ok(url)
    }
}

/// Client for the Open-Meteo geocoding API.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    client: Client,
    base_url: Url,
}

impl GeocodingClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        GeocodingClient { client, base_url }
    }

    /// Coordinates of the best match for `locality`. Only the first result is
    /// requested and any ranking is left to the API.
    pub async fn coordinates(&self, locality: &str) -> Result<GeoCoordinate, ClientError> {
        let request_url = self.search_url(locality);
        tracing::debug!(message = "making geocoding request", url = %request_url);

        let res: GeocodingResponse = get_json(&self.client, request_url).await?;
        res.results
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(locality.to_owned()))
    }

    fn search_url(&self, locality: &str) -> Url {
        let encoded_locality = utf8_percent_encode(locality, NON_ALPHANUMERIC);
        let mut url = self.base_url.clone();
        url.set_query(Some(&format!(
            "name={}&count=1&language=pt&format=json",
            encoded_locality
        )));

        url
    }
}

/// Client for the Open-Meteo forecast API.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: Url,
}

impl ForecastClient {
    pub fn new(client: Client, base_url: Url) -> Self {
        ForecastClient { client, base_url }
    }

    pub async fn current(&self, coord: &GeoCoordinate) -> Result<WeatherReading, ClientError> {
        let request_url = self.current_url(coord);
        tracing::debug!(message = "making current weather request", url = %request_url);

        let res: ForecastResponse = get_json(&self.client, request_url).await?;
        Ok(WeatherReading {
            temperature_celsius: res.current_weather.temperature,
        })
    }

    fn current_url(&self, coord: &GeoCoordinate) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(Some(&format!(
            "latitude={:.6}&longitude={:.6}&current_weather=true",
            coord.latitude, coord.longitude
        )));

        url
    }
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, ClientError> {
    let res = client
        .get(url.clone())
        .header(USER_AGENT, CLIENT_USER_AGENT)
        .header(ACCEPT, JSON_RESPONSE)
        .send()
        .await
        .map_err(ClientError::Transport)?;

    let status = res.status();
    let body = res.bytes().await.map_err(ClientError::Transport)?;
    if !status.is_success() {
        return Err(ClientError::Upstream(
            status,
            url,
            String::from_utf8_lossy(&body).into_owned(),
        ));
    }

    serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e, url))
}

#[cfg(test)]
mod tests {
    use super::{
        ClientError, ForecastClient, ForecastResponse, GeoCoordinate, GeocodingClient, GeocodingResponse,
        PostalClient, PostalLookupResult,
    };
    use crate::validate::PostalCode;
    use reqwest::{Client, StatusCode, Url};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_postal_lookup_url() {
        let client = PostalClient::new(Client::new(), url("https://viacep.com.br/ws/"));
        let code = PostalCode::parse("01310100").unwrap();

        assert_eq!(
            "https://viacep.com.br/ws/01310100/json/",
            client.lookup_url(&code).unwrap().as_str()
        );
    }

    #[test]
    fn test_postal_lookup_url_no_trailing_slash() {
        let client = PostalClient::new(Client::new(), url("http://127.0.0.1:8000/ws"));
        let code = PostalCode::parse("01310100").unwrap();

        assert_eq!(
            "http://127.0.0.1:8000/ws/01310100/json/",
            client.lookup_url(&code).unwrap().as_str()
        );
    }

    #[test]
    fn test_postal_lookup_url_cannot_be_base() {
        let client = PostalClient::new(Client::new(), url("data:text/plain,cep"));
        let code = PostalCode::parse("01310100").unwrap();

        assert!(matches!(client.lookup_url(&code), Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_geocoding_search_url_encodes_locality() {
        let client = GeocodingClient::new(Client::new(), url("https://geocoding-api.open-meteo.com/v1/search"));

        assert_eq!(
            "https://geocoding-api.open-meteo.com/v1/search?name=S%C3%A3o%20Paulo&count=1&language=pt&format=json",
            client.search_url("São Paulo").as_str()
        );
    }

    #[test]
    fn test_forecast_current_url_six_decimals() {
        let client = ForecastClient::new(Client::new(), url("https://api.open-meteo.com/v1/forecast"));
        let coord = GeoCoordinate {
            latitude: -23.5,
            longitude: -46.6,
        };

        assert_eq!(
            "https://api.open-meteo.com/v1/forecast?latitude=-23.500000&longitude=-46.600000&current_weather=true",
            client.current_url(&coord).as_str()
        );
    }

    #[test]
    fn test_decode_postal_found() {
        let body = r#"{"cep":"01310-100","logradouro":"Avenida Paulista","localidade":"São Paulo","uf":"SP"}"#;
        let res: PostalLookupResult = serde_json::from_str(body).unwrap();

        assert_eq!("São Paulo", res.locality);
        assert_eq!("SP", res.region);
    }

    #[test]
    fn test_decode_postal_not_found() {
        let res: PostalLookupResult = serde_json::from_str(r#"{"erro":"true"}"#).unwrap();

        assert_eq!("", res.locality);
        assert_eq!("", res.region);
    }

    #[test]
    fn test_decode_geocoding_missing_results() {
        let res: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(res.results.is_empty());
    }

    #[test]
    fn test_decode_forecast_missing_current_weather() {
        let res = serde_json::from_str::<ForecastResponse>(r#"{"latitude":-23.5,"longitude":-46.625}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Upstream(
            StatusCode::BAD_GATEWAY,
            url("https://api.open-meteo.com/v1/forecast"),
            "upstream down".to_owned(),
        );

        assert_eq!(
            "unexpected status 502 Bad Gateway for https://api.open-meteo.com/v1/forecast: upstream down",
            err.to_string()
        );
        assert_eq!("no results for Nowhere", ClientError::NotFound("Nowhere".to_owned()).to_string());
    }
}
