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

use cep_weather::client::{ForecastClient, GeocodingClient, PostalClient};
use cep_weather::http::RequestContext;
use clap::Parser;
use reqwest::{Client, Url};
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);
const DEFAULT_POSTAL_API_URL: &str = "https://viacep.com.br/ws/";
const DEFAULT_GEOCODING_API_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const DEFAULT_FORECAST_API_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Parser)]
#[clap(name = "cep_weather", version = clap::crate_version!())]
struct CepWeatherApplication {
    /// Base URL for the ViaCEP postal code API. The postal code and `json/` are appended
    /// as path segments.
    #[clap(long, default_value = DEFAULT_POSTAL_API_URL)]
    postal_api_url: Url,

    /// URL of the Open-Meteo geocoding search endpoint
    #[clap(long, default_value = DEFAULT_GEOCODING_API_URL)]
    geocoding_api_url: Url,

    /// URL of the Open-Meteo forecast endpoint
    #[clap(long, default_value = DEFAULT_FORECAST_API_URL)]
    forecast_api_url: Url,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timeout for each request to ViaCEP or Open-Meteo, in milliseconds. By default
    /// requests have no timeout.
    #[clap(long)]
    timeout_millis: Option<u64>,

    /// Address to bind to.
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = CepWeatherApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let mut builder = Client::builder();
    if let Some(millis) = opts.timeout_millis {
        builder = builder.timeout(Duration::from_millis(millis));
    }

    let http_client = builder.build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    // Clients share one connection pool
    let context = Arc::new(RequestContext::new(
        PostalClient::new(http_client.clone(), opts.postal_api_url.clone()),
        GeocodingClient::new(http_client.clone(), opts.geocoding_api_url.clone()),
        ForecastClient::new(http_client, opts.forecast_api_url.clone()),
    ));

    let app = cep_weather::http::router(context);
    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    tracing::info!(
        message = "server started",
        address = %opts.bind,
        postal_api_url = %opts.postal_api_url,
        geocoding_api_url = %opts.geocoding_api_url,
        forecast_api_url = %opts.forecast_api_url,
    );

    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
