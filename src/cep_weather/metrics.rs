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

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue, LabelValueEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::fmt::{self, Write};
use std::time::Duration;

/// External service called while resolving a temperature.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Collaborator {
    Postal,
    Geocoding,
    Forecast,
}

impl Collaborator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postal => "postal",
            Self::Geocoding => "geocoding",
            Self::Forecast => "forecast",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EncodeLabelValue for Collaborator {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), fmt::Error> {
        encoder.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ResponseLabels {
    status: String,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct UpstreamLabels {
    collaborator: Collaborator,
    result: String,
}

/// Holder for metrics about `/tempo` responses and the outbound requests made to serve them.
///
/// All metrics are created and registered upon call to `TemperatureMetrics::new()`. Names
/// are prefixed with whatever prefix the provided `Registry` was created with.
#[derive(Debug, Clone)]
pub struct TemperatureMetrics {
    responses: Family<ResponseLabels, Counter>,
    upstream_seconds: Family<UpstreamLabels, Histogram>,
}

impl TemperatureMetrics {
    pub fn new(reg: &mut Registry) -> Self {
        let responses = Family::<ResponseLabels, Counter>::default();
        let upstream_seconds = Family::<UpstreamLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.01, 2.0, 12))
        });

        reg.register("responses", "Temperature responses by HTTP status", responses.clone());
        reg.register(
            "upstream_request_duration_seconds",
            "Time spent on requests to external services",
            upstream_seconds.clone(),
        );

        Self {
            responses,
            upstream_seconds,
        }
    }

    /// Count a response sent with the given HTTP status code.
    pub fn response(&self, status: u16) {
        self.responses
            .get_or_create(&ResponseLabels {
                status: status.to_string(),
            })
            .inc();
    }

    /// Record how long a request to `collaborator` took and whether it succeeded.
    pub fn upstream(&self, collaborator: Collaborator, success: bool, elapsed: Duration) {
        let result = if success { "success" } else { "failure" };
        self.upstream_seconds
            .get_or_create(&UpstreamLabels {
                collaborator,
                result: result.to_owned(),
            })
            .observe(elapsed.as_secs_f64());
    }
}
