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

//! Current temperature lookup by Brazilian postal code
//!
//! ## Features
//!
//! `cep_weather` is an HTTP service that takes a Brazilian postal code ([CEP]), finds the
//! city it belongs to using [ViaCEP], finds the coordinates of that city using the
//! [Open-Meteo geocoding API] and returns the current temperature there, from the
//! [Open-Meteo forecast API], in celsius, fahrenheit, and kelvin.
//!
//! [CEP]: https://en.wikipedia.org/wiki/C%C3%B3digo_de_Endere%C3%A7amento_Postal
//! [ViaCEP]: https://viacep.com.br/
//! [Open-Meteo geocoding API]: https://open-meteo.com/en/docs/geocoding-api
//! [Open-Meteo forecast API]: https://open-meteo.com/en/docs
//!
//! ## Build
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ```text
//! ./cep_weather --bind 0.0.0.0:8080
//! curl -sS 'http://localhost:8080/tempo?cep=01310100'
//! {"temp_C":25,"temp_F":77,"temp_K":298}
//! ```
//!
//! Responses:
//!
//! * `200` - JSON body with `temp_C`, `temp_F`, and `temp_K`.
//! * `422` - The `cep` parameter is missing or is not exactly eight digits.
//! * `404` - The postal code doesn't exist (or the path isn't `/tempo`).
//! * `500` - The city couldn't be geocoded or the weather request failed.
//!
//! Kelvin is computed as celsius + 273, not 273.15.
//!
//! ### Prometheus
//!
//! Metrics about responses and requests made to ViaCEP and Open-Meteo are exposed at
//! `/metrics` on the same port.
//!
//! * `cep_weather_responses_total{status=$STATUS}` - `/tempo` responses by HTTP status.
//! * `cep_weather_upstream_request_duration_seconds{collaborator=$NAME, result=$RESULT}` -
//!   Duration of requests to `postal`, `geocoding`, and `forecast` services.
//!

pub mod client;
pub mod convert;
pub mod http;
pub mod metrics;
pub mod validate;
