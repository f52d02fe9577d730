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

use serde::{Serialize, Serializer};

const FAHRENHEIT_SCALE: f64 = 1.8;
const FAHRENHEIT_OFFSET: f64 = 32.0;
// Whole degrees, not 273.15. Existing consumers depend on this offset.
const KELVIN_OFFSET: f64 = 273.0;

/// Current temperature in each supported unit, as returned by `/tempo`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TemperatureResponse {
    #[serde(rename = "temp_C", serialize_with = "compact_float")]
    pub celsius: f64,
    #[serde(rename = "temp_F", serialize_with = "compact_float")]
    pub fahrenheit: f64,
    #[serde(rename = "temp_K", serialize_with = "compact_float")]
    pub kelvin: f64,
}

/// Convert a temperature in celsius to celsius, fahrenheit, and kelvin.
pub fn convert(celsius: f64) -> TemperatureResponse {
    TemperatureResponse {
        celsius,
        fahrenheit: celsius * FAHRENHEIT_SCALE + FAHRENHEIT_OFFSET,
        kelvin: celsius + KELVIN_OFFSET,
    }
}

/// Write whole numbers as JSON integers (`25` instead of `25.0`), anything else
/// as a regular float.
fn compact_float<S>(v: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    // Negative zero has no integer form, keep the sign as `-0.0`.
    let negative_zero = *v == 0.0 && v.is_sign_negative();
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_EXACT && !negative_zero {
        serializer.serialize_i64(*v as i64)
    } else {
        serializer.serialize_f64(*v)
    }
}

#[cfg(test)]
mod tests {
    use super::{convert, TemperatureResponse};

    #[test]
    fn test_convert_freezing() {
        assert_eq!(
            TemperatureResponse {
                celsius: 0.0,
                fahrenheit: 32.0,
                kelvin: 273.0
            },
            convert(0.0)
        );
    }

    #[test]
    fn test_convert_boiling() {
        assert_eq!(
            TemperatureResponse {
                celsius: 100.0,
                fahrenheit: 212.0,
                kelvin: 373.0
            },
            convert(100.0)
        );
    }

    #[test]
    fn test_convert_scales_cross() {
        assert_eq!(
            TemperatureResponse {
                celsius: -40.0,
                fahrenheit: -40.0,
                kelvin: 233.0
            },
            convert(-40.0)
        );
    }

    #[test]
    fn test_serialize_whole_numbers_as_integers() {
        let body = serde_json::to_string(&convert(25.0)).unwrap();
        assert_eq!(r#"{"temp_C":25,"temp_F":77,"temp_K":298}"#, body);
    }

    #[test]
    fn test_serialize_negative_zero_keeps_sign() {
        let body = serde_json::to_string(&convert(-0.0)).unwrap();
        assert_eq!(r#"{"temp_C":-0.0,"temp_F":32,"temp_K":273}"#, body);
    }

    #[test]
    fn test_serialize_fractional() {
        let body = serde_json::to_string(&convert(21.5)).unwrap();
        assert_eq!(r#"{"temp_C":21.5,"temp_F":70.7,"temp_K":294.5}"#, body);
    }
}
