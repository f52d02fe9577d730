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

use std::fmt;

const CEP_LENGTH: usize = 8;

/// Return true if `code` is exactly eight ASCII decimal digits.
///
/// Separators (`01310-100`), surrounding whitespace, and non-ASCII digits are
/// all rejected.
pub fn is_valid_cep(code: &str) -> bool {
    code.len() == CEP_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// A postal code that has passed `is_valid_cep`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostalCode(String);

impl PostalCode {
    pub fn parse(code: &str) -> Option<Self> {
        if is_valid_cep(code) {
            Some(PostalCode(code.to_owned()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
