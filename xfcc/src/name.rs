//! Distinguished-name record built from a `Subject` field value.
//!
//! The subject string is a comma-separated list of RDN components
//! (`CN=hello,OU=hello,O=Acme\, Inc.`). The component key set is closed;
//! anything outside it is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, SemanticError};
use crate::parser::FieldGroup;

/// The subject of a client certificate, as carried in the header.
///
/// Multi-valued attributes keep their order of appearance. `common_name` and
/// `serial_number` are single-valued; a repeated component overwrites the
/// earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    pub country: Vec<String>,
    pub organization: Vec<String>,
    pub organizational_unit: Vec<String>,
    pub common_name: String,
    pub serial_number: String,
    pub locality: Vec<String>,
    pub province: Vec<String>,
    pub street_address: Vec<String>,
    pub postal_code: Vec<String>,
}

impl DistinguishedName {
    pub(crate) fn from_fields(fields: FieldGroup) -> Result<Self, Error> {
        let mut name = DistinguishedName::default();
        for field in fields {
            let value = field.value.unwrap_or_default();
            match field.key.as_str() {
                "C" => name.country.push(value),
                "O" => name.organization.push(value),
                "OU" => name.organizational_unit.push(value),
                "CN" => name.common_name = value,
                "SERIALNUMBER" => name.serial_number = value,
                "L" => name.locality.push(value),
                "ST" => name.province.push(value),
                "STREET" => name.street_address.push(value),
                "POSTALCODE" => name.postal_code.push(value),
                _ => {
                    return Err(SemanticError::UnknownSubjectComponent(field.key.clone()).into());
                }
            }
        }
        Ok(name)
    }
}

impl fmt::Display for DistinguishedName {
    /// Serialize back into subject-string form. Components come out in a
    /// fixed key order with multi-valued attributes in insertion order, so a
    /// reparse reproduces the same name.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut components = Vec::new();
        for value in &self.country {
            components.push(format!("C={}", escape_component(value)));
        }
        for value in &self.organization {
            components.push(format!("O={}", escape_component(value)));
        }
        for value in &self.organizational_unit {
            components.push(format!("OU={}", escape_component(value)));
        }
        if !self.common_name.is_empty() {
            components.push(format!("CN={}", escape_component(&self.common_name)));
        }
        if !self.serial_number.is_empty() {
            components.push(format!("SERIALNUMBER={}", escape_component(&self.serial_number)));
        }
        for value in &self.locality {
            components.push(format!("L={}", escape_component(value)));
        }
        for value in &self.province {
            components.push(format!("ST={}", escape_component(value)));
        }
        for value in &self.street_address {
            components.push(format!("STREET={}", escape_component(value)));
        }
        for value in &self.postal_code {
            components.push(format!("POSTALCODE={}", escape_component(value)));
        }
        write!(f, "{}", components.join(","))
    }
}

// Only `\` and `,` are escaped: those two escapes survive both standalone
// subject parsing and re-parsing after being embedded in a quoted header
// value. Values containing `=`, `;` or `"` have no serialized form in this
// grammar.
fn escape_component(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == ',' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
