//! Parser for the `x-forwarded-client-cert` (XFCC) header.
//!
//! Proxies such as Envoy forward metadata about the TLS certificates a
//! client presented in a single structured header: a comma-separated list of
//! certificate groups, each a semicolon-separated list of `Key=Value`
//! fields, with quoting and backslash escaping for values that contain the
//! separator characters. The `Subject` field nests a second, comma-separated
//! `Key=Value` grammar for the certificate's distinguished name.
//!
//! This crate turns the raw header string into typed records and nothing
//! more: extracting the header from a request and decoding the certificate
//! contents are left to the caller.
//!
//! ```
//! use xfcc::parse_header;
//!
//! let certs = parse_header("Hash=0123;URI=spiffe://mesh/ns/default/sa/web").unwrap();
//! assert_eq!(certs[0].hash, "0123");
//! assert_eq!(certs[0].uri, vec!["spiffe://mesh/ns/default/sa/web"]);
//! ```

#![forbid(unsafe_code)]

pub mod error;
mod lexer;
mod name;
mod parser;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SemanticError;
use crate::parser::{FieldGroup, Parser};

pub use crate::error::Error;
pub use crate::name::DistinguishedName;

/// Name of the HTTP header this crate parses. Extracting the header value
/// from request metadata is the caller's job.
pub const FORWARDED_CLIENT_CERT_HEADER: &str = "x-forwarded-client-cert";

/// Metadata about one client certificate, built from one field group of the
/// header.
///
/// Single-valued fields default to the empty string when absent; `uri` and
/// `dns` collect every occurrence in order. `subject_raw` keeps the
/// unparsed `Subject` value alongside the parsed name, and is overwritten
/// together with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCert {
    pub by: String,
    pub hash: String,
    pub cert: String,
    pub chain: String,
    pub subject: Option<DistinguishedName>,
    pub subject_raw: String,
    pub uri: Vec<String>,
    pub dns: Vec<String>,
}

impl fmt::Display for ClientCert {
    /// Serialize back into one header field group. Empty single-valued
    /// fields are omitted; the subject is rendered quoted, which is what
    /// lets its internal `\,` and `\\` escapes survive a reparse.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::new();
        if !self.by.is_empty() {
            fields.push(format!("By={}", escape_value(&self.by)));
        }
        if !self.hash.is_empty() {
            fields.push(format!("Hash={}", escape_value(&self.hash)));
        }
        if !self.cert.is_empty() {
            fields.push(format!("Cert={}", escape_value(&self.cert)));
        }
        if !self.chain.is_empty() {
            fields.push(format!("Chain={}", escape_value(&self.chain)));
        }
        if !self.subject_raw.is_empty() {
            fields.push(format!("Subject=\"{}\"", self.subject_raw));
        } else if let Some(subject) = &self.subject {
            fields.push(format!("Subject=\"{subject}\""));
        }
        for uri in &self.uri {
            fields.push(format!("URI={}", escape_value(uri)));
        }
        for dns in &self.dns {
            fields.push(format!("DNS={}", escape_value(dns)));
        }
        if fields.is_empty() {
            // An all-empty record has no field of its own, but an empty
            // group is not parseable; `Hash=` reparses to the same record.
            return write!(f, "Hash=");
        }
        write!(f, "{}", fields.join(";"))
    }
}

/// Parse a full `x-forwarded-client-cert` header value into one record per
/// certificate group.
///
/// An empty header yields an empty list. Any error aborts the whole parse;
/// there is no partial result.
pub fn parse_header(header: &str) -> Result<Vec<ClientCert>, Error> {
    if header.is_empty() {
        return Ok(Vec::new());
    }

    let groups = Parser::new(header).parse_groups()?;
    let mut certs = Vec::with_capacity(groups.len());
    for (index, group) in groups.into_iter().enumerate() {
        certs.push(client_cert_from_fields(index, group)?);
    }
    Ok(certs)
}

/// Parse a subject string, either standalone or as extracted from a
/// `Subject` field.
///
/// An empty subject is `None`, not an empty name.
pub fn parse_subject(subject: &str) -> Result<Option<DistinguishedName>, Error> {
    if subject.is_empty() {
        return Ok(None);
    }

    let fields = Parser::new(subject).parse_subject_group()?;
    DistinguishedName::from_fields(fields).map(Some)
}

/// Serialize records back into a header value, the dual of [`parse_header`].
pub fn format_header(certs: &[ClientCert]) -> String {
    certs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn client_cert_from_fields(index: usize, fields: FieldGroup) -> Result<ClientCert, Error> {
    let mut cert = ClientCert::default();
    for field in fields {
        let value = field.value.unwrap_or_default();
        match field.key.as_str() {
            "By" => cert.by = value,
            "Hash" => cert.hash = value,
            "Cert" => cert.cert = value,
            "Chain" => cert.chain = value,
            "Subject" => {
                cert.subject = parse_subject(&value).map_err(|err| SemanticError::InvalidSubject {
                    index,
                    source: Box::new(err),
                })?;
                cert.subject_raw = value;
            }
            "URI" => cert.uri.push(value),
            "DNS" => cert.dns.push(value),
            _ => {
                return Err(SemanticError::UnknownField {
                    index,
                    key: field.key.clone(),
                }
                .into());
            }
        }
    }
    Ok(cert)
}

// Unquoted serialization: escape the backslash and every separator so the
// value lexes back as a single string token.
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || lexer::is_separator(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        ClientCert, DistinguishedName, Error, format_header, parse_header, parse_subject,
    };
    use crate::error::SemanticError;

    const FULL_HEADER: &str = concat!(
        r#"Hash=hash;Cert="-----BEGIN%20CERTIFICATE-----%0cert%0A-----END%20CERTIFICATE-----%0A";"#,
        r#"Subject="CN=hello,OU=hello,O=Acme\, Inc.";DNS=hello.west.example.com;DNS=hello.east.example.com,"#,
        r#"By=spiffe://mesh.example.com/ns/hellons/sa/hellosa;Hash=again;Subject="";"#,
        r#"URI=spiffe://mesh.example.com/ns/otherns/sa/othersa;URI=spiffe://mesh.example.com/ns/otherns/sa2/othersa2"#,
    );

    fn full_header_certs() -> Vec<ClientCert> {
        vec![
            ClientCert {
                hash: "hash".to_string(),
                cert: "-----BEGIN%20CERTIFICATE-----%0cert%0A-----END%20CERTIFICATE-----%0A"
                    .to_string(),
                subject: Some(DistinguishedName {
                    common_name: "hello".to_string(),
                    organizational_unit: vec!["hello".to_string()],
                    organization: vec!["Acme, Inc.".to_string()],
                    ..Default::default()
                }),
                subject_raw: r"CN=hello,OU=hello,O=Acme\, Inc.".to_string(),
                dns: vec![
                    "hello.west.example.com".to_string(),
                    "hello.east.example.com".to_string(),
                ],
                ..Default::default()
            },
            ClientCert {
                hash: "again".to_string(),
                by: "spiffe://mesh.example.com/ns/hellons/sa/hellosa".to_string(),
                uri: vec![
                    "spiffe://mesh.example.com/ns/otherns/sa/othersa".to_string(),
                    "spiffe://mesh.example.com/ns/otherns/sa2/othersa2".to_string(),
                ],
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_parse_header_empty() {
        assert_eq!(Vec::<ClientCert>::new(), parse_header("").unwrap());
    }

    #[test]
    fn test_parse_header_full() {
        assert_eq!(full_header_certs(), parse_header(FULL_HEADER).unwrap());
    }

    #[rstest(
        header,
        expected,
        // value absence maps to the empty string
        case("Hash=", vec![ClientCert::default()]),
        // last write wins for single-valued fields
        case("Hash=h1;Hash=h2", vec![ClientCert {
            hash: "h2".to_string(),
            ..Default::default()
        }]),
        // multi-valued fields accumulate within one group
        case("Hash=h;URI=u1;URI=u2", vec![ClientCert {
            hash: "h".to_string(),
            uri: vec!["u1".to_string(), "u2".to_string()],
            ..Default::default()
        }]),
        // an escaped comma inside a quoted subject does not split groups
        case(r#"Subject="O=Acme\, Inc.""#, vec![ClientCert {
            subject: Some(DistinguishedName {
                organization: vec!["Acme, Inc.".to_string()],
                ..Default::default()
            }),
            subject_raw: r"O=Acme\, Inc.".to_string(),
            ..Default::default()
        }]),
        // an empty subject value clears the subject
        case(r#"Subject="";Hash=h"#, vec![ClientCert {
            hash: "h".to_string(),
            ..Default::default()
        }]),
        case(
            concat!(
                r#"Hash=hash;Cert="CERTDATA";Subject="CN=hello,OU=hello,O=Acme\, Inc.";"#,
                r"DNS=a.example.com;DNS=b.example.com,By=spiffe://x;Hash=again;URI=spiffe://y",
            ),
            vec![
                ClientCert {
                    hash: "hash".to_string(),
                    cert: "CERTDATA".to_string(),
                    subject: Some(DistinguishedName {
                        common_name: "hello".to_string(),
                        organizational_unit: vec!["hello".to_string()],
                        organization: vec!["Acme, Inc.".to_string()],
                        ..Default::default()
                    }),
                    subject_raw: r"CN=hello,OU=hello,O=Acme\, Inc.".to_string(),
                    dns: vec!["a.example.com".to_string(), "b.example.com".to_string()],
                    ..Default::default()
                },
                ClientCert {
                    by: "spiffe://x".to_string(),
                    hash: "again".to_string(),
                    uri: vec!["spiffe://y".to_string()],
                    ..Default::default()
                },
            ],
        ),
        case("By=spiffe://x,By=spiffe://y", vec![
            ClientCert {
                by: "spiffe://x".to_string(),
                ..Default::default()
            },
            ClientCert {
                by: "spiffe://y".to_string(),
                ..Default::default()
            },
        ]),
    )]
    fn test_parse_header(header: &str, expected: Vec<ClientCert>) {
        assert_eq!(expected, parse_header(header).unwrap());
    }

    #[rstest(
        header,
        case::bare_key("Hash"),
        case::bare_key_after_field("Hash=;Hash"),
        case::separators_only(","),
    )]
    fn test_parse_header_grammar_error(header: &str) {
        let err = parse_header(header).unwrap_err();
        assert!(matches!(err, Error::Grammar(_)), "got {err:?}");
    }

    #[rstest(
        header,
        case::unterminated_quote(r#"Hash="h"#),
        case::unterminated_escape(r"Hash=h\"),
        case::invalid_escape(r"Hash=\h"),
    )]
    fn test_parse_header_lex_error(header: &str) {
        let err = parse_header(header).unwrap_err();
        assert!(matches!(err, Error::Lex(_)), "got {err:?}");
    }

    #[test]
    fn test_parse_header_unknown_field() {
        assert_eq!(
            Error::Semantic(SemanticError::UnknownField {
                index: 0,
                key: "unknown".to_string(),
            }),
            parse_header("unknown=hello").unwrap_err()
        );
    }

    #[test]
    fn test_parse_header_unknown_field_index() {
        let err = parse_header("Hash=h,unknown=hello").unwrap_err();
        assert_eq!(
            Error::Semantic(SemanticError::UnknownField {
                index: 1,
                key: "unknown".to_string(),
            }),
            err
        );
    }

    #[rstest(
        header,
        index,
        case::bare_subject(r#"Subject="random""#, 0),
        case::unknown_component(r#"Subject="random=hello""#, 0),
        case::second_group(r#"Hash=h,Subject="random""#, 1),
    )]
    fn test_parse_header_invalid_subject(header: &str, index: usize) {
        let err = parse_header(header).unwrap_err();
        match err {
            Error::Semantic(SemanticError::InvalidSubject { index: actual, .. }) => {
                assert_eq!(index, actual);
            }
            other => panic!("expected invalid subject, got {other:?}"),
        }
    }

    #[rstest(
        subject,
        expected,
        case("", None),
        case("C=US,O=Test Inc,CN=test.com", Some(DistinguishedName {
            country: vec!["US".to_string()],
            organization: vec!["Test Inc".to_string()],
            common_name: "test.com".to_string(),
            ..Default::default()
        })),
        // multi-valued components accumulate, CN overwrites
        case("OU=a,OU=b,CN=x,CN=y", Some(DistinguishedName {
            organizational_unit: vec!["a".to_string(), "b".to_string()],
            common_name: "y".to_string(),
            ..Default::default()
        })),
        case(r"O=Acme\, Inc.", Some(DistinguishedName {
            organization: vec!["Acme, Inc.".to_string()],
            ..Default::default()
        })),
        case("ST=Kanagawa,L=Yokohama,STREET=1-2-3,POSTALCODE=231-0001,SERIALNUMBER=42", Some(DistinguishedName {
            province: vec!["Kanagawa".to_string()],
            locality: vec!["Yokohama".to_string()],
            street_address: vec!["1-2-3".to_string()],
            postal_code: vec!["231-0001".to_string()],
            serial_number: "42".to_string(),
            ..Default::default()
        })),
    )]
    fn test_parse_subject(subject: &str, expected: Option<DistinguishedName>) {
        assert_eq!(expected, parse_subject(subject).unwrap());
    }

    #[test]
    fn test_parse_subject_unknown_component() {
        assert_eq!(
            Error::Semantic(SemanticError::UnknownSubjectComponent("unknown".to_string())),
            parse_subject("unknown=hello").unwrap_err()
        );
    }

    #[rstest(subject, case::bare_key("C"), case::wrong_delimiter("CN=x;O=y"))]
    fn test_parse_subject_grammar_error(subject: &str) {
        let err = parse_subject(subject).unwrap_err();
        assert!(matches!(err, Error::Grammar(_)), "got {err:?}");
    }

    #[rstest(
        header,
        case(FULL_HEADER),
        case("Hash=h;URI=u1;URI=u2"),
        case(r#"Subject="O=Acme\, Inc.""#),
        case(r"By=spiffe://x,Hash=again;DNS=a.example.com"),
        // backslash in a quoted subject survives the double round-trip
        case(r#"Subject="CN=with\\slash""#),
        // a group whose only field carries no value still serializes to
        // something parseable
        case("Hash="),
        case("Hash=,By=x"),
        case(r#"By=x,Subject="""#),
    )]
    fn test_header_round_trip(header: &str) {
        let certs = parse_header(header).unwrap();
        let serialized = format_header(&certs);
        assert_eq!(certs, parse_header(&serialized).unwrap());
    }

    #[test]
    fn test_format_header_empty_group() {
        let certs = parse_header("Hash=,By=x").unwrap();
        assert_eq!("Hash=,By=x", format_header(&certs));
        assert_eq!("Hash=", ClientCert::default().to_string());
    }

    #[rstest(
        name,
        case(DistinguishedName {
            common_name: "test.com".to_string(),
            country: vec!["US".to_string(), "JP".to_string()],
            organization: vec!["Acme, Inc.".to_string()],
            ..Default::default()
        }),
        case(DistinguishedName {
            common_name: r"with\slash".to_string(),
            ..Default::default()
        }),
    )]
    fn test_subject_round_trip(name: DistinguishedName) {
        let serialized = name.to_string();
        assert_eq!(Some(name), parse_subject(&serialized).unwrap());
    }
}
