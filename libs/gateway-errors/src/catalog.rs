//! Static error catalog: failure kind -> status, title and wire code.
use std::fmt;

use http::StatusCode;

/// Fixed set of failure kinds understood by the error mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    NotFound,
    MissingField,
    MissingParameter,
    InvalidParameter,
    InvalidEnumValue,
    TypeMismatch,
    Unauthorized,
    Conflict,
    BackendUnavailable,
    Internal,
}

/// Static error definition from the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    /// Value of the `kind` field in error bodies.
    pub code: &'static str,
}

impl FailureKind {
    pub const ALL: [FailureKind; 10] = [
        FailureKind::NotFound,
        FailureKind::MissingField,
        FailureKind::MissingParameter,
        FailureKind::InvalidParameter,
        FailureKind::InvalidEnumValue,
        FailureKind::TypeMismatch,
        FailureKind::Unauthorized,
        FailureKind::Conflict,
        FailureKind::BackendUnavailable,
        FailureKind::Internal,
    ];

    /// Get the error definition for this kind
    pub const fn def(&self) -> ErrDef {
        match self {
            FailureKind::NotFound => ErrDef {
                status: 404,
                title: "Not Found",
                code: "NotFound",
            },
            FailureKind::MissingField => ErrDef {
                status: 400,
                title: "Missing Field",
                code: "MissingField",
            },
            FailureKind::MissingParameter => ErrDef {
                status: 400,
                title: "Missing Parameter",
                code: "MissingParameter",
            },
            FailureKind::InvalidParameter => ErrDef {
                status: 400,
                title: "Invalid Parameter",
                code: "InvalidParameter",
            },
            FailureKind::InvalidEnumValue => ErrDef {
                status: 400,
                title: "Invalid Enum Value",
                code: "InvalidEnumValue",
            },
            FailureKind::TypeMismatch => ErrDef {
                status: 400,
                title: "Type Mismatch",
                code: "TypeMismatch",
            },
            FailureKind::Unauthorized => ErrDef {
                status: 401,
                title: "Unauthorized",
                code: "Unauthorized",
            },
            FailureKind::Conflict => ErrDef {
                status: 409,
                title: "Conflict",
                code: "Conflict",
            },
            FailureKind::BackendUnavailable => ErrDef {
                status: 503,
                title: "Backend Unavailable",
                code: "BackendUnavailable",
            },
            FailureKind::Internal => ErrDef {
                status: 500,
                title: "Internal Server Error",
                code: "Internal",
            },
        }
    }

    /// Get the HTTP status code for this kind
    pub const fn status(&self) -> u16 {
        self.def().status
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub const fn as_str(&self) -> &'static str {
        self.def().code
    }

    /// Client-input kinds: always 4xx and always name the offending field or parameter.
    pub const fn is_client_input(&self) -> bool {
        matches!(
            self,
            FailureKind::MissingField
                | FailureKind::MissingParameter
                | FailureKind::InvalidParameter
                | FailureKind::InvalidEnumValue
                | FailureKind::TypeMismatch
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn statuses_follow_the_mapping_table() {
        assert_eq!(FailureKind::NotFound.status(), 404);
        for kind in [
            FailureKind::MissingField,
            FailureKind::MissingParameter,
            FailureKind::InvalidParameter,
            FailureKind::InvalidEnumValue,
            FailureKind::TypeMismatch,
        ] {
            assert_eq!(kind.status(), 400, "{kind} should be a 400");
            assert!(kind.is_client_input());
        }
        assert_eq!(FailureKind::Unauthorized.status(), 401);
        assert_eq!(FailureKind::Conflict.status(), 409);
        assert_eq!(FailureKind::BackendUnavailable.status(), 503);
        assert_eq!(FailureKind::Internal.status(), 500);
    }

    #[test]
    fn only_input_validation_counts_as_client_input() {
        let client: Vec<_> = FailureKind::ALL
            .into_iter()
            .filter(FailureKind::is_client_input)
            .collect();
        assert_eq!(client.len(), 5);
        assert!(!FailureKind::NotFound.is_client_input());
        assert!(!FailureKind::Unauthorized.is_client_input());
        assert!(!FailureKind::Conflict.is_client_input());
    }

    #[test]
    fn every_kind_has_a_distinct_code_and_valid_status() {
        let mut codes = HashSet::new();
        for kind in FailureKind::ALL {
            let def = kind.def();
            assert!((400..=599).contains(&def.status), "bad status for {kind}");
            assert!(!def.title.trim().is_empty());
            assert!(codes.insert(def.code), "duplicate code {}", def.code);
            assert_eq!(kind.status_code().as_u16(), def.status);
        }
        assert_eq!(codes.len(), FailureKind::ALL.len());
    }
}
