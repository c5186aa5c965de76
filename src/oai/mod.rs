pub mod provider;
pub mod repository;
pub mod xml;

pub use provider::{OaiProvider, OaiRequest};
pub use repository::{
    oai_identifier, parse_identifier, Contributor, MetadataFormat, OaiIdentifier, OaiRecord, OaiRepository, OaiSet,
};

use thiserror::Error;

use crate::services::ServiceError;

/// Protocol errors rendered as `<error code="...">`, plus internal failures
#[derive(Debug, Error)]
pub enum OaiError {
    #[error("{0}")]
    BadVerb(String),

    #[error("{0}")]
    BadArgument(String),

    #[error("The metadata format '{0}' is not supported by this repository")]
    CannotDisseminateFormat(String),

    #[error("No matching identifier: {0}")]
    IdDoesNotExist(String),

    #[error("No records match the request")]
    NoRecordsMatch,

    #[error("Resumption tokens are not supported")]
    BadResumptionToken,

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("XML error: {0}")]
    Xml(String),
}

impl OaiError {
    /// OAI-PMH error code, or `None` for internal failures
    pub fn code(&self) -> Option<&'static str> {
        match self {
            OaiError::BadVerb(_) => Some("badVerb"),
            OaiError::BadArgument(_) => Some("badArgument"),
            OaiError::CannotDisseminateFormat(_) => Some("cannotDisseminateFormat"),
            OaiError::IdDoesNotExist(_) => Some("idDoesNotExist"),
            OaiError::NoRecordsMatch => Some("noRecordsMatch"),
            OaiError::BadResumptionToken => Some("badResumptionToken"),
            OaiError::Service(_) | OaiError::Xml(_) => None,
        }
    }
}
