//! Cenote records as OAI-PMH items.
//!
//! Everything here reads through [`CenoteService`] as an anonymous caller, so
//! only touristic cenotes are ever disseminated.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::database::models::Cenote;
use crate::database::CollectionName;
use crate::services::{CenoteService, ServiceError};

pub const IDENTIFIER_SCHEME: &str = "oai";
pub const REPOSITORY_IDENTIFIER: &str = "cenoteando.org";

pub const PUBLISHER: &str = "Cenoteando, Facultad de Ciencias, UNAM (cenoteando.mx)";
pub const PUBLICATION_YEAR: &str = "2021";
pub const CREATOR_NAME: &str = "Fernando Nuno Dias Marques Simoes";
pub const CREATOR_IDENTIFIER: &str = "info:eu-repo/dai/mx/cvu/208814";
pub const DESCRIPTION: &str = "Registro de informacion general multidisciplinaria de cenotes de la peninsula de \
     yucatan, proveniente de la base de datos de cenoteando.mx";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetadataFormat {
    pub prefix: &'static str,
    pub schema: &'static str,
    pub namespace: &'static str,
}

pub const METADATA_FORMAT_DC: MetadataFormat = MetadataFormat {
    prefix: "oai_dc",
    schema: "http://www.openarchives.org/OAI/2.0/oai_dc.xsd",
    namespace: "http://www.openarchives.org/OAI/2.0/oai_dc/",
};

pub const METADATA_FORMAT_DATACITE: MetadataFormat = MetadataFormat {
    prefix: "oai_datacite",
    schema: "http://schema.datacite.org/meta/kernel-3/metadata.xsd",
    namespace: "http://datacite.org/schema/kernel-3",
};

pub const METADATA_FORMATS: [MetadataFormat; 2] = [METADATA_FORMAT_DC, METADATA_FORMAT_DATACITE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OaiSet {
    pub spec: &'static str,
    pub name: &'static str,
}

pub const SETS: [OaiSet; 1] = [OaiSet {
    spec: "openaire_data",
    name: "openaire_data",
}];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Contributor {
    #[serde(rename = "type")]
    pub contributor_type: &'static str,
    pub name: &'static str,
    pub id: &'static str,
}

const fn contributor(contributor_type: &'static str, name: &'static str, id: &'static str) -> Contributor {
    Contributor {
        contributor_type,
        name,
        id,
    }
}

pub const CONTRIBUTORS: [Contributor; 10] = [
    contributor("DataCollector", "Luis Arturo Liévano-Beltrán", "info:eu-repo/dai/mx/orcid/0000-0003-0073-9203"),
    contributor("DataCollector", "Efrain Miguel Chavez Solis", "info:eu-repo/dai/mx/orcid/0000-0001-9423-9335"),
    contributor("DataCollector", "Dorottya Angyal", "info:eu-repo/dai/mx/orcid/0000-0002-2380-2482"),
    contributor("DataCollector", "Nori Velazquez Juarez", "info:eu-repo/dai/mx/curp/VEJN950421MDFLRR05"),
    contributor("DataCurator", "Ricardo Merlos Riestra", "info:eu-repo/dai/mx/curp/MERR880417HDFRSC06"),
    contributor("DataManager", "Isaac Chacon Gomez", "info:eu-repo/dai/mx/curp/CAGI831107HDFHMS04"),
    contributor("ProjectMember", "Diogo Seca Repas Gonçalves", "info:eu-repo/dai/mx/orcid/0000-0003-4983-0032"),
    contributor("ProjectMember", "Luis Angel Yerbes Rodriguez", "info:eu-repo/dai/mx/curp/YERL961125HYNRDS09"),
    contributor("ProjectMember", "Charly Joan Llanes Euan", "info:eu-repo/dai/mx/curp/LAEC930819HYNLNH07"),
    contributor("Researcher", "Maite Mascaro", "info:eu-repo/dai/mx/orcid/0000-0003-3614-4383"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OaiIdentifier {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OaiRecord {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub title: String,
    pub creator_name: &'static str,
    pub creator_identifier: &'static str,
    pub publisher: &'static str,
    pub publication_year: &'static str,
    pub contributors: &'static [Contributor],
    /// When the record was generated
    pub date: DateTime<Utc>,
    pub description: &'static str,
    /// `"lat lon"`
    pub geo_location_point: Option<String>,
}

impl OaiRecord {
    pub fn header(&self) -> OaiIdentifier {
        OaiIdentifier {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<&Cenote> for OaiRecord {
    fn from(cenote: &Cenote) -> Self {
        Self {
            id: oai_identifier(&cenote.key),
            created_at: cenote.created_at,
            updated_at: cenote.updated_at,
            title: cenote.name.clone(),
            creator_name: CREATOR_NAME,
            creator_identifier: CREATOR_IDENTIFIER,
            publisher: PUBLISHER,
            publication_year: PUBLICATION_YEAR,
            contributors: &CONTRIBUTORS,
            date: Utc::now(),
            description: DESCRIPTION,
            geo_location_point: cenote.geolocation_point(),
        }
    }
}

/// `oai:cenoteando.org:Cenotes/<key>`
pub fn oai_identifier(key: &str) -> String {
    format!(
        "{}:{}:{}",
        IDENTIFIER_SCHEME,
        REPOSITORY_IDENTIFIER,
        CollectionName::Cenotes.document_id(key)
    )
}

/// Cenote key of a well-formed identifier
pub fn parse_identifier(identifier: &str) -> Option<&str> {
    let segments: Vec<&str> = identifier.split(':').collect();
    let (scheme, namespace, id) = match segments.as_slice() {
        [scheme, namespace, id] => (*scheme, *namespace, *id),
        _ => return None,
    };
    if scheme != IDENTIFIER_SCHEME || namespace != REPOSITORY_IDENTIFIER {
        return None;
    }

    let parts: Vec<&str> = id.split('/').collect();
    match parts.as_slice() {
        [collection, key] if *collection == CollectionName::Cenotes.id_prefix() && !key.is_empty() => Some(*key),
        _ => None,
    }
}

/// Data source behind the OAI-PMH provider
#[derive(Clone)]
pub struct OaiRepository {
    cenotes: CenoteService,
}

impl OaiRepository {
    pub const SET_SUPPORT: bool = true;
    pub const RESUMPTION_SUPPORT: bool = false;

    pub fn new(cenotes: CenoteService) -> Self {
        Self { cenotes }
    }

    /// `None` for malformed identifiers and for cenotes that are absent or not public
    pub async fn get_record(&self, identifier: &str) -> Result<Option<OaiRecord>, ServiceError> {
        let Some(key) = parse_identifier(identifier) else {
            return Ok(None);
        };
        let cenote = self.cenotes.find(&AuthUser::Anonymous, key).await?;
        Ok(cenote.as_ref().map(OaiRecord::from))
    }

    /// Every public cenote; there is no paging
    pub async fn get_identifiers(&self) -> Result<Vec<OaiIdentifier>, ServiceError> {
        let cenotes = self.cenotes.list_all(&AuthUser::Anonymous).await?;
        Ok(cenotes
            .iter()
            .map(|c| OaiIdentifier {
                id: oai_identifier(&c.key),
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect())
    }

    pub async fn get_records(&self) -> Result<Vec<OaiRecord>, ServiceError> {
        let cenotes = self.cenotes.list_all(&AuthUser::Anonymous).await?;
        Ok(cenotes.iter().map(OaiRecord::from).collect())
    }

    pub fn get_metadata_formats(&self) -> &'static [MetadataFormat] {
        &METADATA_FORMATS
    }

    pub fn get_sets(&self) -> &'static [OaiSet] {
        &SETS
    }

    pub fn metadata_format(prefix: &str) -> Option<MetadataFormat> {
        METADATA_FORMATS.iter().copied().find(|f| f.prefix == prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    #[test]
    fn parses_only_well_formed_identifiers() {
        assert_eq!(parse_identifier("oai:cenoteando.org:Cenotes/42"), Some("42"));
        assert_eq!(parse_identifier(&oai_identifier("abc")), Some("abc"));

        for bad in [
            "",
            "oai:cenoteando.org",
            "oai:cenoteando.org:Cenotes/42:extra",
            "oai:example.org:Cenotes/42",
            "urn:cenoteando.org:Cenotes/42",
            "oai:cenoteando.org:Species/42",
            "oai:cenoteando.org:Cenotes/42/x",
            "oai:cenoteando.org:Cenotes/",
            "oai:cenoteando.org:42",
        ] {
            assert_eq!(parse_identifier(bad), None, "{bad}");
        }
    }

    async fn repository() -> (TestContext, OaiRepository) {
        let ctx = TestContext::new();
        ctx.seed_cenote("c1", "Dos Ojos", true).await;
        ctx.seed_cenote("c2", "Closed", false).await;
        ctx.seed_cenote("c3", "Ik Kil", true).await;
        let repo = OaiRepository::new(ctx.services.cenotes.clone());
        (ctx, repo)
    }

    #[tokio::test]
    async fn get_record_returns_none_instead_of_errors() {
        let (_ctx, repo) = repository().await;

        let record = repo.get_record("oai:cenoteando.org:Cenotes/c1").await.unwrap().unwrap();
        assert_eq!(record.title, "Dos Ojos");
        assert_eq!(record.contributors.len(), 10);
        assert_eq!(record.geo_location_point.as_deref(), Some("20.6296 -87.0739"));
        assert_ne!(record.created_at, record.updated_at);

        assert!(repo.get_record("oai:cenoteando.org:Cenotes/c2").await.unwrap().is_none());
        assert!(repo.get_record("oai:cenoteando.org:Cenotes/zz").await.unwrap().is_none());
        assert!(repo.get_record("garbage").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_cover_every_public_cenote() {
        let (_ctx, repo) = repository().await;
        let ids: Vec<_> = repo.get_identifiers().await.unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["oai:cenoteando.org:Cenotes/c1", "oai:cenoteando.org:Cenotes/c3"]);
        assert_eq!(repo.get_records().await.unwrap().len(), 2);

        assert_eq!(repo.get_sets()[0].spec, "openaire_data");
        let prefixes: Vec<_> = repo.get_metadata_formats().iter().map(|f| f.prefix).collect();
        assert_eq!(prefixes, vec!["oai_dc", "oai_datacite"]);
        assert!(!OaiRepository::RESUMPTION_SUPPORT);
    }
}
