use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use super::repository::{
    MetadataFormat, OaiIdentifier, OaiRecord, OaiRepository, OaiSet, METADATA_FORMAT_DATACITE, SETS,
};
use super::xml::XmlBuilder;
use super::OaiError;
use crate::config::OaiConfig;

const OAI_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/";
const OAI_SCHEMA_LOCATION: &str =
    "http://www.openarchives.org/OAI/2.0/ http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// Query arguments of `GET /oai/request`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OaiRequest {
    pub verb: Option<String>,
    pub identifier: Option<String>,
    pub metadata_prefix: Option<String>,
    pub from: Option<String>,
    pub until: Option<String>,
    pub set: Option<String>,
    pub resumption_token: Option<String>,
}

impl OaiRequest {
    pub fn verb(verb: &str) -> Self {
        Self {
            verb: Some(verb.to_string()),
            ..Default::default()
        }
    }

    fn attributes(&self) -> Vec<(&'static str, &str)> {
        [
            ("verb", &self.verb),
            ("identifier", &self.identifier),
            ("metadataPrefix", &self.metadata_prefix),
            ("from", &self.from),
            ("until", &self.until),
            ("set", &self.set),
            ("resumptionToken", &self.resumption_token),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, OaiError> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OaiError::BadArgument(format!("Missing required argument '{}'", name)))
    }
}

enum Reply {
    Identify,
    MetadataFormats(&'static [MetadataFormat]),
    Sets(&'static [OaiSet]),
    Identifiers(Vec<OaiIdentifier>),
    Records(Vec<OaiRecord>, MetadataFormat),
    Record(Box<OaiRecord>, MetadataFormat),
}

/// OAI-PMH 2.0 verb handling on top of [`OaiRepository`]
#[derive(Clone)]
pub struct OaiProvider {
    repository: OaiRepository,
    config: OaiConfig,
}

impl OaiProvider {
    pub fn new(repository: OaiRepository, config: OaiConfig) -> Self {
        Self { repository, config }
    }

    /// Render the response document. Protocol errors become `<error>` elements;
    /// only internal failures are returned as `Err`.
    pub async fn handle(&self, request: &OaiRequest) -> Result<String, OaiError> {
        let reply = match self.dispatch(request).await {
            Err(err) if err.code().is_none() => return Err(err),
            other => other,
        };
        if let Err(err) = &reply {
            debug!("OAI-PMH {:?} rejected: {}", request.verb, err);
        }
        self.render(request, reply)
    }

    /// Error document for a request whose arguments could not be read at all
    pub fn reject(&self, err: OaiError) -> Result<String, OaiError> {
        self.render(&OaiRequest::default(), Err(err))
    }

    async fn dispatch(&self, request: &OaiRequest) -> Result<Reply, OaiError> {
        let verb = request
            .verb
            .as_deref()
            .ok_or_else(|| OaiError::BadVerb("Missing verb argument".to_string()))?;

        match verb {
            "Identify" => Ok(Reply::Identify),
            "ListMetadataFormats" => {
                if let Some(identifier) = &request.identifier {
                    if self.repository.get_record(identifier).await?.is_none() {
                        return Err(OaiError::IdDoesNotExist(identifier.clone()));
                    }
                }
                Ok(Reply::MetadataFormats(self.repository.get_metadata_formats()))
            }
            "ListSets" => {
                if request.resumption_token.is_some() {
                    return Err(OaiError::BadResumptionToken);
                }
                Ok(Reply::Sets(self.repository.get_sets()))
            }
            "ListIdentifiers" | "ListRecords" => {
                if request.resumption_token.is_some() {
                    return Err(OaiError::BadResumptionToken);
                }
                let format = Self::format(OaiRequest::require(&request.metadata_prefix, "metadataPrefix")?)?;
                let from = request.from.as_deref().map(|d| parse_datestamp(d, false)).transpose()?;
                let until = request.until.as_deref().map(|d| parse_datestamp(d, true)).transpose()?;
                if let (Some(from), Some(until)) = (from, until) {
                    if from > until {
                        return Err(OaiError::BadArgument("'from' must not be later than 'until'".to_string()));
                    }
                }
                if let Some(set) = &request.set {
                    if !SETS.iter().any(|s| s.spec == set.as_str()) {
                        return Err(OaiError::NoRecordsMatch);
                    }
                }
                let in_range = |updated: Option<DateTime<Utc>>| match (from, until, updated) {
                    (None, None, _) => true,
                    (_, _, None) => false,
                    (from, until, Some(at)) => from.map_or(true, |f| at >= f) && until.map_or(true, |u| at <= u),
                };

                let reply = if verb == "ListIdentifiers" {
                    let ids: Vec<_> = self
                        .repository
                        .get_identifiers()
                        .await?
                        .into_iter()
                        .filter(|i| in_range(i.updated_at))
                        .collect();
                    if ids.is_empty() {
                        return Err(OaiError::NoRecordsMatch);
                    }
                    Reply::Identifiers(ids)
                } else {
                    let records: Vec<_> = self
                        .repository
                        .get_records()
                        .await?
                        .into_iter()
                        .filter(|r| in_range(r.updated_at))
                        .collect();
                    if records.is_empty() {
                        return Err(OaiError::NoRecordsMatch);
                    }
                    Reply::Records(records, format)
                };
                Ok(reply)
            }
            "GetRecord" => {
                let identifier = OaiRequest::require(&request.identifier, "identifier")?;
                let format = Self::format(OaiRequest::require(&request.metadata_prefix, "metadataPrefix")?)?;
                match self.repository.get_record(identifier).await? {
                    Some(record) => Ok(Reply::Record(Box::new(record), format)),
                    None => Err(OaiError::IdDoesNotExist(identifier.to_string())),
                }
            }
            other => Err(OaiError::BadVerb(format!("Illegal OAI verb: {}", other))),
        }
    }

    fn format(prefix: &str) -> Result<MetadataFormat, OaiError> {
        OaiRepository::metadata_format(prefix).ok_or_else(|| OaiError::CannotDisseminateFormat(prefix.to_string()))
    }

    fn datestamp(&self, at: Option<DateTime<Utc>>) -> String {
        match at {
            Some(at) => format_datestamp(at),
            None => self.config.earliest_datestamp.clone(),
        }
    }

    fn render(&self, request: &OaiRequest, reply: Result<Reply, OaiError>) -> Result<String, OaiError> {
        let mut xml = XmlBuilder::new()?;
        xml.start(
            "OAI-PMH",
            &[
                ("xmlns", OAI_NAMESPACE),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", OAI_SCHEMA_LOCATION),
            ],
        )?;
        xml.text("responseDate", &[], &format_datestamp(Utc::now()))?;

        // Arguments are echoed only when they were syntactically acceptable
        let echo = !matches!(reply, Err(OaiError::BadVerb(_)) | Err(OaiError::BadArgument(_)));
        let attributes = if echo { request.attributes() } else { vec![] };
        xml.text("request", &attributes, &self.config.base_url)?;

        match reply {
            Err(err) => {
                let code = err.code().unwrap_or("badArgument");
                xml.text("error", &[("code", code)], &err.to_string())?;
            }
            Ok(Reply::Identify) => self.render_identify(&mut xml)?,
            Ok(Reply::MetadataFormats(formats)) => {
                xml.start("ListMetadataFormats", &[])?;
                for format in formats {
                    xml.start("metadataFormat", &[])?;
                    xml.text("metadataPrefix", &[], format.prefix)?;
                    xml.text("schema", &[], format.schema)?;
                    xml.text("metadataNamespace", &[], format.namespace)?;
                    xml.end("metadataFormat")?;
                }
                xml.end("ListMetadataFormats")?;
            }
            Ok(Reply::Sets(sets)) => {
                xml.start("ListSets", &[])?;
                for set in sets {
                    xml.start("set", &[])?;
                    xml.text("setSpec", &[], set.spec)?;
                    xml.text("setName", &[], set.name)?;
                    xml.end("set")?;
                }
                xml.end("ListSets")?;
            }
            Ok(Reply::Identifiers(ids)) => {
                xml.start("ListIdentifiers", &[])?;
                for id in &ids {
                    self.render_header(&mut xml, id)?;
                }
                xml.end("ListIdentifiers")?;
            }
            Ok(Reply::Records(records, format)) => {
                xml.start("ListRecords", &[])?;
                for record in &records {
                    self.render_record(&mut xml, record, format)?;
                }
                xml.end("ListRecords")?;
            }
            Ok(Reply::Record(record, format)) => {
                xml.start("GetRecord", &[])?;
                self.render_record(&mut xml, &record, format)?;
                xml.end("GetRecord")?;
            }
        }

        xml.end("OAI-PMH")?;
        xml.finish()
    }

    fn render_identify(&self, xml: &mut XmlBuilder) -> Result<(), OaiError> {
        xml.start("Identify", &[])?;
        xml.text("repositoryName", &[], &self.config.repository_name)?;
        xml.text("baseURL", &[], &self.config.base_url)?;
        xml.text("protocolVersion", &[], "2.0")?;
        xml.text("adminEmail", &[], &self.config.admin_email)?;
        xml.text("earliestDatestamp", &[], &self.config.earliest_datestamp)?;
        xml.text("deletedRecord", &[], "no")?;
        xml.text("granularity", &[], "YYYY-MM-DDThh:mm:ssZ")?;
        xml.end("Identify")
    }

    fn render_header(&self, xml: &mut XmlBuilder, id: &OaiIdentifier) -> Result<(), OaiError> {
        xml.start("header", &[])?;
        xml.text("identifier", &[], &id.id)?;
        xml.text("datestamp", &[], &self.datestamp(id.updated_at))?;
        for set in self.repository.get_sets() {
            xml.text("setSpec", &[], set.spec)?;
        }
        xml.end("header")
    }

    fn render_record(&self, xml: &mut XmlBuilder, record: &OaiRecord, format: MetadataFormat) -> Result<(), OaiError> {
        xml.start("record", &[])?;
        self.render_header(xml, &record.header())?;
        xml.start("metadata", &[])?;
        if format == METADATA_FORMAT_DATACITE {
            self.render_datacite(xml, record)?;
        } else {
            self.render_dublin_core(xml, record, format)?;
        }
        xml.end("metadata")?;
        xml.end("record")
    }

    fn render_dublin_core(&self, xml: &mut XmlBuilder, record: &OaiRecord, format: MetadataFormat) -> Result<(), OaiError> {
        let schema_location = format!("{} {}", format.namespace, format.schema);
        xml.start(
            "oai_dc:dc",
            &[
                ("xmlns:oai_dc", format.namespace),
                ("xmlns:dc", DC_NAMESPACE),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", &schema_location),
            ],
        )?;
        xml.text("dc:title", &[], &record.title)?;
        xml.text("dc:creator", &[], record.creator_name)?;
        for contributor in record.contributors {
            xml.text("dc:contributor", &[], contributor.name)?;
        }
        xml.text("dc:publisher", &[], record.publisher)?;
        xml.text("dc:date", &[], &format_datestamp(record.date))?;
        xml.text("dc:description", &[], record.description)?;
        xml.text("dc:identifier", &[], &record.id)?;
        xml.text("dc:type", &[], "Dataset")?;
        if let Some(point) = &record.geo_location_point {
            xml.text("dc:coverage", &[], point)?;
        }
        xml.end("oai_dc:dc")
    }

    fn render_datacite(&self, xml: &mut XmlBuilder, record: &OaiRecord) -> Result<(), OaiError> {
        let format = METADATA_FORMAT_DATACITE;
        let schema_location = format!("{} {}", format.namespace, format.schema);
        xml.start(
            "resource",
            &[
                ("xmlns", format.namespace),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", &schema_location),
            ],
        )?;
        xml.text("identifier", &[("identifierType", "URN")], &record.id)?;

        xml.start("creators", &[])?;
        xml.start("creator", &[])?;
        xml.text("creatorName", &[], record.creator_name)?;
        xml.text("nameIdentifier", &[("nameIdentifierScheme", "info")], record.creator_identifier)?;
        xml.end("creator")?;
        xml.end("creators")?;

        xml.start("titles", &[])?;
        xml.text("title", &[], &record.title)?;
        xml.end("titles")?;

        xml.text("publisher", &[], record.publisher)?;
        xml.text("publicationYear", &[], record.publication_year)?;

        xml.start("contributors", &[])?;
        for contributor in record.contributors {
            xml.start("contributor", &[("contributorType", contributor.contributor_type)])?;
            xml.text("contributorName", &[], contributor.name)?;
            xml.text("nameIdentifier", &[("nameIdentifierScheme", "info")], contributor.id)?;
            xml.end("contributor")?;
        }
        xml.end("contributors")?;

        xml.start("dates", &[])?;
        if let Some(created) = record.created_at {
            xml.text("date", &[("dateType", "Created")], &format_datestamp(created))?;
        }
        if let Some(updated) = record.updated_at {
            xml.text("date", &[("dateType", "Updated")], &format_datestamp(updated))?;
        }
        xml.text("date", &[("dateType", "Issued")], &format_datestamp(record.date))?;
        xml.end("dates")?;

        xml.text("resourceType", &[("resourceTypeGeneral", "Dataset")], "Dataset")?;

        xml.start("descriptions", &[])?;
        xml.text("description", &[("descriptionType", "Abstract")], record.description)?;
        xml.end("descriptions")?;

        if let Some(point) = &record.geo_location_point {
            xml.start("geoLocations", &[])?;
            xml.start("geoLocation", &[])?;
            xml.text("geoLocationPoint", &[], point)?;
            xml.end("geoLocation")?;
            xml.end("geoLocations")?;
        }
        xml.end("resource")
    }
}

pub fn format_datestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Accepts `YYYY-MM-DD` or a full UTC datestamp. Day granularity covers the
/// whole day when used as an upper bound.
pub fn parse_datestamp(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, OaiError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| OaiError::BadArgument(format!("Illegal datestamp '{}'", value)))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| Utc.from_utc_datetime(&t))
        .ok_or_else(|| OaiError::BadArgument(format!("Illegal datestamp '{}'", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::TestContext;

    async fn provider() -> (TestContext, OaiProvider) {
        let ctx = TestContext::new();
        ctx.seed_cenote("c1", "Dos Ojos", true).await;
        ctx.seed_cenote("c2", "Closed", false).await;
        let repository = OaiRepository::new(ctx.services.cenotes.clone());
        (ctx, OaiProvider::new(repository, AppConfig::development().oai))
    }

    fn request(verb: &str, f: impl FnOnce(&mut OaiRequest)) -> OaiRequest {
        let mut request = OaiRequest::verb(verb);
        f(&mut request);
        request
    }

    #[tokio::test]
    async fn identify_describes_repository() {
        let (_ctx, provider) = provider().await;
        let xml = provider.handle(&OaiRequest::verb("Identify")).await.unwrap();
        assert!(xml.contains("<repositoryName>Cenoteando</repositoryName>"));
        assert!(xml.contains("<protocolVersion>2.0</protocolVersion>"));
        assert!(xml.contains("verb=\"Identify\""));
    }

    #[tokio::test]
    async fn get_record_renders_requested_format() {
        let (_ctx, provider) = provider().await;
        let xml = provider
            .handle(&request("GetRecord", |r| {
                r.identifier = Some("oai:cenoteando.org:Cenotes/c1".into());
                r.metadata_prefix = Some("oai_datacite".into());
            }))
            .await
            .unwrap();
        assert!(xml.contains("<title>Dos Ojos</title>"));
        assert!(xml.contains("contributorType=\"DataCurator\""));
        assert!(xml.contains("<geoLocationPoint>20.6296 -87.0739</geoLocationPoint>"));
        assert!(xml.contains("<setSpec>openaire_data</setSpec>"));

        let dc = provider
            .handle(&request("GetRecord", |r| {
                r.identifier = Some("oai:cenoteando.org:Cenotes/c1".into());
                r.metadata_prefix = Some("oai_dc".into());
            }))
            .await
            .unwrap();
        assert!(dc.contains("<dc:title>Dos Ojos</dc:title>"));
    }

    #[tokio::test]
    async fn protocol_errors_use_oai_codes() {
        let (_ctx, provider) = provider().await;

        let cases = [
            (OaiRequest::default(), "badVerb"),
            (OaiRequest::verb("Explode"), "badVerb"),
            (OaiRequest::verb("GetRecord"), "badArgument"),
            (
                request("GetRecord", |r| {
                    r.identifier = Some("oai:cenoteando.org:Cenotes/c2".into());
                    r.metadata_prefix = Some("oai_dc".into());
                }),
                "idDoesNotExist",
            ),
            (request("ListRecords", |r| r.metadata_prefix = Some("marc21".into())), "cannotDisseminateFormat"),
            (request("ListIdentifiers", |r| r.resumption_token = Some("abc".into())), "badResumptionToken"),
            (
                request("ListIdentifiers", |r| {
                    r.metadata_prefix = Some("oai_dc".into());
                    r.from = Some("2030-01-01".into());
                }),
                "noRecordsMatch",
            ),
            (
                request("ListIdentifiers", |r| {
                    r.metadata_prefix = Some("oai_dc".into());
                    r.until = Some("yesterday".into());
                }),
                "badArgument",
            ),
        ];

        for (req, code) in cases {
            let xml = provider.handle(&req).await.unwrap();
            assert!(xml.contains(&format!("<error code=\"{code}\">")), "{code}: {xml}");
        }
    }

    #[tokio::test]
    async fn list_identifiers_filters_by_datestamp() {
        let (_ctx, provider) = provider().await;
        let xml = provider
            .handle(&request("ListIdentifiers", |r| {
                r.metadata_prefix = Some("oai_datacite".into());
                r.from = Some("2022-06-15".into());
                r.until = Some("2022-06-15".into());
            }))
            .await
            .unwrap();
        assert!(xml.contains("<identifier>oai:cenoteando.org:Cenotes/c1</identifier>"));
        assert!(xml.contains("<datestamp>2022-06-15T12:00:00Z</datestamp>"));
        assert!(!xml.contains("Cenotes/c2"));
        assert!(!xml.contains("resumptionToken"));
    }

    #[test]
    fn parses_datestamps() {
        assert_eq!(format_datestamp(parse_datestamp("2022-06-15", true).unwrap()), "2022-06-15T23:59:59Z");
        assert_eq!(format_datestamp(parse_datestamp("2022-06-15T10:00:00Z", true).unwrap()), "2022-06-15T10:00:00Z");
        assert!(parse_datestamp("15/06/2022", false).is_err());
    }
}
