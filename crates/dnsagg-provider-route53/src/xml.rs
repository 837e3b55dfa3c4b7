//! Route 53 XML documents
//!
//! Element order in [`XmlRecordSet`] follows the API schema; Route 53 rejects
//! requests whose elements are out of order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dnsagg_core::{Error, RecordSet, RecordType, Result};

pub const XMLNS: &str = "https://route53.amazonaws.com/doc/2013-04-01/";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Routing-policy elements carried verbatim in [`RecordSet::extra`]
const SET_IDENTIFIER: &str = "SetIdentifier";
const WEIGHT: &str = "Weight";
const REGION: &str = "Region";
const GEO_CONTINENT: &str = "GeoLocation.ContinentCode";
const GEO_COUNTRY: &str = "GeoLocation.CountryCode";
const GEO_SUBDIVISION: &str = "GeoLocation.SubdivisionCode";
const FAILOVER: &str = "Failover";
const MULTI_VALUE_ANSWER: &str = "MultiValueAnswer";
const HEALTH_CHECK_ID: &str = "HealthCheckId";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListResourceRecordSetsResponse {
    #[serde(default)]
    resource_record_sets: ResourceRecordSets,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceRecordSets {
    #[serde(rename = "ResourceRecordSet", default)]
    items: Vec<XmlRecordSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XmlRecordSet {
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    set_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geo_location: Option<GeoLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    multi_value_answer: Option<String>,
    #[serde(rename = "TTL", default, skip_serializing_if = "Option::is_none")]
    ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_records: Option<ResourceRecords>,
    #[serde(default, skip_serializing)]
    alias_target: Option<AliasTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    health_check_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GeoLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    continent_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subdivision_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
struct ResourceRecords {
    #[serde(rename = "ResourceRecord", default)]
    records: Vec<ResourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResourceRecord {
    value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct AliasTarget {
    #[serde(rename = "DNSName")]
    dns_name: String,
}

impl XmlRecordSet {
    /// Name as returned by Route 53 (fully qualified, trailing dot)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.record_type
    }

    /// Convert to the store-neutral record set
    pub fn into_record_set(self) -> Result<RecordSet> {
        if let Some(alias) = &self.alias_target {
            return Err(Error::provider(
                "route53",
                format!(
                    "{} is an alias to {}, alias record sets cannot be rewritten",
                    self.name, alias.dns_name
                ),
            ));
        }

        let record_type: RecordType = self.record_type.parse()?;

        let mut extra = BTreeMap::new();
        let mut carry = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                extra.insert(key.to_string(), value);
            }
        };
        carry(SET_IDENTIFIER, self.set_identifier);
        carry(WEIGHT, self.weight);
        carry(REGION, self.region);
        if let Some(geo) = self.geo_location {
            carry(GEO_CONTINENT, geo.continent_code);
            carry(GEO_COUNTRY, geo.country_code);
            carry(GEO_SUBDIVISION, geo.subdivision_code);
        }
        carry(FAILOVER, self.failover);
        carry(MULTI_VALUE_ANSWER, self.multi_value_answer);
        carry(HEALTH_CHECK_ID, self.health_check_id);

        let values = self
            .resource_records
            .unwrap_or_default()
            .records
            .into_iter()
            .map(|r| r.value)
            .collect();

        Ok(RecordSet {
            name: self.name,
            record_type,
            ttl: self.ttl,
            values,
            extra,
        })
    }

    pub fn from_record_set(set: &RecordSet) -> Self {
        let get = |key: &str| set.extra.get(key).cloned();

        let geo = GeoLocation {
            continent_code: get(GEO_CONTINENT),
            country_code: get(GEO_COUNTRY),
            subdivision_code: get(GEO_SUBDIVISION),
        };
        let has_geo =
            geo.continent_code.is_some() || geo.country_code.is_some() || geo.subdivision_code.is_some();

        Self {
            name: set.name.clone(),
            record_type: set.record_type.as_str().to_string(),
            set_identifier: get(SET_IDENTIFIER),
            weight: get(WEIGHT),
            region: get(REGION),
            geo_location: has_geo.then_some(geo),
            failover: get(FAILOVER),
            multi_value_answer: get(MULTI_VALUE_ANSWER),
            ttl: set.ttl,
            resource_records: Some(ResourceRecords {
                records: set
                    .values
                    .iter()
                    .map(|v| ResourceRecord { value: v.clone() })
                    .collect(),
            }),
            alias_target: None,
            health_check_id: get(HEALTH_CHECK_ID),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename = "ChangeResourceRecordSetsRequest")]
struct ChangeResourceRecordSetsRequest {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "ChangeBatch")]
    change_batch: ChangeBatch,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeBatch {
    comment: String,
    changes: Changes,
}

#[derive(Debug, Serialize)]
struct Changes {
    #[serde(rename = "Change")]
    items: Vec<Change>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Change {
    action: &'static str,
    resource_record_set: XmlRecordSet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeResourceRecordSetsResponse {
    change_info: ChangeInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ChangeInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InvalidChangeBatch {
    messages: Messages,
}

#[derive(Debug, Deserialize)]
struct Messages {
    #[serde(rename = "Message", default)]
    items: Vec<String>,
}

/// Error document returned with a non-2xx status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

fn parse_failure(what: &str, e: quick_xml::DeError) -> Error {
    Error::provider("route53", format!("Failed to parse {}: {}", what, e))
}

/// Parse a ListResourceRecordSets response
pub fn parse_record_sets(body: &str) -> Result<Vec<XmlRecordSet>> {
    let response: ListResourceRecordSetsResponse =
        quick_xml::de::from_str(body).map_err(|e| parse_failure("record set list", e))?;
    Ok(response.resource_record_sets.items)
}

/// Build a ChangeResourceRecordSets request holding a single UPSERT
pub fn upsert_request(set: &RecordSet, comment: &str) -> Result<String> {
    let request = ChangeResourceRecordSetsRequest {
        xmlns: XMLNS,
        change_batch: ChangeBatch {
            comment: comment.to_string(),
            changes: Changes {
                items: vec![Change {
                    action: "UPSERT",
                    resource_record_set: XmlRecordSet::from_record_set(set),
                }],
            },
        },
    };

    let body = quick_xml::se::to_string(&request)
        .map_err(|e| Error::provider("route53", format!("Failed to encode change batch: {}", e)))?;
    Ok(format!("{}{}", XML_DECLARATION, body))
}

/// Extract the change ID from a ChangeResourceRecordSets response
pub fn parse_change_id(body: &str) -> Result<String> {
    let response: ChangeResourceRecordSetsResponse =
        quick_xml::de::from_str(body).map_err(|e| parse_failure("change response", e))?;
    let id = response.change_info.id;
    Ok(id.strip_prefix("/change/").unwrap_or(&id).to_string())
}

/// Parse an error document, if the body is one
pub fn parse_error(body: &str) -> Option<ApiError> {
    if let Ok(response) = quick_xml::de::from_str::<ErrorResponse>(body) {
        return Some(ApiError {
            code: response.error.code,
            message: response.error.message,
        });
    }

    quick_xml::de::from_str::<InvalidChangeBatch>(body)
        .ok()
        .map(|batch| ApiError {
            code: "InvalidChangeBatch".to_string(),
            message: batch.messages.items.join("; "),
        })
}
