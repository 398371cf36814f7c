//! Medicare Hospital Compare adapter.
//!
//! Queries the public data.cms.gov provider-data datastore. No credential is
//! required; every query goes through the drupal-style
//! `filter[x][condition][...]` parameter encoding against the Hospital
//! Overall Ratings dataset.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use concierge_core::error::{AdapterError, Result};
use concierge_core::format;
use concierge_core::http::{Envelope, RestClient};
use concierge_core::params::ParamReader;
use concierge_core::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition,
};

const API_BASE_URL: &str = "https://data.cms.gov/provider-data/api/1";
/// Hospital Overall Ratings dataset.
const RATINGS_DATASET: &str = "datastore/query/4pq5-n9py";

const SOURCE: &str = "Medicare Hospital Compare (data.cms.gov)";
const MAX_COMPARE: usize = 5;

/// The seven comparison categories the ratings dataset carries, with the
/// column each maps to and a plain-language description.
const MEASURE_CATEGORIES: &[(&str, &str, &str)] = &[
    ("mortality", "mortality_national_comparison", "Death rates for common conditions"),
    ("safety_of_care", "safety_of_care_national_comparison", "Infections, complications, medical errors"),
    ("readmission", "readmission_national_comparison", "Rate of patients readmitted within 30 days"),
    ("patient_experience", "patient_experience_national_comparison", "Patient survey results (HCAHPS)"),
    ("timeliness_of_care", "timeliness_of_care_national_comparison", "How quickly patients receive care"),
    ("effective_care", "effective_care_national_comparison", "Following best practices for treatment"),
];

pub struct MedicareAdapter {
    id: String,
    client: RestClient,
}

impl MedicareAdapter {
    pub fn new() -> Self {
        Self {
            id: "medicare".to_string(),
            client: RestClient::new(API_BASE_URL, None, Envelope::Raw),
        }
    }

    async fn query_ratings(&self, filters: &[(&str, &str)], limit: u32) -> Result<Vec<Value>> {
        let query = filter_query(filters, limit);
        let builder = self
            .client
            .request(reqwest::Method::GET, RATINGS_DATASET)?
            .query(&query);
        let data = self.client.send(builder).await?;
        Ok(data
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_by_provider_id(&self, provider_id: &str) -> Result<Option<Value>> {
        let results = self.query_ratings(&[("facility_id", provider_id)], 1).await?;
        Ok(results.into_iter().next())
    }

    async fn tool_get_hospital_rating(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let hospital_name = reader.required_str_bounded("hospital_name", 2, 200);
        let city = reader.required_str_bounded("city", 2, 100);
        let state = reader.required_str_bounded("state", 2, 2);
        let response_format = reader.response_format();
        reader.finish("medicare_get_hospital_rating")?;
        let hospital_name = hospital_name.unwrap_or_default();
        let city = city.unwrap_or_default();
        let state = state.unwrap_or_default().to_uppercase();

        let results = self
            .query_ratings(&[("state", &state), ("city", &city.to_uppercase())], 100)
            .await?;

        // Loose substring match in either direction, since facility names in
        // the dataset rarely match colloquial hospital names exactly.
        let needle = hospital_name.to_lowercase();
        let hospital = results.iter().find(|h| {
            let facility = facility_name(h).to_lowercase();
            facility.contains(&needle) || needle.contains(&facility)
        });

        let Some(hospital) = hospital else {
            let report = json!({
                "status": "not_found",
                "message": format!("No hospital found matching '{hospital_name}' in {city}, {state}"),
                "searched": {
                    "hospital_name": hospital_name,
                    "city": city,
                    "state": state
                },
                "suggestion": "Try searching by location first to see available hospitals",
                "source": SOURCE,
                "timestamp": Utc::now().to_rfc3339()
            });
            return if response_format.is_json() {
                Ok(serde_json::to_string_pretty(&report)?)
            } else {
                Ok(format!(
                    "No hospital found matching '{hospital_name}' in {city}, {state}.\n\n\
                     Try searching by location first to see available hospitals."
                ))
            };
        };

        if response_format.is_json() {
            return Ok(serde_json::to_string_pretty(&json!({
                "status": "success",
                "hospital_name": hospital.get("facility_name"),
                "address": hospital.get("address"),
                "city": hospital.get("city"),
                "state": hospital.get("state"),
                "zip_code": hospital.get("zip_code"),
                "phone": hospital.get("phone_number"),
                "hospital_type": hospital.get("hospital_type"),
                "ownership": hospital.get("hospital_ownership"),
                "overall_rating": hospital.get("hospital_overall_rating"),
                "rating_scale": "1-5 stars (5 is best)",
                "rating_footnote": hospital.get("hospital_overall_rating_footnote"),
                "mortality_rating": hospital.get("mortality_national_comparison"),
                "safety_rating": hospital.get("safety_of_care_national_comparison"),
                "readmission_rating": hospital.get("readmission_national_comparison"),
                "patient_experience_rating": hospital.get("patient_experience_national_comparison"),
                "timeliness_rating": hospital.get("timeliness_of_care_national_comparison"),
                "effectiveness_rating": hospital.get("effective_care_national_comparison"),
                "medicare_provider_id": hospital.get("facility_id"),
                "emergency_services": hospital.get("emergency_services"),
                "source": SOURCE,
                "data_date": hospital.get("measure_end_date"),
                "timestamp": Utc::now().to_rfc3339()
            }))?);
        }

        let mut lines = vec![
            format!("# {}", facility_name(hospital)),
            format!("{} stars (1-5, 5 is best)", stars(hospital)),
            String::new(),
            "## Location & Contact".to_string(),
            format!(
                "- **Address**: {}, {}, {} {}",
                str_field(hospital, "address"),
                str_field(hospital, "city"),
                str_field(hospital, "state"),
                str_field(hospital, "zip_code")
            ),
            format!("- **Phone**: {}", str_field(hospital, "phone_number")),
            format!("- **Type**: {}", str_field(hospital, "hospital_type")),
            format!("- **Ownership**: {}", str_field(hospital, "hospital_ownership")),
            format!("- **Emergency Services**: {}", str_field(hospital, "emergency_services")),
            format!("- **Medicare Provider ID**: {}", str_field(hospital, "facility_id")),
            String::new(),
            "## National Comparisons".to_string(),
        ];
        for (category, column, _) in MEASURE_CATEGORIES {
            lines.push(format!(
                "- **{}**: {}",
                category_title(category),
                str_field(hospital, column)
            ));
        }
        lines.push(String::new());
        lines.push(format!("Source: {SOURCE}"));
        Ok(lines.join("\n"))
    }

    async fn tool_search_hospitals(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let zip_code = reader.optional_str_bounded("zip_code", 10);
        let city = reader.optional_str_bounded("city", 100);
        let state = reader.optional_str_bounded("state", 2);
        let limit = reader.int_in_range("limit", 10, 1, 50) as u32;
        let response_format = reader.response_format();
        if zip_code.is_none() && !(city.is_some() && state.is_some()) {
            reader.violation(
                "zip_code",
                "either zip_code or both city and state must be provided",
            );
        }
        reader.finish("medicare_search_hospitals")?;

        let mut filters: Vec<(&str, String)> = Vec::new();
        if let Some(zip) = &zip_code {
            filters.push(("zip_code", zip.clone()));
        }
        if let Some(state) = &state {
            filters.push(("state", state.to_uppercase()));
        }
        if let Some(city) = &city {
            filters.push(("city", city.to_uppercase()));
        }
        let filter_refs: Vec<(&str, &str)> =
            filters.iter().map(|(f, v)| (*f, v.as_str())).collect();
        let results = self.query_ratings(&filter_refs, limit).await?;

        let hospitals: Vec<Value> = results
            .iter()
            .map(|h| {
                json!({
                    "hospital_name": h.get("facility_name"),
                    "address": h.get("address"),
                    "city": h.get("city"),
                    "state": h.get("state"),
                    "zip_code": h.get("zip_code"),
                    "phone": h.get("phone_number"),
                    "overall_rating": h.get("hospital_overall_rating"),
                    "hospital_type": h.get("hospital_type"),
                    "ownership": h.get("hospital_ownership"),
                    "emergency_services": h.get("emergency_services"),
                    "medicare_provider_id": h.get("facility_id")
                })
            })
            .collect();

        if response_format.is_json() {
            return Ok(serde_json::to_string_pretty(&json!({
                "status": "success",
                "search_params": {
                    "zip_code": zip_code,
                    "city": city,
                    "state": state
                },
                "total_found": hospitals.len(),
                "hospitals": hospitals,
                "source": SOURCE,
                "timestamp": Utc::now().to_rfc3339()
            }))?);
        }

        let location = zip_code.clone().unwrap_or_else(|| {
            format!(
                "{}, {}",
                city.clone().unwrap_or_default(),
                state.clone().unwrap_or_default().to_uppercase()
            )
        });
        if hospitals.is_empty() {
            return Ok(format!("No hospitals found for {location}."));
        }
        let total = hospitals.len();
        let report = format::shrink_listing(
            &hospitals,
            |shown, truncated| {
                let mut lines = vec![
                    format!("# Hospitals near {location}"),
                    format!(
                        "Found {total} hospitals{}",
                        if truncated { " (truncated)" } else { "" }
                    ),
                    String::new(),
                ];
                for h in shown {
                    lines.push(format!(
                        "## {} {} stars",
                        str_field(h, "hospital_name"),
                        str_field(h, "overall_rating")
                    ));
                    lines.push(format!(
                        "- **Address**: {}, {}, {} {}",
                        str_field(h, "address"),
                        str_field(h, "city"),
                        str_field(h, "state"),
                        str_field(h, "zip_code")
                    ));
                    lines.push(format!("- **Phone**: {}", str_field(h, "phone")));
                    lines.push(format!("- **Type**: {}", str_field(h, "hospital_type")));
                    lines.push(format!(
                        "- **Emergency Services**: {}",
                        str_field(h, "emergency_services")
                    ));
                    lines.push(format!(
                        "- **Medicare Provider ID**: {}",
                        str_field(h, "medicare_provider_id")
                    ));
                    lines.push(String::new());
                }
                lines.push(format!("Source: {SOURCE}"));
                lines.join("\n")
            },
            |shown, total| format!("\n\n**Note**: Showing {shown} of {total} hospitals."),
        );
        Ok(report)
    }

    async fn tool_get_quality_measures(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let provider_id = reader.required_str_bounded("medicare_provider_id", 4, 10);
        let response_format = reader.response_format();
        reader.finish("medicare_get_quality_measures")?;
        let provider_id = provider_id.unwrap_or_default();

        let Some(hospital) = self.fetch_by_provider_id(&provider_id).await? else {
            let message =
                format!("No hospital found with Medicare Provider ID: {provider_id}");
            return if response_format.is_json() {
                Ok(serde_json::to_string_pretty(&json!({
                    "status": "not_found",
                    "message": message,
                    "source": SOURCE,
                    "timestamp": Utc::now().to_rfc3339()
                }))?)
            } else {
                Ok(message)
            };
        };

        if response_format.is_json() {
            let mut measures = serde_json::Map::new();
            measures.insert(
                "overall_rating".to_string(),
                json!({
                    "rating": hospital.get("hospital_overall_rating"),
                    "rating_scale": "1-5 stars",
                    "footnote": hospital.get("hospital_overall_rating_footnote")
                }),
            );
            for (category, column, description) in MEASURE_CATEGORIES {
                measures.insert(
                    (*category).to_string(),
                    json!({
                        "national_comparison": hospital.get(*column),
                        "description": description
                    }),
                );
            }
            return Ok(serde_json::to_string_pretty(&json!({
                "status": "success",
                "hospital_name": hospital.get("facility_name"),
                "medicare_provider_id": provider_id,
                "quality_measures": measures,
                "rating_guide": {
                    "Above the national average": "Better than most hospitals",
                    "Same as the national average": "Similar to most hospitals",
                    "Below the national average": "Worse than most hospitals",
                    "Not Available": "Insufficient data"
                },
                "data_date": hospital.get("measure_end_date"),
                "source": SOURCE,
                "timestamp": Utc::now().to_rfc3339()
            }))?);
        }

        let mut lines = vec![
            format!("# Quality Measures: {}", facility_name(&hospital)),
            format!("Medicare Provider ID: {provider_id}"),
            String::new(),
            format!("**Overall Rating**: {} stars (1-5)", stars(&hospital)),
            String::new(),
            "## Measures".to_string(),
        ];
        for (category, column, description) in MEASURE_CATEGORIES {
            lines.push(format!(
                "- **{}**: {}\n  {description}",
                category_title(category),
                str_field(&hospital, column)
            ));
        }
        lines.push(String::new());
        lines.push("## Reading the Comparisons".to_string());
        lines.push("- Above the national average: better than most hospitals".to_string());
        lines.push("- Same as the national average: similar to most hospitals".to_string());
        lines.push("- Below the national average: worse than most hospitals".to_string());
        lines.push("- Not Available: insufficient data".to_string());
        lines.push(String::new());
        lines.push(format!("Source: {SOURCE}"));
        Ok(lines.join("\n"))
    }

    async fn tool_compare_hospitals(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let hospital_ids = reader.required_str_list("hospital_ids", 1, MAX_COMPARE);
        let response_format = reader.response_format();
        reader.finish("medicare_compare_hospitals")?;
        let hospital_ids = hospital_ids.unwrap_or_default();

        let mut comparisons = Vec::new();
        for provider_id in &hospital_ids {
            match self.fetch_by_provider_id(provider_id).await? {
                Some(hospital) => comparisons.push(json!({
                    "hospital_name": hospital.get("facility_name"),
                    "medicare_provider_id": provider_id,
                    "overall_rating": hospital.get("hospital_overall_rating"),
                    "mortality": hospital.get("mortality_national_comparison"),
                    "safety": hospital.get("safety_of_care_national_comparison"),
                    "readmission": hospital.get("readmission_national_comparison"),
                    "patient_experience": hospital.get("patient_experience_national_comparison"),
                    "timeliness": hospital.get("timeliness_of_care_national_comparison"),
                    "effectiveness": hospital.get("effective_care_national_comparison")
                })),
                // Unknown IDs stay in the table so the caller sees which
                // requested hospitals had no data.
                None => comparisons.push(json!({
                    "hospital_name": "Not Found",
                    "medicare_provider_id": provider_id,
                    "error": "Hospital data not available"
                })),
            }
        }

        if response_format.is_json() {
            return Ok(serde_json::to_string_pretty(&json!({
                "status": "success",
                "total_compared": comparisons.len(),
                "hospitals": comparisons,
                "source": SOURCE,
                "timestamp": Utc::now().to_rfc3339()
            }))?);
        }

        let mut lines = vec![
            format!("# Hospital Comparison ({} hospitals)", comparisons.len()),
            String::new(),
            "| Hospital | Rating | Mortality | Safety | Readmission | Patient Experience | Timeliness | Effectiveness |".to_string(),
            "|---|---|---|---|---|---|---|---|".to_string(),
        ];
        for row in &comparisons {
            if row.get("error").is_some() {
                lines.push(format!(
                    "| Not Found ({}) | - | - | - | - | - | - | - |",
                    str_field(row, "medicare_provider_id")
                ));
                continue;
            }
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                str_field(row, "hospital_name"),
                str_field(row, "overall_rating"),
                str_field(row, "mortality"),
                str_field(row, "safety"),
                str_field(row, "readmission"),
                str_field(row, "patient_experience"),
                str_field(row, "timeliness"),
                str_field(row, "effectiveness"),
            ));
        }
        lines.push(String::new());
        lines.push(format!("Source: {SOURCE}"));
        Ok(lines.join("\n"))
    }
}

impl Default for MedicareAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn facility_name(hospital: &Value) -> &str {
    hospital
        .get("facility_name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown Hospital")
}

fn str_field<'a>(value: &'a Value, field: &str) -> &'a str {
    value.get(field).and_then(Value::as_str).unwrap_or("Not Available")
}

fn stars(hospital: &Value) -> &str {
    hospital
        .get("hospital_overall_rating")
        .and_then(Value::as_str)
        .unwrap_or("Not Available")
}

fn category_title(category: &str) -> String {
    category
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Encode filters in the datastore's condition-triple style, one triple per
/// filtered column, plus the row limit.
fn filter_query(filters: &[(&str, &str)], limit: u32) -> Vec<(String, String)> {
    let mut query = Vec::with_capacity(filters.len() * 3 + 1);
    for (field, value) in filters {
        query.push((format!("filter[{field}][condition][path]"), (*field).to_string()));
        query.push((format!("filter[{field}][condition][operator]"), "=".to_string()));
        query.push((format!("filter[{field}][condition][value]"), (*value).to_string()));
    }
    query.push(("limit".to_string(), limit.to_string()));
    query
}

// ---------------------------------------------------------------------------
// Adapter impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Adapter for MedicareAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::PublicData
    }

    fn health_check(&self) -> HealthStatus {
        // Public dataset, no credential to verify.
        HealthStatus::Healthy
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        let response_format = json!({
            "type": "string",
            "enum": ["markdown", "json"],
            "description": "Output format: 'markdown' or 'json'",
            "default": "markdown"
        });
        vec![
            ToolDefinition {
                name: "medicare_get_hospital_rating".to_string(),
                description: "Get the overall Medicare quality rating (1-5 stars) for a hospital by name and location".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "hospital_name": {"type": "string", "minLength": 2, "maxLength": 200},
                        "city": {"type": "string", "minLength": 2, "maxLength": 100},
                        "state": {"type": "string", "minLength": 2, "maxLength": 2, "description": "Two-letter state abbreviation, e.g. 'GA'"},
                        "response_format": response_format
                    },
                    "required": ["hospital_name", "city", "state"]
                }),
            },
            ToolDefinition {
                name: "medicare_search_hospitals".to_string(),
                description: "Search for Medicare-rated hospitals by ZIP code or by city and state".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "zip_code": {"type": "string", "maxLength": 10},
                        "city": {"type": "string", "maxLength": 100},
                        "state": {"type": "string", "maxLength": 2},
                        "limit": {"type": "integer", "minimum": 1, "maximum": 50, "default": 10},
                        "response_format": response_format
                    }
                }),
            },
            ToolDefinition {
                name: "medicare_get_quality_measures".to_string(),
                description: "Get detailed quality measures for a hospital by Medicare Provider ID".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "medicare_provider_id": {"type": "string", "minLength": 4, "maxLength": 10, "description": "Medicare Provider ID (6-digit number)"},
                        "response_format": response_format
                    },
                    "required": ["medicare_provider_id"]
                }),
            },
            ToolDefinition {
                name: "medicare_compare_hospitals".to_string(),
                description: "Compare up to 5 hospitals side-by-side by Medicare Provider ID".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "hospital_ids": {"type": "array", "items": {"type": "string"}, "minItems": 1, "maxItems": 5},
                        "response_format": response_format
                    },
                    "required": ["hospital_ids"]
                }),
            },
        ]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<String> {
        match name {
            "medicare_get_hospital_rating" => self.tool_get_hospital_rating(params).await,
            "medicare_search_hospitals" => self.tool_search_hospitals(params).await,
            "medicare_get_quality_measures" => self.tool_get_quality_measures(params).await,
            "medicare_compare_hospitals" => self.tool_compare_hospitals(params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_requires_zip_or_city_and_state() {
        let adapter = MedicareAdapter::new();
        let err = adapter
            .execute_tool("medicare_search_hospitals", json!({"city": "Savannah"}))
            .await
            .unwrap_err();
        let message = err.user_message();
        assert!(message.starts_with("Error: Invalid parameters:"), "{message}");
        assert!(message.contains("either zip_code or both city and state"));
    }

    #[tokio::test]
    async fn compare_rejects_more_than_five_hospitals() {
        let adapter = MedicareAdapter::new();
        let ids: Vec<String> = (0..6).map(|i| format!("11007{i}")).collect();
        let err = adapter
            .execute_tool("medicare_compare_hospitals", json!({"hospital_ids": ids}))
            .await
            .unwrap_err();
        assert!(err.user_message().contains("must contain at most 5 item(s)"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let adapter = MedicareAdapter::new();
        let err = adapter
            .execute_tool("medicare_delete_hospital", json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "Error: Unknown tool `medicare_delete_hospital`."
        );
    }

    #[test]
    fn health_check_never_needs_credentials() {
        let adapter = MedicareAdapter::new();
        assert_eq!(adapter.health_check(), HealthStatus::Healthy);
        assert!(adapter.required_auth().is_none());
    }

    #[test]
    fn category_titles_read_naturally() {
        assert_eq!(category_title("safety_of_care"), "Safety Of Care");
        assert_eq!(category_title("mortality"), "Mortality");
    }

    #[test]
    fn filters_encode_as_condition_triples() {
        let query = filter_query(&[("state", "GA"), ("city", "SAVANNAH")], 25);
        assert_eq!(query.len(), 7);
        assert_eq!(
            query[0],
            ("filter[state][condition][path]".to_string(), "state".to_string())
        );
        assert_eq!(
            query[2],
            ("filter[state][condition][value]".to_string(), "GA".to_string())
        );
        assert_eq!(
            query[5],
            ("filter[city][condition][value]".to_string(), "SAVANNAH".to_string())
        );
        assert_eq!(query[6], ("limit".to_string(), "25".to_string()));
    }

    #[test]
    fn tool_definitions_are_complete() {
        let adapter = MedicareAdapter::new();
        let tools = adapter.tools();
        assert_eq!(tools.len(), 4);
        assert!(tools.iter().all(|t| t.name.starts_with("medicare_")));
    }
}
