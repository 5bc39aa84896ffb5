use super::{Collection, Direction, OrderBy, Predicate, RecordSource, Row, SourceError};
use crate::constants::MRN_COLUMN;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use ward_types::Mrn;

/// Record source backed by a hosted PostgREST endpoint (`{base_url}/rest/v1/{collection}`).
///
/// Filters are sent as `column=op.value` query parameters. Counts use a `HEAD` request with
/// `Prefer: count=exact` and read the total from `Content-Range`.
#[derive(Clone, Debug)]
pub struct PostgrestSource {
    client: reqwest::Client,
    base_url: String,
}

impl PostgrestSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let api_key = api_key.into();
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&api_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {api_key}"))?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/rest/v1/{}", self.base_url, collection.as_str())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, SourceError> {
    HeaderValue::from_str(value)
        .map_err(|_| SourceError::Unavailable("API key is not a valid header value".into()))
}

/// Renders a predicate as PostgREST filter parameters.
fn filter_params(predicate: &Predicate) -> Vec<(String, String)> {
    predicate
        .conditions()
        .iter()
        .map(|c| (c.column.clone(), format!("{}.{}", c.op.as_str(), param_value(&c.value))))
        .collect()
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_owned(),
        other => other.to_string(),
    }
}

fn order_param(order: &OrderBy) -> (String, String) {
    let direction = match order.direction {
        Direction::Ascending => "asc",
        Direction::Descending => "desc",
    };
    ("order".to_owned(), format!("{}.{}", order.column, direction))
}

/// Parses the total out of `Content-Range` (`0-24/573` or `*/573`).
fn parse_content_range_total(header: Option<&str>) -> Result<u64, SourceError> {
    header
        .and_then(|h| h.rsplit_once('/'))
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
        .ok_or_else(|| SourceError::InvalidContentRange(header.map(str::to_owned)))
}

async fn send(request: RequestBuilder) -> Result<Response, SourceError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait::async_trait]
impl RecordSource for PostgrestSource {
    async fn count(&self, collection: Collection, predicate: &Predicate) -> Result<u64, SourceError> {
        let request = self
            .client
            .head(self.collection_url(collection))
            .query(&[("select", "*")])
            .query(&filter_params(predicate))
            .header("Prefer", "count=exact");

        let response = send(request).await?;
        let header = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok());
        parse_content_range_total(header)
    }

    async fn query(
        &self,
        collection: Collection,
        predicate: &Predicate,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Row>, SourceError> {
        let mut request = self
            .client
            .get(self.collection_url(collection))
            .query(&[("select", collection.select())])
            .query(&filter_params(predicate));
        if let Some(order) = order {
            request = request.query(&[order_param(order)]);
        }

        let rows = send(request).await?.json::<Vec<Row>>().await?;
        tracing::debug!("fetched {} rows from {}", rows.len(), collection);
        Ok(rows)
    }

    async fn update(&self, collection: Collection, mrn: &Mrn, fields: Row) -> Result<u64, SourceError> {
        let request = self
            .client
            .patch(self.collection_url(collection))
            .query(&[(MRN_COLUMN, format!("eq.{}", mrn.as_str()))])
            .header("Prefer", "return=representation")
            .json(&Value::Object(fields));

        let rows = send(request).await?.json::<Vec<Row>>().await?;
        Ok(rows.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_filters_as_operator_prefixed_values() {
        let predicate = Predicate::new()
            .eq("consultation_specialty", "Immunology & Allergy")
            .eq("status", "Completed")
            .gte("updated_at", "2024-03-15T00:00:00Z")
            .lt("age", 65);

        assert_eq!(
            filter_params(&predicate),
            vec![
                (
                    "consultation_specialty".to_owned(),
                    "eq.Immunology & Allergy".to_owned()
                ),
                ("status".to_owned(), "eq.Completed".to_owned()),
                ("updated_at".to_owned(), "gte.2024-03-15T00:00:00Z".to_owned()),
                ("age".to_owned(), "lt.65".to_owned()),
            ]
        );
    }

    #[test]
    fn renders_order_parameter() {
        assert_eq!(
            order_param(&OrderBy::desc("admission_date")),
            ("order".to_owned(), "admission_date.desc".to_owned())
        );
    }

    #[test]
    fn reads_total_from_content_range() {
        assert_eq!(parse_content_range_total(Some("0-24/573")).unwrap(), 573);
        assert_eq!(parse_content_range_total(Some("*/0")).unwrap(), 0);
        assert!(matches!(
            parse_content_range_total(Some("0-24/*")),
            Err(SourceError::InvalidContentRange(Some(_)))
        ));
        assert!(matches!(
            parse_content_range_total(None),
            Err(SourceError::InvalidContentRange(None))
        ));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let source =
            PostgrestSource::new("https://ward.example.org/", "key", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            source.collection_url(Collection::ClinicAppointments),
            "https://ward.example.org/rest/v1/clinic_appointments"
        );
    }
}
