use crate::driver::{Driver, Query, SortDirection, SortField};
use crate::error::{ApiError, DriverError};
use crate::model::{Action, Model};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::routes::{ModelRoute, Route};
use crate::serializer::Payload;
use async_trait::async_trait;
use axum::http::HeaderName;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_PER_PAGE: u32 = 100;
pub const MAX_PER_PAGE: u32 = 1000;

pub const TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

pub struct FindAllModelsRoute<M: Model> {
    route: ModelRoute<M>,
    max_per_page: u32,
    page: u32,
    per_page: u32,
    filters: Vec<(String, Value)>,
    sort: Vec<SortField>,
}

impl<M: Model> FindAllModelsRoute<M> {
    pub fn new(request: ApiRequest, driver: Arc<dyn Driver>) -> Self {
        FindAllModelsRoute {
            route: ModelRoute::new(request, driver),
            max_per_page: MAX_PER_PAGE,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            filters: Vec::new(),
            sort: Vec::new(),
        }
    }

    /// Page size used when the request names none, and the cap applied when it does.
    pub fn with_page_limits(mut self, default_per_page: u32, max_per_page: u32) -> Self {
        self.max_per_page = max_per_page.max(1);
        self.per_page = default_per_page.clamp(1, self.max_per_page);
        self
    }

    pub fn route(&self) -> &ModelRoute<M> {
        &self.route
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn filters(&self) -> &[(String, Value)] {
        &self.filters
    }

    pub fn sort(&self) -> &[SortField] {
        &self.sort
    }

    /// Positive integer query parameter. Values past `u32` saturate so callers can clamp.
    fn parse_positive(&self, name: &str) -> Result<Option<u32>, ApiError> {
        let Some(raw) = self.route.request().query(name) else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(n) if n >= 1 => Ok(Some(u32::try_from(n).unwrap_or(u32::MAX))),
            _ => Err(ApiError::invalid_param(
                format!("Invalid {} parameter: {}", name, raw),
                name,
            )),
        }
    }

    fn parse_filters(&self) -> Result<Vec<(String, Value)>, ApiError> {
        let mut filters = Vec::new();
        for (key, value) in self.route.request().query_params() {
            let Some(field) = key.strip_prefix("filter[").and_then(|k| k.strip_suffix(']')) else {
                continue;
            };
            if !M::PROPERTIES.contains(&field) {
                return Err(ApiError::invalid_param(
                    format!("Invalid filter parameter: {}", field),
                    key,
                ));
            }
            filters.push((field.to_string(), Value::String(value.to_string())));
        }
        filters.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(filters)
    }

    fn parse_sort(&self) -> Result<Vec<SortField>, ApiError> {
        self.route
            .request()
            .query_list("sort")
            .into_iter()
            .map(|item| {
                let (field, direction) = match item.strip_prefix('-') {
                    Some(f) => (f.to_string(), SortDirection::Desc),
                    None => (item.clone(), SortDirection::Asc),
                };
                if !M::PROPERTIES.contains(&field.as_str()) {
                    return Err(ApiError::invalid_param(
                        format!("Invalid sort parameter: {}", field),
                        "sort",
                    ));
                }
                Ok(SortField { field, direction })
            })
            .collect()
    }

    fn query(&self) -> Query {
        Query {
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            limit: Some(self.per_page),
            offset: (self.page - 1).saturating_mul(self.per_page),
        }
    }

    /// Same request with `per_page` and `page` replaced; every other query parameter is kept.
    fn page_url(&self, page: u64) -> String {
        let request = self.route.request();
        let mut kept: Vec<(&str, &str)> = request
            .query_params()
            .filter(|(k, _)| *k != "page" && *k != "per_page")
            .collect();
        kept.sort_unstable();
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        query
            .extend_pairs(kept)
            .append_pair("per_page", &self.per_page.to_string())
            .append_pair("page", &page.to_string());
        format!("{}?{}", request.path(), query.finish())
    }

    /// RFC 5988 links for self, first, previous, next and last.
    fn link_header(&self, total: u64) -> String {
        let per_page = u64::from(self.per_page);
        let page = u64::from(self.page);
        let last = total.div_ceil(per_page).max(1);
        let mut links = vec![
            format!("<{}>; rel=\"self\"", self.page_url(page)),
            format!("<{}>; rel=\"first\"", self.page_url(1)),
        ];
        if page > 1 {
            links.push(format!("<{}>; rel=\"previous\"", self.page_url((page - 1).min(last))));
        }
        if page < last {
            links.push(format!("<{}>; rel=\"next\"", self.page_url(page + 1)));
        }
        links.push(format!("<{}>; rel=\"last\"", self.page_url(last)));
        links.join(", ")
    }

    pub async fn build_response(&mut self) -> Result<Vec<M>, ApiError> {
        self.route.authorize(Action::FindAll)?;
        let meta = M::meta();
        let query = self.query();
        let total = self.route.driver().count_models(&meta, &query).await?;
        let records = self.route.driver().query_models(&meta, &query).await?;
        let models = records
            .into_iter()
            .map(|r| serde_json::from_value(Value::Object(r)))
            .collect::<Result<Vec<M>, _>>()
            .map_err(DriverError::from)?;

        let link = self.link_header(total);
        let response = self.route.response_mut();
        response.set_header(TOTAL_COUNT, total.to_string());
        response.set_header(axum::http::header::LINK, link);
        Ok(models)
    }
}

#[async_trait]
impl<M: Model> Route for FindAllModelsRoute<M> {
    fn parse_request(&mut self) -> Result<(), ApiError> {
        if let Some(page) = self.parse_positive("page")? {
            self.page = page;
        }
        if let Some(per_page) = self.parse_positive("per_page")? {
            self.per_page = per_page.min(self.max_per_page);
        }
        self.filters = self.parse_filters()?;
        self.sort = self.parse_sort()?;
        Ok(())
    }

    async fn respond(&mut self) -> Result<Payload, ApiError> {
        Ok(Payload::collection(self.build_response().await?))
    }

    fn response_mut(&mut self) -> &mut ApiResponse {
        self.route.response_mut()
    }

    fn into_response(self) -> ApiResponse {
        self.route.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MemoryDriver;
    use crate::test_support::Person;
    use axum::http::{header, StatusCode};
    use serde_json::json;

    fn seeded() -> Result<Arc<MemoryDriver>, DriverError> {
        let driver = Arc::new(MemoryDriver::new());
        driver.seed(
            "people",
            (1..=5).map(|i| {
                let mut p = Person::new(i, &format!("P{}", i));
                p.age = Some(if i % 2 == 0 { 20 } else { 30 });
                p.into_record()
            }),
        )?;
        Ok(driver)
    }

    #[test]
    fn parses_paging_filters_and_sort() -> Result<(), ApiError> {
        let request = ApiRequest::new("/people")
            .with_query("page", "2")
            .with_query("per_page", "5000")
            .with_query("filter[age]", "30")
            .with_query("sort", "-age,name");
        let mut route = FindAllModelsRoute::<Person>::new(request, Arc::new(MemoryDriver::new()));
        route.parse_request()?;
        assert_eq!(route.page(), 2);
        assert_eq!(route.per_page(), MAX_PER_PAGE);
        assert_eq!(route.filters(), &[("age".to_string(), json!("30"))]);
        assert_eq!(
            route.sort(),
            &[
                SortField { field: "age".into(), direction: SortDirection::Desc },
                SortField { field: "name".into(), direction: SortDirection::Asc },
            ]
        );
        Ok(())
    }

    #[test]
    fn rejects_undeclared_filter_and_bad_page() {
        let request = ApiRequest::new("/people").with_query("filter[password]", "x");
        let mut route = FindAllModelsRoute::<Person>::new(request, Arc::new(MemoryDriver::new()));
        let err = route.parse_request().err();
        assert_eq!(err.map(|e| e.to_string()), Some("Invalid filter parameter: password".to_string()));

        let request = ApiRequest::new("/people").with_query("page", "0");
        let mut route = FindAllModelsRoute::<Person>::new(request, Arc::new(MemoryDriver::new()));
        let err = route.parse_request().err();
        assert_eq!(err.as_ref().map(ApiError::status), Some(StatusCode::BAD_REQUEST));
        assert_eq!(err.map(|e| e.to_string()), Some("Invalid page parameter: 0".to_string()));

        let request = ApiRequest::new("/people").with_query("sort", "-shoe_size");
        let mut route = FindAllModelsRoute::<Person>::new(request, Arc::new(MemoryDriver::new()));
        let err = route.parse_request().err();
        assert_eq!(err.map(|e| e.to_string()), Some("Invalid sort parameter: shoe_size".to_string()));
    }

    #[tokio::test]
    async fn pages_through_filtered_results() -> Result<(), Box<dyn std::error::Error>> {
        let request = ApiRequest::new("/people")
            .with_query("filter[age]", "30")
            .with_query("sort", "-name")
            .with_query("per_page", "2")
            .with_query("page", "1");
        let mut route = FindAllModelsRoute::<Person>::new(request, seeded()?);
        route.parse_request()?;
        let people = route.build_response().await?;

        let ids: Vec<_> = people.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![Some(5), Some(3)]);
        let response = route.route().response();
        assert_eq!(response.header(&TOTAL_COUNT), Some("3"));
        assert_eq!(
            response.header(&header::LINK),
            Some(
                "</people?filter%5Bage%5D=30&sort=-name&per_page=2&page=1>; rel=\"self\", \
                 </people?filter%5Bage%5D=30&sort=-name&per_page=2&page=1>; rel=\"first\", \
                 </people?filter%5Bage%5D=30&sort=-name&per_page=2&page=2>; rel=\"next\", \
                 </people?filter%5Bage%5D=30&sort=-name&per_page=2&page=2>; rel=\"last\""
            )
        );
        Ok(())
    }

    #[tokio::test]
    async fn next_link_keeps_the_filter() -> Result<(), Box<dyn std::error::Error>> {
        let request = ApiRequest::new("/people")
            .with_query("filter[age]", "30")
            .with_query("per_page", "2")
            .with_query("page", "2");
        let driver = seeded()?;
        let mut route = FindAllModelsRoute::<Person>::new(request, driver.clone());
        route.parse_request()?;
        let people = route.build_response().await?;
        assert_eq!(people.iter().map(|p| p.id).collect::<Vec<_>>(), vec![Some(5)]);

        let link = route.route().response().header(&header::LINK).unwrap_or_default().to_string();
        assert!(link.contains("</people?filter%5Bage%5D=30&per_page=2&page=1>; rel=\"previous\""));
        assert!(!link.contains("rel=\"next\""));

        // Following the previous link yields the first filtered page again.
        let request = ApiRequest::new("/people")
            .with_query("filter[age]", "30")
            .with_query("per_page", "2")
            .with_query("page", "1");
        let mut route = FindAllModelsRoute::<Person>::new(request, driver);
        route.parse_request()?;
        let people = route.build_response().await?;
        assert!(people.iter().all(|p| p.age == Some(30)));
        Ok(())
    }

    #[test]
    fn oversized_per_page_is_clamped() -> Result<(), ApiError> {
        let request = ApiRequest::new("/people").with_query("per_page", "99999999999");
        let mut route = FindAllModelsRoute::<Person>::new(request, Arc::new(MemoryDriver::new()))
            .with_page_limits(10, 50);
        route.parse_request()?;
        assert_eq!(route.per_page(), 50);

        let request = ApiRequest::new("/people").with_query("per_page", "-3");
        let mut route = FindAllModelsRoute::<Person>::new(request, Arc::new(MemoryDriver::new()));
        assert!(route.parse_request().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn page_limits_come_from_configuration() -> Result<(), Box<dyn std::error::Error>> {
        let mut route = FindAllModelsRoute::<Person>::new(ApiRequest::new("/people"), seeded()?)
            .with_page_limits(2, 3);
        route.parse_request()?;
        assert_eq!(route.per_page(), 2);
        let people = route.build_response().await?;
        assert_eq!(people.len(), 2);
        Ok(())
    }
}
