use tracing::{info, warn};
use ureq::Agent;

use crate::config::SupabaseConfig;
use crate::data::Record;
use crate::errors::LeadsError;
use crate::filter::FilterSpec;
use crate::store::postgrest::PostgrestQuery;
use crate::store::{RecordStore, decode_rows};

/// Record store reading a Supabase table through its PostgREST API.
///
/// Each call is a single blocking GET. Non-success statuses surface as
/// `LeadsError::BackendRejected` with the response body; transport failures
/// as `LeadsError::BackendUnavailable`.
pub struct SupabaseStore {
    config: SupabaseConfig,
    agent: Agent,
}

impl SupabaseStore {
    /// Validate `config` and build a store.
    pub fn new(config: SupabaseConfig) -> Result<Self, LeadsError> {
        config.validate()?;
        let agent = Agent::new_with_config(
            Agent::config_builder().http_status_as_error(false).build(),
        );
        Ok(Self { config, agent })
    }

    /// Settings this store was built with.
    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn execute(&self, query: &PostgrestQuery) -> Result<Vec<Record>, LeadsError> {
        let collection = &self.config.collection;
        let endpoint = self.config.table_url();
        info!(
            "[construleads:store] GET {} ?{}",
            endpoint,
            query.describe()
        );

        let mut request = self
            .agent
            .get(&endpoint)
            .header("apikey", self.config.api_key.as_str())
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_key).as_str(),
            )
            .header("Accept", "application/json");
        for (key, value) in query.pairs() {
            request = request.query(key, value);
        }

        let response = request
            .call()
            .map_err(|err| LeadsError::BackendUnavailable {
                collection: collection.clone(),
                reason: format!("request to {endpoint} failed: {err}"),
            })?;
        let status = response.status();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|err| LeadsError::BackendUnavailable {
                collection: collection.clone(),
                reason: format!("failed reading response body: {err}"),
            })?;

        if !status.is_success() {
            warn!(
                "[construleads:store] backend rejected query on '{}' with status {}",
                collection,
                status.as_u16()
            );
            return Err(LeadsError::BackendRejected {
                collection: collection.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let records = decode_rows(collection, &body)?;
        info!(
            "[construleads:store] received {} rows from '{}'",
            records.len(),
            collection
        );
        Ok(records)
    }
}

impl RecordStore for SupabaseStore {
    fn collection(&self) -> &str {
        &self.config.collection
    }

    fn fetch_all(&self) -> Result<Vec<Record>, LeadsError> {
        self.execute(&PostgrestQuery::select(&self.config.projection))
    }

    fn fetch_filtered(&self, spec: &FilterSpec) -> Result<Vec<Record>, LeadsError> {
        self.execute(&PostgrestQuery::filtered(&self.config.projection, spec))
    }
}
