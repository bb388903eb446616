//! Scenario CRUD. Mirrors [`super::GameService`] with one difference:
//! update and delete require the requesting userId to equal the
//! scenario's `creatorId`.

use std::sync::Arc;

use protocol::{clamp_limit, Scenario, ScenariosPage};

use crate::error::AppError;
use crate::store::{IndexEntry, Page, PutCondition, Store, Table};

pub const SCENARIOS_ALL_INDEX: &str = "all_scenarios";
const ALL_SCENARIOS_PARTITION: &str = "ALL_SCENARIOS";

pub struct ScenarioService {
    store: Arc<dyn Store>,
}

impl ScenarioService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        ScenarioService { store }
    }

    pub async fn create_scenario(&self, scenario: Scenario) -> Result<Scenario, AppError> {
        self.put(&scenario, PutCondition::IfAbsent).await?;
        Ok(scenario)
    }

    pub async fn get_scenario(&self, scenario_id: &str) -> Result<Scenario, AppError> {
        let value = self
            .store
            .get(Table::Scenarios, scenario_id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn update_scenario(&self, user_id: &str, scenario_id: &str, mut updated: Scenario) -> Result<Scenario, AppError> {
        let current = self.get_scenario(scenario_id).await?;
        if current.creator_id != user_id {
            return Err(AppError::Forbidden);
        }
        updated.scenario_id = scenario_id.to_string();
        updated.creator_id = current.creator_id;
        updated.created_at = current.created_at;
        self.put(&updated, PutCondition::Always).await?;
        Ok(updated)
    }

    pub async fn delete_scenario(&self, user_id: &str, scenario_id: &str) -> Result<(), AppError> {
        let current = self.get_scenario(scenario_id).await?;
        if current.creator_id != user_id {
            return Err(AppError::Forbidden);
        }
        self.store.delete(Table::Scenarios, scenario_id).await?;
        Ok(())
    }

    pub async fn list_scenarios(&self, limit: Option<u32>, token: Option<String>) -> Result<ScenariosPage, AppError> {
        let limit = clamp_limit(limit);
        let page = self
            .store
            .query(Table::Scenarios, SCENARIOS_ALL_INDEX, ALL_SCENARIOS_PARTITION, Page { limit, token })
            .await?;
        let scenarios = page
            .items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Scenario>, _>>()?;
        Ok(ScenariosPage {
            count: scenarios.len(),
            has_more: page.next_token.is_some(),
            next_token: page.next_token,
            scenarios,
        })
    }

    async fn put(&self, scenario: &Scenario, condition: PutCondition) -> Result<(), AppError> {
        let value = serde_json::to_value(scenario)?;
        self.store
            .put(
                Table::Scenarios,
                &scenario.scenario_id,
                value,
                vec![IndexEntry::new(SCENARIOS_ALL_INDEX, ALL_SCENARIOS_PARTITION, -scenario.created_at)],
                condition,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn sample(id: &str, creator: &str, created_at: i64) -> Scenario {
        Scenario {
            scenario_id: id.into(),
            creator_id: creator.into(),
            title: "t".into(),
            description: "d".into(),
            columns: 4,
            rows: 4,
            turn_count: 10,
            hexes: vec![],
            created_at,
        }
    }

    #[tokio::test]
    async fn create_then_get_roundtrips() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = ScenarioService::new(store);
        service.create_scenario(sample("s1", "uA", 0)).await.unwrap();
        let got = service.get_scenario("s1").await.unwrap();
        assert_eq!(got.creator_id, "uA");
    }

    #[tokio::test]
    async fn update_requires_creator() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = ScenarioService::new(store);
        service.create_scenario(sample("s1", "uA", 0)).await.unwrap();

        let err = service
            .update_scenario("uB", "s1", sample("s1", "uB", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let mut edit = sample("s1", "uA", 0);
        edit.title = "renamed".into();
        let updated = service.update_scenario("uA", "s1", edit).await.unwrap();
        assert_eq!(updated.title, "renamed");
    }

    #[tokio::test]
    async fn delete_requires_creator() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = ScenarioService::new(store);
        service.create_scenario(sample("s1", "uA", 0)).await.unwrap();

        assert!(matches!(service.delete_scenario("uB", "s1").await.unwrap_err(), AppError::Forbidden));
        service.delete_scenario("uA", "s1").await.unwrap();
        assert!(matches!(service.get_scenario("s1").await.unwrap_err(), AppError::NotFound));
    }

    #[tokio::test]
    async fn list_scenarios_orders_newest_first() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = ScenarioService::new(store);
        service.create_scenario(sample("s1", "uA", 0)).await.unwrap();
        service.create_scenario(sample("s2", "uA", 100)).await.unwrap();

        let page = service.list_scenarios(None, None).await.unwrap();
        assert_eq!(page.scenarios[0].scenario_id, "s2");
        assert_eq!(page.scenarios[1].scenario_id, "s1");
    }
}
