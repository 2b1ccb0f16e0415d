//! Gateway behaviour across process restarts, using a real disk tier.

use std::sync::Arc;

use momshero_core::cache::DEFAULT_TTL;
use momshero_core::prompts::{render_detail_prompt, render_recommend_prompt};
use momshero_core::{
    CallKind, ConversationInterface, ConversationOrchestrator, FakeModel, LlmError, ModelGateway,
    ResponseCache, RetryPolicy, Stage,
};
use tempfile::TempDir;

fn gateway(model: Arc<FakeModel>, dir: &TempDir) -> ModelGateway {
    let cache = ResponseCache::new(Some(dir.path().to_path_buf()), DEFAULT_TTL);
    ModelGateway::new(model, Arc::new(cache)).with_retry_policy(RetryPolicy::immediate(3))
}

fn fridge() -> Vec<String> {
    vec!["雞蛋".to_string(), "白飯".to_string(), "蔥".to_string()]
}

#[tokio::test]
async fn test_disk_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let prompt = render_recommend_prompt(&fridge(), &[]);

    let first_model = Arc::new(FakeModel::with_recipe_responses());
    let first = gateway(first_model.clone(), &dir);
    let recipes = first.recommendations(&prompt).await.unwrap();
    assert_eq!(recipes.len(), 3);
    assert_eq!(first_model.call_count(), 1);

    let second_model = Arc::new(FakeModel::always_failing(LlmError::RequestFailed(
        "offline".to_string(),
    )));
    let second = gateway(second_model.clone(), &dir);
    let cached = second.recommendations(&prompt).await.unwrap();

    assert_eq!(cached, recipes);
    assert_eq!(second_model.call_count(), 0);
    assert_eq!(second.cache().stats().hits, 1);
}

#[tokio::test]
async fn test_unparseable_cache_entry_is_regenerated() {
    let dir = TempDir::new().unwrap();
    let prompt = render_detail_prompt("蔥花蛋炒飯", &fridge());

    let model = Arc::new(FakeModel::with_recipe_responses());
    let gateway = gateway(model.clone(), &dir);
    let key = momshero_core::CacheKey::new(CallKind::Detail, &prompt);
    gateway.cache().set(&key, "這不是 JSON，只是一段很長的文字而已。");

    let recipe = gateway.detail(&prompt).await.unwrap();
    assert_eq!(recipe.name, "蔥花蛋炒飯");
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_assistant_resumes_from_disk_cache() {
    let dir = TempDir::new().unwrap();

    let warm = ConversationOrchestrator::new(Arc::new(gateway(
        Arc::new(FakeModel::with_recipe_responses()),
        &dir,
    )));
    warm.handle("u1", "我有雞蛋、白飯、蔥").await;

    let cold_model = Arc::new(FakeModel::always_failing(LlmError::RateLimited {
        retry_after_secs: None,
    }));
    let cold = ConversationOrchestrator::new(Arc::new(gateway(cold_model.clone(), &dir)));
    cold.handle("u2", "我有雞蛋、白飯、蔥").await;

    assert_eq!(cold_model.call_count(), 0);
    assert_eq!(
        cold.store().get_or_create("u2").await.stage,
        Stage::CollectingIngredients
    );
}
