//! # Scaling Session Tests
//!
//! End-to-end behavior of a scaling session against an in-memory scaling
//! service: clamping, debouncing, supersession, caching, and failure recovery.
//! All tests run on a paused clock so debounce windows are deterministic.

mod common;

use common::{pancake_recipe, wait_ms, MockScalingService};
use serving_scaler::coordinator::ScalingPhase;
use serving_scaler::ingredient_model::{IngredientSpec, Recipe};
use serving_scaler::orchestrator::ScalingOrchestrator;
use serving_scaler::scaling_config::{RecoveryConfig, ScalingConfig};
use std::sync::Arc;
use std::time::Duration;

fn session_with(
    recipe: Recipe,
    service: &Arc<MockScalingService>,
    config: ScalingConfig,
) -> ScalingOrchestrator {
    ScalingOrchestrator::new(recipe, service.clone(), config).unwrap()
}

fn session(service: &Arc<MockScalingService>) -> ScalingOrchestrator {
    session_with(pancake_recipe(), service, ScalingConfig::default())
}

fn mock(delay_ms: u64) -> Arc<MockScalingService> {
    Arc::new(MockScalingService::new(Duration::from_millis(delay_ms)))
}

#[tokio::test(start_paused = true)]
async fn test_set_servings_clamps_every_input() {
    let service = mock(100);
    let session = session(&service);

    for n in -5i64..=30 {
        let applied = session.set_servings(n);
        assert_eq!(applied, n.clamp(1, 20) as u32);
        assert_eq!(session.servings(), applied);
    }
}

#[tokio::test(start_paused = true)]
async fn test_original_servings_is_a_no_op() {
    let service = mock(100);
    let session = session(&service);
    assert_eq!(session.original_servings(), 4);

    session.set_servings(4);
    wait_ms(1_000).await;

    assert!(!session.is_scaling());
    assert_eq!(service.call_count(), 0);
    for ingredient in pancake_recipe().ingredients {
        assert_eq!(
            session.resolve_quantity(&ingredient.id, &ingredient.name, &ingredient.quantity),
            ingredient.quantity
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_reset_after_scaling_shows_original_quantities() {
    let service = mock(100);
    let session = session(&service);

    session.set_servings(8);
    wait_ms(500).await;
    assert_eq!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g@8");

    assert_eq!(session.reset(), 4);
    assert!(!session.is_scaling());
    assert_eq!(session.snapshot().phase, ScalingPhase::Idle);
    assert_eq!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g");

    wait_ms(1_000).await;
    assert_eq!(service.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_changes_issue_one_call_for_latest_target() {
    let service = mock(100);
    let session = session(&service);

    session.set_servings(5);
    wait_ms(50).await;
    session.set_servings(6);
    wait_ms(50).await;
    session.set_servings(7);
    assert!(!session.is_scaling());

    wait_ms(1_000).await;

    assert_eq!(service.requested_targets(), vec![7]);
    assert_eq!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g@7");
    assert!(!session.is_scaling());
}

#[tokio::test(start_paused = true)]
async fn test_each_change_restarts_the_quiet_period() {
    let service = mock(100);
    let session = session(&service);

    // changes 250ms apart never leave a 300ms gap
    for n in 5..=9 {
        session.set_servings(n);
        wait_ms(250).await;
    }
    assert_eq!(service.call_count(), 0);

    wait_ms(1_000).await;
    assert_eq!(service.requested_targets(), vec![9]);
}

#[tokio::test(start_paused = true)]
async fn test_superseded_result_is_cached_but_not_published() {
    let service = mock(100);
    let session = session(&service);

    // call for 5 goes out at 300ms and lands at 400ms, while 6 is debouncing
    session.set_servings(5);
    wait_ms(350).await;
    assert!(session.is_scaling());
    session.set_servings(6);

    wait_ms(100).await;
    assert_eq!(session.servings(), 6);
    assert_ne!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g@5");
    assert_eq!(session.cached_targets(), 1);

    wait_ms(1_000).await;
    assert_eq!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g@6");
    assert_eq!(service.requested_targets(), vec![5, 6]);

    // returning to 5 is served from cache
    session.set_servings(5);
    assert_eq!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g@5");
    wait_ms(1_000).await;
    assert_eq!(service.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_stale_call_does_not_clobber_cached_target() {
    let service = mock(100);
    service.delay_for(5, Duration::from_secs(2));
    let session = session(&service);

    session.set_servings(8);
    wait_ms(500).await;
    assert_eq!(service.call_count(), 1);

    session.set_servings(5);
    wait_ms(400).await;
    assert!(session.is_scaling());

    // 8 is cached: adopted at once while the call for 5 is still running
    session.set_servings(8);
    assert!(!session.is_scaling());
    assert_eq!(session.resolve_quantity("ing-2", "Milk", "300 ml"), "300 ml@8");

    wait_ms(3_000).await;
    assert_eq!(session.servings(), 8);
    assert_eq!(session.resolve_quantity("ing-2", "Milk", "300 ml"), "300 ml@8");

    session.set_servings(5);
    assert_eq!(session.resolve_quantity("ing-2", "Milk", "300 ml"), "300 ml@5");
    assert_eq!(service.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cache_hit_needs_no_remote_call() {
    let service = mock(100);
    let session = session(&service);

    session.set_servings(8);
    wait_ms(500).await;
    let first = session.snapshot().active.unwrap();

    session.set_servings(3);
    session.set_servings(8);
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, ScalingPhase::Published);
    assert!(Arc::ptr_eq(&first, &snapshot.active.unwrap()));

    wait_ms(1_000).await;
    assert_eq!(service.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resolve_falls_back_by_name_then_original() {
    let service = mock(100);
    let recipe = pancake_recipe();
    let session = session_with(recipe, &service, ScalingConfig::default());

    assert_eq!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g");

    session.set_servings(8);
    wait_ms(500).await;

    // id unknown to the service but the name matches
    assert_eq!(session.resolve_quantity("local-7", "flour", "200 g"), "200 g@8");
    // Salt had no quantity, so it was never sent
    assert_eq!(session.resolve_quantity("ing-4", "Salt", ""), "");
    assert_eq!(session.resolve_quantity("ing-9", "Sugar", "1 tbsp"), "1 tbsp");
}

#[tokio::test(start_paused = true)]
async fn test_request_carries_recipe_context() {
    let service = mock(100);
    let session = session(&service);

    session.set_servings(6);
    wait_ms(500).await;

    let request = service.last_request().unwrap();
    assert_eq!(request.original_servings, 4);
    assert_eq!(request.desired_servings, 6);
    assert_eq!(request.recipe_title.as_deref(), Some("Pancakes"));
    assert_eq!(request.ingredients.len(), 3);
    assert_eq!(request.ingredients[0].preparation.as_deref(), Some("sifted"));
}

#[tokio::test(start_paused = true)]
async fn test_original_servings_parsed_from_portions() {
    let service = mock(100);

    let mut recipe = pancake_recipe();
    recipe.portions = Some("Serves 0".to_string());
    assert_eq!(session_with(recipe, &service, ScalingConfig::default()).original_servings(), 4);

    let mut recipe = pancake_recipe();
    recipe.portions = None;
    assert_eq!(session_with(recipe, &service, ScalingConfig::default()).original_servings(), 4);

    let mut recipe = pancake_recipe();
    recipe.portions = Some("Makes 12 crepes".to_string());
    let session = session_with(recipe, &service, ScalingConfig::default());
    assert_eq!(session.original_servings(), 12);
    assert_eq!(session.servings(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_failure_reverts_to_original_quantities() {
    let service = mock(100);
    service.fail_for(9);
    let session = session(&service);

    session.set_servings(8);
    wait_ms(500).await;
    assert_eq!(session.resolve_quantity("ing-3", "Eggs", "2"), "2@8");

    session.set_servings(9);
    wait_ms(500).await;

    assert!(!session.is_scaling());
    assert!(session.snapshot().active.is_none());
    assert_eq!(session.snapshot().phase, ScalingPhase::Reverted);
    assert!(!session.error().unwrap().is_empty());
    assert_eq!(session.resolve_quantity("ing-3", "Eggs", "2"), "2");

    // retry by changing servings again
    service.recover(9);
    session.set_servings(10);
    wait_ms(500).await;
    assert!(session.error().is_none());
    assert_eq!(session.resolve_quantity("ing-3", "Eggs", "2"), "2@10");
}

#[tokio::test(start_paused = true)]
async fn test_failed_target_is_not_cached() {
    let service = mock(100);
    service.fail_for(9);
    let session = session(&service);

    session.set_servings(9);
    wait_ms(500).await;
    assert_eq!(session.cached_targets(), 0);

    service.recover(9);
    session.set_servings(8);
    session.set_servings(9);
    wait_ms(500).await;
    assert_eq!(service.requested_targets(), vec![9, 9]);
    assert_eq!(session.resolve_quantity("ing-3", "Eggs", "2"), "2@9");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_reported_as_failure() {
    let service = mock(100);
    service.delay_for(6, Duration::from_secs(30));
    let config = ScalingConfig {
        recovery: RecoveryConfig {
            operation_timeout_secs: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let session = session_with(pancake_recipe(), &service, config);

    session.set_servings(6);
    wait_ms(1_000).await;
    assert!(session.is_scaling());

    wait_ms(500).await;
    assert!(!session.is_scaling());
    assert!(session.error().unwrap().contains("too long"));
}

#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_stops_calling_failing_service() {
    let service = mock(100);
    for n in [6, 7, 9] {
        service.fail_for(n);
    }
    let config = ScalingConfig {
        recovery: RecoveryConfig {
            circuit_breaker_threshold: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let session = session_with(pancake_recipe(), &service, config);

    session.set_servings(6);
    wait_ms(500).await;
    session.set_servings(7);
    wait_ms(500).await;
    assert_eq!(service.call_count(), 2);

    session.set_servings(9);
    wait_ms(500).await;
    assert_eq!(service.call_count(), 2);
    assert!(session.error().unwrap().contains("temporarily unavailable"));
    assert!(!session.is_scaling());
}

#[tokio::test(start_paused = true)]
async fn test_nothing_to_scale_skips_remote_call() {
    let service = mock(100);
    let recipe = Recipe {
        title: None,
        portions: Some("2".to_string()),
        ingredients: vec![
            IngredientSpec::new("a", "Salt", ""),
            IngredientSpec::new("b", "Pepper", " "),
        ],
    };
    let session = session_with(recipe, &service, ScalingConfig::default());

    session.set_servings(6);
    assert!(!session.is_scaling());
    wait_ms(1_000).await;

    assert_eq!(service.call_count(), 0);
    assert!(session.error().is_none());
    assert_eq!(session.resolve_quantity("a", "Salt", ""), "");
}

#[tokio::test(start_paused = true)]
async fn test_cooking_notes_follow_active_result() {
    let service = Arc::new(
        MockScalingService::new(Duration::from_millis(100)).with_notes("Use a larger pan."),
    );
    let session = session(&service);
    assert!(session.cooking_notes().is_none());

    session.set_servings(10);
    wait_ms(500).await;
    assert_eq!(session.cooking_notes().as_deref(), Some("Use a larger pan."));

    session.reset();
    assert!(session.cooking_notes().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_replace_ingredients_clears_cache() {
    let service = mock(100);
    let session = session(&service);

    session.set_servings(8);
    wait_ms(500).await;
    assert_eq!(session.cached_targets(), 1);

    session.replace_ingredients(vec![IngredientSpec::new("ing-1", "Rice", "150 g")]);
    assert_eq!(session.servings(), 4);
    assert_eq!(session.cached_targets(), 0);
    assert_eq!(session.resolve_quantity("ing-1", "Rice", "150 g"), "150 g");

    session.set_servings(8);
    wait_ms(500).await;
    assert_eq!(service.call_count(), 2);
    assert_eq!(session.resolve_quantity("ing-1", "Rice", "150 g"), "150 g@8");
}

#[tokio::test(start_paused = true)]
async fn test_increment_and_decrement_stay_in_range() {
    let service = mock(100);
    let session = session(&service);

    assert_eq!(session.increment(), 5);
    assert_eq!(session.decrement(), 4);

    session.set_servings(20);
    assert_eq!(session.increment(), 20);
    session.set_servings(1);
    assert_eq!(session.decrement(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_cancels_pending_work() {
    let service = mock(100);
    let session = session(&service);

    session.set_servings(8);
    drop(session);
    wait_ms(1_000).await;

    assert_eq!(service.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_receive_phase_changes() {
    let service = mock(100);
    let session = session(&service);
    let mut updates = session.subscribe();

    session.set_servings(7);
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().phase, ScalingPhase::Debouncing);

    updates.changed().await.unwrap();
    assert!(updates.borrow_and_update().is_scaling());

    updates.changed().await.unwrap();
    let published = updates.borrow_and_update().clone();
    assert_eq!(published.phase, ScalingPhase::Published);
    assert_eq!(published.servings, 7);
}

#[tokio::test(start_paused = true)]
async fn test_repeating_in_flight_target_keeps_single_call() {
    let service = mock(1_000);
    let session = session(&service);

    session.set_servings(20);
    wait_ms(350).await;
    assert!(session.is_scaling());

    // "+" at the upper bound clamps back to the target already being fetched
    assert_eq!(session.increment(), 20);
    assert!(session.is_scaling());

    wait_ms(3_000).await;
    assert_eq!(service.requested_targets(), vec![20]);
    assert_eq!(session.resolve_quantity("ing-1", "Flour", "200 g"), "200 g@20");
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_in_flight_target_cancels_detour() {
    let service = mock(1_000);
    let session = session(&service);

    session.set_servings(8);
    wait_ms(350).await;
    session.set_servings(6);
    wait_ms(100).await;
    session.set_servings(8);
    assert!(session.is_scaling());

    wait_ms(3_000).await;
    assert_eq!(service.requested_targets(), vec![8]);
    assert_eq!(session.servings(), 8);
    assert_eq!(session.resolve_quantity("ing-2", "Milk", "300 ml"), "300 ml@8");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_changes_leave_one_serving_count() {
    let service = mock(100);
    let session = Arc::new(session(&service));
    let updates = session.subscribe();

    let handles: Vec<_> = (1..=16)
        .map(|n| {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                for _ in 0..20 {
                    session.set_servings(n);
                    session.increment();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let snapshot = session.snapshot();
    assert_eq!(session.servings(), snapshot.servings);
    assert_eq!(updates.borrow().servings, snapshot.servings);
    assert!((1..=20).contains(&snapshot.servings));
}
