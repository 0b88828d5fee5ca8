use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use serving_scaler::coordinator::{ScalingPhase, ScalingSnapshot};
use serving_scaler::ingredient_model::{IngredientSpec, Recipe};
use serving_scaler::orchestrator::ScalingOrchestrator;
use serving_scaler::quantity_resolver::{is_scaled_value, resolve};
use serving_scaler::scaling_config::ScalingConfig;
use serving_scaler::scaling_service::HttpScalingService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting serving scaler");

    // Loads .env as well
    let config = ScalingConfig::from_env()?;

    let service_url =
        env::var("SCALER_SERVICE_URL").context("SCALER_SERVICE_URL must be set")?;
    let recipe_path = env::args()
        .nth(1)
        .context("usage: serving-scaler <recipe.json>")?;

    let raw = tokio::fs::read_to_string(&recipe_path)
        .await
        .with_context(|| format!("Failed to read recipe file {recipe_path}"))?;
    let recipe: Recipe = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse recipe file {recipe_path}"))?;
    let ingredients = recipe.ingredients.clone();

    let service = Arc::new(HttpScalingService::new(
        &service_url,
        config.recovery.operation_timeout(),
    )?);
    info!(endpoint = service.endpoint(), "Using scaling service");

    let session = ScalingOrchestrator::new(recipe, service, config)?;
    println!(
        "Original servings: {} (enter a number, '+', '-', 'reset' or 'quit')",
        session.original_servings()
    );

    // Print each state change except the debounce wait
    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            match snapshot.phase {
                ScalingPhase::Debouncing => continue,
                ScalingPhase::Calling => {
                    println!("Scaling to {} servings...", snapshot.servings);
                    continue;
                }
                _ => {}
            }
            print_quantities(&snapshot, &ingredients);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "+" => {
                session.increment();
            }
            "-" => {
                session.decrement();
            }
            "reset" => {
                session.reset();
            }
            other => match other.parse::<i64>() {
                Ok(count) => {
                    let applied = session.set_servings(count);
                    if i64::from(applied) != count {
                        warn!(requested = count, applied, "Serving count clamped");
                    }
                }
                Err(_) => println!("Not a serving count: {other}"),
            },
        }
    }

    session.shutdown();
    drop(session);
    printer.abort();
    info!("Serving scaler stopped");
    Ok(())
}

fn print_quantities(snapshot: &ScalingSnapshot, ingredients: &[IngredientSpec]) {
    println!("\n{} servings:", snapshot.servings);
    for ingredient in ingredients {
        let resolved = resolve(
            snapshot.active.as_deref(),
            &ingredient.id,
            &ingredient.name,
            &ingredient.quantity,
        );
        if is_scaled_value(&resolved, &ingredient.quantity) {
            println!("  • {} {} (was {})", resolved, ingredient.name, ingredient.quantity);
        } else {
            println!("  • {ingredient}");
        }
    }
    if let Some(notes) = snapshot.cooking_notes() {
        println!("Notes: {notes}");
    }
    if let Some(error) = &snapshot.error {
        println!("⚠️ {error}");
    }
}
