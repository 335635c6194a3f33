use anyhow::Result;
use slotflow::config::HostConfig;
use slotflow::core::Value;
use slotflow::engine::BlockActor;
use slotflow::observability;
use slotflow::registry::BlockRegistry;
use slotflow::resilience::ErrorPolicy;

#[tokio::main]
async fn main() -> Result<()> {
    let host = HostConfig::default().with_error_policy(ErrorPolicy::Skip);
    observability::init_logging(&host.logging);

    println!("slotflow - Evaluator Demo");
    println!("=========================\n");

    let registry = BlockRegistry::collect();
    println!("Registered blocks: {:?}\n", registry.paths());

    // Two inputs, a json import and a local constant
    let config = serde_json::json!({
        "args": ["a", "b"],
        "imports": ["math", "json"],
        "localVars": {"scale": 10},
        "expr": "math.sqrt(a ** 2 + b ** 2) * scale"
    });
    let block = registry.make_with_config("/blocks/evaluator", &config)?;
    let actor = BlockActor::spawn(block, &host);
    let mut results = actor.subscribe("triggered").await?;

    println!("Setting a = 3 (b still missing, nothing is emitted)");
    actor.call("setA", vec![Value::Int(3)]).await?;

    for b in [4, 0, 12] {
        println!("Setting b = {}", b);
        actor.call("setB", vec![Value::Int(b)]).await?;
        if let Some(args) = results.recv().await {
            println!("  triggered({})", args[0]);
        }
    }

    println!("\nSwitching expression");
    actor
        .call(
            "setExpression",
            vec![Value::from("json.dumps({'a': a, 'b': b, 'max': max(a, b)})")],
        )
        .await?;
    if let Some(args) = results.recv().await {
        println!("  triggered({})", args[0]);
    }

    println!("\nAn evaluation error is reported to the caller");
    if let Err(e) = actor.call("setExpression", vec![Value::from("a / 0")]).await {
        println!("  error: {}", e);
    }

    println!("\n{}", actor.metrics().snapshot());

    let handle = actor.handle();
    actor.shutdown().await?;
    println!("Final state: {}", handle.state().name());
    Ok(())
}
