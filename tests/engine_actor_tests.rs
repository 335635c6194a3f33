use async_trait::async_trait;
use slotflow::blocks::Evaluator;
use slotflow::config::HostConfig;
use slotflow::core::{Block, BlockError, Signals, Value};
use slotflow::engine::{BlockActor, BlockState};
use slotflow::resilience::ErrorPolicy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn evaluator(expr: &str) -> Box<dyn Block> {
    let mut evaluator = Evaluator::new(vec!["val"]).unwrap();
    evaluator.set_imports("math").unwrap();
    evaluator.set_expression(expr).unwrap();
    Box::new(evaluator)
}

#[tokio::test]
async fn test_call_returns_emissions() {
    let actor = BlockActor::spawn(evaluator("val * 2"), &HostConfig::default());

    let emitted = actor.call("setVal", vec![Value::Int(21)]).await.unwrap();

    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].signal, "triggered");
    assert_eq!(emitted[0].args, vec![Value::Int(42)]);
    assert_eq!(actor.state(), BlockState::Active);

    actor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_subscribers_receive_in_order() {
    let actor = BlockActor::spawn(evaluator("val + 1"), &HostConfig::default());
    let mut results = actor.subscribe("triggered").await.unwrap();

    for i in 0..10 {
        actor.post("setVal", vec![Value::Int(i)]).await.unwrap();
    }

    for i in 0..10 {
        let args = results.recv().await.unwrap();
        assert_eq!(args, vec![Value::Int(i + 1)]);
    }
    actor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_callers_are_serialized() {
    let actor = BlockActor::spawn(evaluator("val"), &HostConfig::default());
    let mut tasks = Vec::new();
    for i in 0..20 {
        let handle = actor.handle();
        tasks.push(tokio::spawn(async move {
            handle.call("setVal", vec![Value::Int(i)]).await
        }));
    }
    for task in tasks {
        let emitted = task.await.unwrap().unwrap();
        assert_eq!(emitted.len(), 1);
    }

    assert_eq!(actor.metrics().calls(), 20);
    assert_eq!(actor.metrics().emissions(), 20);
    actor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_stalled_subscriber_does_not_block_actor() {
    let config = HostConfig {
        inbox_capacity: 2,
        ..HostConfig::default()
    };
    let actor = BlockActor::spawn(evaluator("val"), &config);
    let mut stalled = actor.subscribe("triggered").await.unwrap();

    for i in 0..5 {
        let emitted = timeout(Duration::from_secs(2), actor.call("setVal", vec![Value::Int(i)]))
            .await
            .expect("slot call blocked behind a full subscriber")
            .unwrap();
        assert_eq!(emitted[0].args, vec![Value::Int(i)]);
    }

    timeout(Duration::from_secs(2), actor.shutdown())
        .await
        .expect("shutdown blocked behind a full subscriber")
        .unwrap();

    // The queue kept the first emissions and dropped the overflow
    assert_eq!(stalled.recv().await, Some(vec![Value::Int(0)]));
    assert_eq!(stalled.recv().await, Some(vec![Value::Int(1)]));
    assert_eq!(stalled.recv().await, None);
}

#[tokio::test]
async fn test_dropped_subscriber_is_removed() {
    let actor = BlockActor::spawn(evaluator("val"), &HostConfig::default());
    drop(actor.subscribe("triggered").await.unwrap());
    let mut live = actor.subscribe("triggered").await.unwrap();

    actor.call("setVal", vec![Value::Int(7)]).await.unwrap();
    assert_eq!(live.recv().await, Some(vec![Value::Int(7)]));
    actor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_subscribe_unknown_signal() {
    let actor = BlockActor::spawn(evaluator("val"), &HostConfig::default());
    let err = actor.subscribe("finished").await.unwrap_err();

    assert_eq!(
        err.downcast_ref::<BlockError>(),
        Some(&BlockError::UnknownSignal("finished".to_string()))
    );
    actor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_propagate_policy_stops_block() {
    let actor = BlockActor::spawn(evaluator("math.log2(val)"), &HostConfig::default());
    let handle = actor.handle();

    let err = actor.call("setVal", vec![Value::Int(0)]).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BlockError>(),
        Some(BlockError::Evaluation(_))
    ));

    let mut state = handle.watch_state();
    state
        .wait_for(|s| matches!(s, BlockState::Error { .. }))
        .await
        .unwrap();
    assert!(handle.call("setVal", vec![Value::Int(8)]).await.is_err());

    assert!(actor.shutdown().await.is_err());
    assert_eq!(handle.metrics().errors_count(), 1);
}

#[tokio::test]
async fn test_skip_policy_keeps_serving() {
    let config = HostConfig::default().with_error_policy(ErrorPolicy::Skip);
    let actor = BlockActor::spawn(evaluator("math.log2(val)"), &config);

    assert!(actor.call("setVal", vec![Value::Int(-1)]).await.is_err());
    let emitted = actor.call("setVal", vec![Value::Int(8)]).await.unwrap();

    assert_eq!(emitted[0].args, vec![Value::Float(3.0)]);
    assert_eq!(actor.state(), BlockState::Active);
    assert_eq!(actor.metrics().errors_count(), 1);

    let handle = actor.handle();
    actor.shutdown().await.unwrap();
    assert_eq!(handle.state(), BlockState::Inactive);
}

struct LifecycleCounter {
    activations: Arc<AtomicUsize>,
    deactivations: Arc<AtomicUsize>,
}

#[async_trait]
impl Block for LifecycleCounter {
    fn path(&self) -> &str {
        "/tests/counter"
    }

    fn slots(&self) -> Vec<String> {
        vec!["ping".to_string()]
    }

    fn signals(&self) -> Vec<String> {
        vec!["pong".to_string()]
    }

    fn call_slot(&mut self, slot: &str, args: Vec<Value>, signals: &mut Signals) -> Result<(), BlockError> {
        match slot {
            "ping" => {
                // Activation must have happened before any slot call
                assert_eq!(self.activations.load(Ordering::SeqCst), 1);
                signals.emit("pong", args);
                Ok(())
            }
            other => Err(BlockError::UnknownSlot(other.to_string())),
        }
    }

    async fn activate(&mut self) -> Result<(), BlockError> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<(), BlockError> {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_lifecycle_hooks() {
    let activations = Arc::new(AtomicUsize::new(0));
    let deactivations = Arc::new(AtomicUsize::new(0));
    let counter = LifecycleCounter {
        activations: activations.clone(),
        deactivations: deactivations.clone(),
    };

    let actor = BlockActor::spawn(Box::new(counter), &HostConfig::default());
    let emitted = actor.call("ping", vec![Value::from("x")]).await.unwrap();
    assert_eq!(emitted[0].signal, "pong");

    let handle = actor.handle();
    actor.shutdown().await.unwrap();

    assert_eq!(activations.load(Ordering::SeqCst), 1);
    assert_eq!(deactivations.load(Ordering::SeqCst), 1);
    assert_eq!(handle.state(), BlockState::Inactive);
}

#[tokio::test]
async fn test_dropping_all_handles_deactivates() {
    let deactivations = Arc::new(AtomicUsize::new(0));
    let counter = LifecycleCounter {
        activations: Arc::new(AtomicUsize::new(0)),
        deactivations: deactivations.clone(),
    };

    let actor = BlockActor::spawn(Box::new(counter), &HostConfig::default());
    let mut state = actor.watch_state();
    drop(actor);

    state
        .wait_for(|s| *s == BlockState::Inactive)
        .await
        .unwrap();
    assert_eq!(deactivations.load(Ordering::SeqCst), 1);
}
