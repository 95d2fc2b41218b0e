//! Integration tests for suspended transitions, the request queue and
//! state-change broadcasts.

use futures::channel::oneshot;
use serde_json::json;
use settle::core::{HandlerError, Outcome, TransitionTable, INTERNAL_ERROR, OFF};
use settle::runtime::{BroadcastBus, Task, ThreadScheduler, TokioScheduler};
use settle::{transition_table, Args, FsmBuilder, FsmError};
use parking_lot::Mutex;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::sync::Notify;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builder whose `Red` enter handler waits for `gate`, then succeeds or
/// fails.
fn gated(name: &str, gate: &Arc<Notify>, fail: bool) -> FsmBuilder {
    let gate = Arc::clone(gate);
    FsmBuilder::new(name).on_enter("Red", move |_ctx| {
        let gate = Arc::clone(&gate);
        async move {
            gate.notified().await;
            if fail {
                return Err::<(), HandlerError>("red bulb blew".into());
            }
            Ok(())
        }
    })
}

#[tokio::test]
async fn suspended_enter_keeps_machine_in_transition() {
    init_tracing();
    let gate = Arc::new(Notify::new());
    let fsm = gated("slow", &gate, false).build().unwrap();

    let transition = fsm.request("Red", vec![json!(1)]).unwrap().unwrap();
    assert!(!transition.is_done());
    assert_eq!(transition.state, "Red");

    assert!(fsm.is_in_transition());
    assert_eq!(fsm.state(), None);
    assert_eq!(
        fsm.transition_states(),
        Some((OFF.to_string(), "Red".to_string()))
    );
    assert_eq!(fsm.current_or_pending_state(), "Red");
    assert_eq!(fsm.current_state_or_transition_label(), "Off -> Red");
    assert_eq!(fsm.to_string(), "FSM:slow in transition from 'Off' to 'Red'");

    let err = fsm.request("Green", Args::new()).unwrap_err();
    assert!(err.is_in_transition());

    gate.notify_one();
    transition.await.unwrap();
    assert!(!fsm.is_in_transition());
    assert_eq!(fsm.state().as_deref(), Some("Red"));
}

#[tokio::test]
async fn queued_requests_are_served_in_order() {
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&entered);
    let fsm = gated("queue", &gate, false)
        .default_enter(settle::handlers::sync_handler(move |ctx| {
            log.lock().push(ctx.new_state.clone());
            Ok(())
        }))
        .build()
        .unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    let green = fsm.demand("Green", Args::new()).unwrap();
    let yellow = fsm.force_transition("Yellow", Args::new()).unwrap();
    let blue = fsm.demand("Blue", Args::new()).unwrap();
    assert_eq!(fsm.pending_requests(), 3);

    gate.notify_one();
    transition.await.unwrap();
    green.await.unwrap();
    yellow.await.unwrap();
    blue.await.unwrap();

    assert_eq!(*entered.lock(), vec!["Green", "Yellow", "Blue"]);
    assert_eq!(
        fsm.history().get_path(),
        vec![OFF, "Red", "Green", "Yellow", "Blue"]
    );
    assert_eq!(fsm.pending_requests(), 0);
}

#[tokio::test]
async fn denied_queued_demand_does_not_block_later_requests() {
    let gate = Arc::new(Notify::new());
    let fsm = gated("picky", &gate, false)
        .transitions(transition_table! {
            "Red" => ["Green"],
        })
        .build()
        .unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    let yellow = fsm.demand("Yellow", Args::new()).unwrap();
    let green = fsm.demand("Green", Args::new()).unwrap();

    gate.notify_one();
    transition.await.unwrap();

    match yellow.await {
        Err(FsmError::RequestDenied { request, state }) => {
            assert_eq!(request, "Yellow");
            assert_eq!(state, "Red");
        }
        other => panic!("expected a denial, got {:?}", other),
    }
    green.await.unwrap();
    assert_eq!(fsm.state().as_deref(), Some("Green"));
}

#[tokio::test]
async fn handler_failure_abandons_queued_requests() {
    let gate = Arc::new(Notify::new());
    let fsm = gated("fragile", &gate, true).build().unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    let green = fsm.demand("Green", Args::new()).unwrap();

    gate.notify_one();
    let err = transition.await.unwrap_err();
    assert!(err.is_handler_failure());
    assert!(matches!(
        green.await,
        Err(FsmError::Abandoned { request, .. }) if request == "Green"
    ));

    assert_eq!(fsm.state().as_deref(), Some(INTERNAL_ERROR));
    assert_eq!(
        fsm.history().last().map(|r| r.outcome),
        Some(Outcome::Failed)
    );
    assert_eq!(fsm.history().get_path(), vec![OFF, INTERNAL_ERROR]);

    // Off is always reachable, so the machine can be recovered.
    fsm.request(OFF, Args::new()).unwrap().unwrap().await.unwrap();
    assert_eq!(fsm.state().as_deref(), Some(OFF));
}

#[tokio::test]
async fn queued_request_reports_its_own_handler_failure() {
    let gate = Arc::new(Notify::new());
    let fsm = gated("brittle", &gate, false)
        .on_enter_sync("Green", |_| Err("green bulb blew".into()))
        .build()
        .unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    let green = fsm.demand("Green", Args::new()).unwrap();
    let yellow = fsm.force_transition("Yellow", Args::new()).unwrap();

    gate.notify_one();
    transition.await.unwrap();

    let err = green.await.unwrap_err();
    assert!(err.is_handler_failure());
    assert!(err.to_string().contains("green bulb blew"));
    assert!(matches!(
        yellow.await,
        Err(FsmError::Abandoned { request, .. }) if request == "Yellow"
    ));

    assert_eq!(fsm.state().as_deref(), Some(INTERNAL_ERROR));
    assert_eq!(fsm.history().get_path(), vec![OFF, "Red", INTERNAL_ERROR]);
}

#[tokio::test]
async fn ten_thousand_queued_transitions_are_drained() {
    const COUNT: usize = 10_000;
    let gate = Arc::new(Notify::new());
    let fsm = gated("backlog", &gate, false).build().unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    let queued = (0..COUNT)
        .map(|i| fsm.force_transition(&format!("S{}", i), Args::new()).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(fsm.pending_requests(), COUNT);

    gate.notify_one();
    transition.await.unwrap();
    for completion in queued {
        completion.await.unwrap();
    }

    assert_eq!(fsm.state(), Some(format!("S{}", COUNT - 1)));
    assert_eq!(fsm.pending_requests(), 0);
}

#[tokio::test]
async fn async_from_to_handler_replaces_exit_and_enter() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (exit_log, enter_log, pair_log) = (
        Arc::clone(&calls),
        Arc::clone(&calls),
        Arc::clone(&calls),
    );
    let fsm = FsmBuilder::new("paired")
        .on_exit_sync("Red", move |_| {
            exit_log.lock().push("exitRed".to_string());
            Ok(())
        })
        .on_enter_sync("Green", move |_| {
            enter_log.lock().push("enterGreen".to_string());
            Ok(())
        })
        .on_from_to("Red", "Green", move |ctx| {
            let log = Arc::clone(&pair_log);
            async move {
                tokio::task::yield_now().await;
                log.lock().push(format!("{}->{}", ctx.old_state, ctx.new_state));
                Ok::<(), HandlerError>(())
            }
        })
        .build()
        .unwrap();

    fsm.force_transition("Red", Args::new()).unwrap().await.unwrap();
    fsm.request("Green", Args::new()).unwrap().unwrap().await.unwrap();

    assert_eq!(*calls.lock(), vec!["Red->Green"]);
}

#[tokio::test]
async fn broadcast_publishes_one_event_per_transition() {
    let bus = BroadcastBus::new(16);
    let mut events = bus.subscribe();
    let fsm = FsmBuilder::new("loud")
        .broadcast(true)
        .event_bus(bus.clone())
        .build()
        .unwrap();
    let name = fsm.state_change_event_name();

    fsm.request("Red", Args::new()).unwrap();
    fsm.request("Green", Args::new()).unwrap();
    assert_eq!(events.recv().await.unwrap(), name);
    assert_eq!(events.recv().await.unwrap(), name);
    assert!(events.try_recv().is_err());

    fsm.set_broadcast_enabled(false);
    fsm.request("Yellow", Args::new()).unwrap();
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn navigation_cycles_and_forwards_args() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let fsm = FsmBuilder::new("carousel")
        .state_order(["A", "B", "C"])
        .default_enter(settle::handlers::sync_handler(move |ctx| {
            log.lock().push((ctx.new_state.clone(), ctx.args.clone()));
            Ok(())
        }))
        .build()
        .unwrap();

    // Off is not in the order, so both directions go to the first state.
    let first = fsm.request_next(vec![json!("x")]).unwrap().unwrap();
    assert_eq!(first.state, "A");
    fsm.request_previous(Args::new()).unwrap();
    assert_eq!(fsm.state().as_deref(), Some("C"));
    fsm.request_next(Args::new()).unwrap();
    assert_eq!(fsm.state().as_deref(), Some("A"));

    assert_eq!(seen.lock()[0], ("A".to_string(), vec![json!("x")]));
}

#[tokio::test]
async fn navigation_without_order_does_nothing() {
    let fsm = FsmBuilder::new("still").build().unwrap();
    assert!(fsm.request_next(Args::new()).unwrap().is_none());
    assert_eq!(fsm.state().as_deref(), Some(OFF));
}

#[tokio::test]
async fn navigation_respects_the_table() {
    let fsm = FsmBuilder::new("oneway")
        .state_order(["A", "B"])
        .transitions(TransitionTable::new().allow("A", ["B"]))
        .build()
        .unwrap();

    fsm.request("A", Args::new()).unwrap();
    fsm.request_next(Args::new()).unwrap();
    assert_eq!(fsm.state().as_deref(), Some("B"));

    let err = fsm.request_next(Args::new()).unwrap_err();
    assert!(err.is_denied());
}

#[tokio::test]
async fn cleanup_queues_behind_running_transition() {
    let gate = Arc::new(Notify::new());
    let fsm = gated("tidy", &gate, false).build().unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    let cleanup = fsm.cleanup().unwrap();
    assert!(!cleanup.is_done());

    gate.notify_one();
    transition.await.unwrap();
    cleanup.await.unwrap();
    assert_eq!(fsm.state().as_deref(), Some(OFF));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_demands_are_all_served() {
    let gate = Arc::new(Notify::new());
    let fsm = gated("busy", &gate, false).build().unwrap();
    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();

    let mut tasks = Vec::new();
    for i in 0..8 {
        let fsm = fsm.clone();
        tasks.push(tokio::spawn(async move {
            fsm.force_transition(&format!("S{}", i), Args::new())
                .unwrap()
                .await
        }));
    }
    while fsm.pending_requests() < 8 {
        tokio::task::yield_now().await;
    }

    gate.notify_one();
    transition.await.unwrap();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let history = fsm.history();
    let path = history.get_path();
    assert_eq!(path.len(), 10);
    for i in 0..8 {
        assert!(path.contains(&format!("S{}", i).as_str()));
    }
    assert_eq!(fsm.state().as_deref(), path.last().copied());
}

#[test]
fn thread_scheduler_resumes_without_runtime() {
    let (tx, rx) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(rx)));
    let fsm = FsmBuilder::new("threaded")
        .scheduler(ThreadScheduler)
        .on_enter("Red", move |_ctx| {
            let rx = gate.lock().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok::<(), HandlerError>(())
            }
        })
        .build()
        .unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    assert!(fsm.is_in_transition());

    tx.send(()).unwrap();
    futures::executor::block_on(transition.into_future()).unwrap();
    assert_eq!(fsm.state().as_deref(), Some("Red"));
}

#[test]
fn tokio_scheduler_without_runtime_resumes_on_a_thread() {
    let (tx, rx) = oneshot::channel::<()>();
    let gate = Arc::new(Mutex::new(Some(rx)));
    let fsm = FsmBuilder::new("stranded")
        .scheduler(TokioScheduler::new())
        .on_enter("Red", move |_ctx| {
            let rx = gate.lock().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                Ok::<(), HandlerError>(())
            }
        })
        .build()
        .unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    assert!(fsm.is_in_transition());

    tx.send(()).unwrap();
    futures::executor::block_on(transition.into_future()).unwrap();
    assert_eq!(fsm.state().as_deref(), Some("Red"));
}

#[test]
fn dropped_task_cancels_completion() {
    let fsm = FsmBuilder::new("lost")
        .scheduler(|task: Task| drop(task))
        .on_enter("Red", |_ctx| futures::future::pending::<Result<(), HandlerError>>())
        .build()
        .unwrap();

    let transition = fsm.request("Red", Args::new()).unwrap().unwrap();
    let result = futures::executor::block_on(transition.into_future());
    assert!(matches!(result, Err(FsmError::Canceled)));
    assert!(fsm.is_in_transition());
}
