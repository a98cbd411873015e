/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use weft::prelude::*;
use weft_test::prelude::*;

use crate::setup::initialize_tracing;
use crate::setup::messages::{Audit, Ping, Pong, Work};

mod setup;

fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(MessageContext) -> FutureBox + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move |_ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        Reply::ready()
    }
}

/// Tests that starting a board publishes `Initialize`.
///
/// **Verification:**
/// - The `Initialize` consumer runs exactly once.
/// - The message has no predecessors and lives in the default domain.
#[weft_test]
async fn test_start_publishes_initialize() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let seen: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    board.agent("starter")?.act_on::<Initialize>(move |ctx| {
        recorder.lock().push(ctx.message().clone());
        Reply::ready()
    });

    let handle = board.start();
    handle.wait_idle().await;

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].predecessors().is_empty());
    assert!(seen[0].domain().is_default());
    assert!(seen[0].is_disposed());
    Ok(())
}

/// Tests that a node is disposed exactly when its last consumer completes.
///
/// **Scenario:**
/// 1. Register three slow consumers for `Ping`.
/// 2. Publish one `Ping` with a disposal hook that samples the completion count.
///
/// **Verification:**
/// - All three consumers ran.
/// - The hook observed all three completions, so disposal came last.
#[weft_test]
async fn test_disposal_after_every_consumer() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let completed = Arc::new(AtomicUsize::new(0));
    for name in ["first", "second", "third"] {
        let completed = Arc::clone(&completed);
        board.agent(name)?.act_on::<Ping>(move |_ctx| {
            let completed = Arc::clone(&completed);
            Reply::pending(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        });
    }
    let handle = board.build();

    let ping = Message::new(handle.tree(), &[], Ping)?;
    let observed = Arc::new(AtomicUsize::new(usize::MAX));
    {
        let completed = Arc::clone(&completed);
        let observed = Arc::clone(&observed);
        ping.on_dispose(move || observed.store(completed.load(Ordering::SeqCst), Ordering::SeqCst));
    }
    handle.publish(&ping);
    handle.wait_idle().await;

    assert_eq!(completed.load(Ordering::SeqCst), 3);
    assert!(ping.is_disposed());
    assert_eq!(ping.remaining_uses(), Some(0));
    assert_eq!(observed.load(Ordering::SeqCst), 3);
    Ok(())
}

/// Tests that a message nobody consumes is disposed on delivery.
#[weft_test]
async fn test_unconsumed_message_is_disposed() -> anyhow::Result<()> {
    initialize_tracing();
    let handle = WeftApp::launch_with_config(WeftConfig::default()).build();
    let pong = Message::new(handle.tree(), &[], Pong)?;
    handle.publish(&pong);
    handle.wait_idle().await;
    assert!(pong.is_disposed());
    Ok(())
}

/// Tests delivery of a decorator chain.
///
/// **Verification:**
/// - Each node goes to the consumers of its own kind.
/// - Every node of the chain is disposed afterwards.
#[weft_test]
async fn test_each_chain_node_is_delivered() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let deliveries: Arc<Mutex<Vec<(String, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let work_log = Arc::clone(&deliveries);
    let audit_log = Arc::clone(&deliveries);
    board
        .agent("observer")?
        .act_on::<Work>(move |ctx| {
            work_log
                .lock()
                .push((ctx.message().definition().to_string(), ctx.message().is_head()));
            Reply::ready()
        })
        .act_on::<Audit>(move |ctx| {
            audit_log
                .lock()
                .push((ctx.message().definition().to_string(), ctx.message().is_head()));
            Reply::ready()
        });
    let handle = board.build();

    let work = Message::new(handle.tree(), &[], Work { index: 1 })?;
    let audit = work.decorate(
        Audit {
            note: "outer".to_string(),
        },
        &[],
    );
    handle.publish(&work);
    handle.wait_idle().await;

    let mut deliveries = deliveries.lock().clone();
    deliveries.sort();
    assert_eq!(
        deliveries,
        vec![("Audit".to_string(), true), ("Work".to_string(), false)]
    );
    assert!(work.is_disposed());
    assert!(audit.is_disposed());
    Ok(())
}

/// Tests an interceptor veto on an inner node of a chain.
///
/// **Scenario:**
/// 1. Register an interceptor for `Work` that vetoes.
/// 2. Publish a `Work` wrapped in an `Audit` decorator, and a plain `Pong`.
///
/// **Verification:**
/// - The interceptor receives the head of the chain.
/// - No node of the vetoed chain reaches a consumer, and all are disposed.
/// - Unintercepted kinds are still delivered.
#[weft_test]
async fn test_veto_disposes_without_delivery() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let consumed = Arc::new(AtomicUsize::new(0));
    let pongs = Arc::new(AtomicUsize::new(0));
    let intercepted: Arc<Mutex<Vec<MessageId>>> = Arc::new(Mutex::new(Vec::new()));
    let interceptor_log = Arc::clone(&intercepted);
    board
        .agent("gate")?
        .intercept::<Work>(move |ctx| {
            interceptor_log.lock().push(ctx.message().id());
            Reply::vote(InterceptionAction::DoNotPublish)
        });
    board
        .agent("worker")?
        .act_on::<Work>(counting(&consumed))
        .act_on::<Audit>(counting(&consumed))
        .act_on::<Pong>(counting(&pongs));
    let handle = board.build();

    let work = Message::new(handle.tree(), &[], Work { index: 1 })?;
    let audit = work.decorate(
        Audit {
            note: "outer".to_string(),
        },
        &[],
    );
    let pong = Message::new(handle.tree(), &[], Pong)?;
    handle.publish(&work);
    handle.publish(&pong);
    handle.wait_idle().await;

    assert_eq!(*intercepted.lock(), vec![audit.id()]);
    assert_eq!(consumed.load(Ordering::SeqCst), 0);
    assert!(work.is_disposed());
    assert!(audit.is_disposed());
    assert_eq!(work.remaining_uses(), Some(0));
    assert_eq!(pongs.load(Ordering::SeqCst), 1);
    Ok(())
}

/// Tests that every interceptor must agree before delivery.
#[weft_test]
async fn test_all_interceptors_must_continue() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let consumed = Arc::new(AtomicUsize::new(0));
    board
        .agent("lenient")?
        .intercept::<Ping>(|_ctx| Reply::vote(InterceptionAction::Continue))
        .intercept::<Pong>(|_ctx| Reply::vote(InterceptionAction::Continue));
    board.agent("strict")?.intercept::<Pong>(|_ctx| {
        Reply::pending_vote(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(InterceptionAction::DoNotPublish)
        })
    });
    board
        .agent("worker")?
        .act_on::<Ping>(counting(&consumed))
        .act_on::<Pong>(counting(&consumed));
    let handle = board.build();

    let ping = Message::new(handle.tree(), &[], Ping)?;
    let pong = Message::new(handle.tree(), &[], Pong)?;
    handle.publish(&ping);
    handle.publish(&pong);
    handle.wait_idle().await;

    assert_eq!(consumed.load(Ordering::SeqCst), 1);
    assert!(ping.is_disposed());
    assert!(pong.is_disposed());
    Ok(())
}

/// Tests an interceptor that vetoes and publishes a substitute instead.
#[weft_test]
async fn test_interceptor_publishes_substitute() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let pings = Arc::new(AtomicUsize::new(0));
    let pongs: Arc<Mutex<Vec<Message>>> = Arc::new(Mutex::new(Vec::new()));
    let pong_log = Arc::clone(&pongs);
    board.agent("translator")?.intercept::<Ping>(|ctx| {
        Reply::pending_vote(async move {
            let pong = ctx.follow_up(Pong)?;
            ctx.publish(&pong);
            Ok(InterceptionAction::DoNotPublish)
        })
    });
    board
        .agent("listener")?
        .act_on::<Ping>(counting(&pings))
        .act_on::<Pong>(move |ctx| {
            pong_log.lock().push(ctx.message().clone());
            Reply::ready()
        });
    let handle = board.build();

    let ping = Message::new(handle.tree(), &[], Ping)?;
    handle.publish(&ping);
    handle.wait_idle().await;

    assert_eq!(pings.load(Ordering::SeqCst), 0);
    let pongs = pongs.lock();
    assert_eq!(pongs.len(), 1);
    assert_eq!(pongs[0].predecessors(), &[ping.clone()]);
    Ok(())
}

/// Tests that an interceptor can swap the published node for another one.
///
/// **Verification:**
/// - Consumers receive the replacement, not the original.
/// - The original is disposed exactly once.
#[weft_test]
async fn test_interceptor_replacement_is_delivered() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let indexes: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let index_log = Arc::clone(&indexes);
    board.agent("rewriter")?.intercept::<Work>(|ctx| {
        Reply::pending_vote(async move {
            let original = ctx.message().clone();
            if original.get::<Work>()?.index == 1 {
                let replacement = Message::new(ctx.tree(), original.predecessors(), Work { index: 2 })?;
                original.replace_with(&replacement)?;
            }
            Ok(InterceptionAction::Continue)
        })
    });
    board.agent("worker")?.act_on::<Work>(move |ctx| {
        if let Some(work) = ctx.payload::<Work>() {
            index_log.lock().push(work.index);
        }
        Reply::ready()
    });
    let handle = board.build();

    let work = Message::new(handle.tree(), &[], Work { index: 1 })?;
    let replaced = Arc::new(AtomicUsize::new(0));
    let replaced_hook = Arc::clone(&replaced);
    work.on_dispose(move || {
        replaced_hook.fetch_add(1, Ordering::SeqCst);
    });
    handle.publish(&work);
    handle.wait_idle().await;

    assert_eq!(*indexes.lock(), vec![2]);
    assert!(work.is_disposed());
    assert_eq!(replaced.load(Ordering::SeqCst), 1);
    Ok(())
}

/// Tests `DelayDispose` held by a consumer past its completion.
///
/// **Verification:**
/// - The node outlives its consumers while the guard is held.
/// - Releasing the guard disposes it.
#[weft_test]
async fn test_delay_dispose_outlives_consumers() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let held: Arc<Mutex<Option<DisposeGuard>>> = Arc::new(Mutex::new(None));
    let holder = Arc::clone(&held);
    board.agent("keeper")?.act_on::<Ping>(move |ctx| {
        *holder.lock() = Some(ctx.message().delay_dispose());
        Reply::ready()
    });
    let handle = board.build();

    let ping = Message::new(handle.tree(), &[], Ping)?;
    handle.publish(&ping);
    handle.wait_idle().await;

    assert_eq!(ping.remaining_uses(), Some(0));
    assert!(!ping.is_disposed());
    let guard = held.lock().take().expect("consumer stored a guard");
    guard.release();
    assert!(ping.is_disposed());
    Ok(())
}

/// Tests that a consumer error is re-published as an `Exception`.
///
/// **Scenario:**
/// 1. One consumer of `Ping` fails, a second succeeds.
/// 2. A third agent consumes `Exception`.
///
/// **Verification:**
/// - The exception names the failing agent and the failed message, and follows it.
/// - The healthy consumer still ran and the `Ping` is disposed.
#[weft_test]
async fn test_consumer_error_becomes_exception() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let healthy = Arc::new(AtomicUsize::new(0));
    let exceptions: Arc<Mutex<Vec<(Ern, MessageId, String, Vec<Message>)>>> =
        Arc::new(Mutex::new(Vec::new()));

    let mut failing = board.agent("failing")?;
    let failing_id = failing.id().clone();
    failing.act_on::<Ping>(|_ctx| Reply::pending(async { Err(anyhow!("boom")) }));
    board.agent("healthy")?.act_on::<Ping>(counting(&healthy));
    let exception_log = Arc::clone(&exceptions);
    board.agent("watcher")?.act_on::<Exception>(move |ctx| {
        if let Some(exception) = ctx.payload::<Exception>() {
            exception_log.lock().push((
                exception.agent().clone(),
                exception.failed().id(),
                exception.description().to_string(),
                ctx.message().predecessors().to_vec(),
            ));
        }
        Reply::ready()
    });
    let handle = board.build();

    let ping = Message::new(handle.tree(), &[], Ping)?;
    handle.publish(&ping);
    handle.wait_idle().await;

    assert_eq!(healthy.load(Ordering::SeqCst), 1);
    assert!(ping.is_disposed());
    let exceptions = exceptions.lock();
    assert_eq!(exceptions.len(), 1);
    let (agent, failed, description, predecessors) = &exceptions[0];
    assert_eq!(agent, &failing_id);
    assert_eq!(*failed, ping.id());
    assert_eq!(description, "boom");
    assert_eq!(predecessors, &vec![ping.clone()]);
    Ok(())
}

/// Tests that agents can report failures they detect themselves.
#[weft_test]
async fn test_custom_exception() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let descriptions: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    board.agent("validator")?.act_on::<Work>(|ctx| {
        let report = Exception::custom(
            ctx.agent().clone(),
            ctx.message().clone(),
            "index out of range",
        );
        let exception = ctx.follow_up(report);
        Reply::pending(async move {
            ctx.publish(&exception?);
            Ok(())
        })
    });
    let log = Arc::clone(&descriptions);
    board.agent("watcher")?.act_on::<Exception>(move |ctx| {
        if let Some(exception) = ctx.payload::<Exception>() {
            assert!(exception.error().is_none());
            log.lock().push(exception.description().to_string());
        }
        Reply::ready()
    });
    let handle = board.build();

    let work = Message::new(handle.tree(), &[], Work { index: 99 })?;
    handle.publish(&work);
    handle.wait_idle().await;

    assert_eq!(*descriptions.lock(), vec!["index out of range".to_string()]);
    Ok(())
}

/// Tests board shutdown.
///
/// **Verification:**
/// - In-flight consumers finish before `shutdown` returns.
/// - Publishing afterwards disposes the message undelivered.
#[weft_test]
async fn test_shutdown_stops_delivery() -> anyhow::Result<()> {
    initialize_tracing();
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let completed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completed);
    board.agent("slow")?.act_on::<Ping>(move |_ctx| {
        let counter = Arc::clone(&counter);
        Reply::pending(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    });
    let handle = board.build();

    let first = Message::new(handle.tree(), &[], Ping)?;
    handle.publish(&first);
    handle.shutdown().await?;
    assert!(handle.is_shut_down());
    assert_eq!(completed.load(Ordering::SeqCst), 1);

    let late = Message::new(handle.tree(), &[], Ping)?;
    handle.publish(&late);
    assert!(late.is_disposed());
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    Ok(())
}

/// Tests that a shutdown timing out is reported as an error.
#[weft_test]
async fn test_shutdown_timeout() -> anyhow::Result<()> {
    initialize_tracing();
    let config = WeftConfig {
        timeouts: TimeoutConfig {
            shutdown_timeout_ms: 10,
        },
        ..WeftConfig::default()
    };
    let mut board = WeftApp::launch_with_config(config);
    board.agent("stuck")?.act_on::<Ping>(|_ctx| {
        Reply::pending(async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        })
    });
    let handle = board.build();

    let ping = Message::new(handle.tree(), &[], Ping)?;
    handle.publish(&ping);
    assert!(handle.shutdown().await.is_err());
    Ok(())
}

/// Tests `wait_idle` and `shutdown` awaited together on a busy board.
///
/// **Verification:**
/// - Shutdown completes once the in-flight consumer does, well inside its timeout.
/// - The board stays shut down afterwards.
#[weft_test]
async fn test_wait_idle_during_shutdown() -> anyhow::Result<()> {
    initialize_tracing();
    let config = WeftConfig {
        timeouts: TimeoutConfig {
            shutdown_timeout_ms: 5_000,
        },
        ..WeftConfig::default()
    };
    let mut board = WeftApp::launch_with_config(config);
    board.agent("slow")?.act_on::<Ping>(|_ctx| {
        Reply::pending(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        })
    });
    let handle = board.build();

    handle.publish(&Message::new(handle.tree(), &[], Ping)?);
    let started = std::time::Instant::now();
    let ((), shutdown) = tokio::join!(handle.wait_idle(), handle.shutdown());
    shutdown?;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(handle.is_shut_down());

    let late = Message::new(handle.tree(), &[], Ping)?;
    handle.publish(&late);
    assert!(late.is_disposed());
    Ok(())
}
