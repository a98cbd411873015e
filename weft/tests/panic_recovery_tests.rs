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

//! Tests for panic recovery in agent callbacks.
//!
//! These tests verify that a panicking consumer or interceptor is caught by the
//! board, reported as an `Exception`, and does not stop delivery to others.
//!
//! Note: These tests use `#[tokio::test]` instead of `#[weft_test]` because
//! the `weft_test` macro's panic detection would fail the test when we
//! intentionally trigger panics to verify they are caught by the board.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use weft::prelude::*;

/// Message whose consumers panic
#[weft_message]
struct Explode;

/// Normal message that increments a counter
#[weft_message]
struct Increment;

fn exception_log(board: &mut Board<Idle>) -> anyhow::Result<Arc<Mutex<Vec<String>>>> {
    let descriptions: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&descriptions);
    board.agent("watcher")?.act_on::<Exception>(move |ctx| {
        if let Some(exception) = ctx.payload::<Exception>() {
            log.lock().push(exception.description().to_string());
        }
        Reply::ready()
    });
    Ok(descriptions)
}

/// A consumer that panics while building its future is reported, and the
/// board keeps delivering.
#[tokio::test(flavor = "multi_thread")]
async fn test_panic_building_future_is_caught() -> anyhow::Result<()> {
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let descriptions = exception_log(&mut board)?;
    let increments = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&increments);
    board
        .agent("fragile")?
        .act_on::<Explode>(|_ctx| panic!("intentional panic"))
        .act_on::<Increment>(move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Reply::ready()
        });
    let handle = board.build();

    let explode = Message::new(handle.tree(), &[], Explode)?;
    handle.publish(&explode);
    handle.wait_idle().await;
    for _ in 0..3 {
        handle.publish(&Message::new(handle.tree(), &[], Increment)?);
    }
    handle.wait_idle().await;

    assert!(explode.is_disposed());
    assert_eq!(increments.load(Ordering::SeqCst), 3);
    assert_eq!(
        *descriptions.lock(),
        vec!["callback panicked: intentional panic".to_string()]
    );
    Ok(())
}

/// A panic while the consumer future is polled carries its formatted message.
#[tokio::test(flavor = "multi_thread")]
async fn test_panic_inside_future_is_caught() -> anyhow::Result<()> {
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let descriptions = exception_log(&mut board)?;
    let survivors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&survivors);
    board.agent("fragile")?.act_on::<Explode>(|ctx| {
        Reply::pending(async move {
            tokio::task::yield_now().await;
            panic!("agent {} gave up", ctx.agent());
        })
    });
    board.agent("steady")?.act_on::<Explode>(move |_ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        Reply::ready()
    });
    let handle = board.build();

    let explode = Message::new(handle.tree(), &[], Explode)?;
    handle.publish(&explode);
    handle.wait_idle().await;

    assert!(explode.is_disposed());
    assert_eq!(survivors.load(Ordering::SeqCst), 1);
    let descriptions = descriptions.lock();
    assert_eq!(descriptions.len(), 1);
    assert!(descriptions[0].starts_with("callback panicked: agent"));
    assert!(descriptions[0].ends_with("gave up"));
    Ok(())
}

/// A panicking interceptor is reported and vetoes by default.
#[tokio::test(flavor = "multi_thread")]
async fn test_panicking_interceptor_vetoes() -> anyhow::Result<()> {
    let mut board = WeftApp::launch_with_config(WeftConfig::default());
    let descriptions = exception_log(&mut board)?;
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    board
        .agent("gate")?
        .intercept::<Increment>(|_ctx| panic!("gate broke"));
    board.agent("counter")?.act_on::<Increment>(move |_ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        Reply::ready()
    });
    let handle = board.build();

    let increment = Message::new(handle.tree(), &[], Increment)?;
    handle.publish(&increment);
    handle.wait_idle().await;

    assert_eq!(delivered.load(Ordering::SeqCst), 0);
    assert!(increment.is_disposed());
    assert_eq!(
        *descriptions.lock(),
        vec!["callback panicked: gate broke".to_string()]
    );
    Ok(())
}

/// With `failed_interceptor_vetoes` off, a failing interceptor counts as `Continue`.
#[tokio::test(flavor = "multi_thread")]
async fn test_failed_interceptor_can_abstain() -> anyhow::Result<()> {
    let config = WeftConfig {
        dispatch: DispatchConfig {
            failed_interceptor_vetoes: false,
            ..DispatchConfig::default()
        },
        ..WeftConfig::default()
    };
    let mut board = WeftApp::launch_with_config(config);
    let descriptions = exception_log(&mut board)?;
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    board.agent("gate")?.intercept::<Increment>(|_ctx| {
        Reply::pending_vote(async { Err(anyhow::anyhow!("gate unavailable")) })
    });
    board.agent("counter")?.act_on::<Increment>(move |_ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        Reply::ready()
    });
    let handle = board.build();

    let increment = Message::new(handle.tree(), &[], Increment)?;
    handle.publish(&increment);
    handle.wait_idle().await;

    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert_eq!(*descriptions.lock(), vec!["gate unavailable".to_string()]);
    Ok(())
}
