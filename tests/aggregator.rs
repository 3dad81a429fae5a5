//! Completion tracking under arbitrary reply order.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use bmc_gateway::bus::{Bus, BusCall, BusError, BusReply, PropertyValue};
use bmc_gateway::response::{AsyncResp, Response};

type Reply = Result<BusReply, BusError>;

/// Bus whose calls settle only when the test says so.
#[derive(Default)]
struct ManualBus {
    waiting: Mutex<Vec<(String, oneshot::Sender<Reply>)>>,
}

impl ManualBus {
    fn take(&self) -> Vec<(String, oneshot::Sender<Reply>)> {
        std::mem::take(&mut *self.waiting.lock().unwrap())
    }

    fn waiting(&self) -> usize {
        self.waiting.lock().unwrap().len()
    }
}

impl Bus for ManualBus {
    fn call(&self, call: BusCall) -> BoxFuture<'static, Reply> {
        let (tx, rx) = oneshot::channel();
        self.waiting.lock().unwrap().push((call.path, tx));
        async move { rx.await.unwrap_or_else(|_| Err(BusError::Failed("dropped".into()))) }.boxed()
    }
}

async fn settle(resp: &AsyncResp, pending: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while resp.pending() != pending {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("continuation never ran");
}

fn property_call(index: usize) -> BusCall {
    BusCall::get_property("svc", format!("/obj/{}", index), "iface", "Value")
}

#[tokio::test]
async fn test_finalizes_once_after_last_reply_in_any_order() {
    for seed in 0..8u64 {
        let bus = Arc::new(ManualBus::default());
        let (guard, completion) = AsyncResp::new(bus.clone(), Response::new(json!({"Seen": []})));
        let resp: Arc<AsyncResp> = Arc::clone(&guard);
        let finals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finals);
        resp.on_final(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        const CALLS: usize = 6;
        for index in 0..CALLS {
            resp.issue(property_call(index), move |result, res, _| {
                assert!(result.is_ok());
                res.push("Seen", json!(index));
            });
        }
        assert_eq!(resp.pending(), CALLS + 1);
        drop(guard);
        assert_eq!(resp.pending(), CALLS);

        let mut replies = bus.take();
        replies.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut remaining = CALLS;
        for (_, tx) in replies {
            assert_eq!(finals.load(Ordering::SeqCst), 0, "finalized early (seed {})", seed);
            tx.send(Ok(BusReply::Value(PropertyValue::U32(1)))).unwrap();
            remaining -= 1;
            settle(&resp, remaining).await;
        }

        let done = completion.wait().await;
        assert_eq!(finals.load(Ordering::SeqCst), 1);
        let mut seen: Vec<u64> = done.json["Seen"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..CALLS as u64).collect::<Vec<_>>());
    }
}

/// Call tree: `children[n]` lists the nodes issued by node `n`'s
/// continuation. Node 0 is the handler itself.
fn random_tree(rng: &mut StdRng) -> Vec<Vec<usize>> {
    let max_depth = rng.gen_range(1..=4);
    let mut children: Vec<Vec<usize>> = vec![Vec::new()];
    let mut frontier = vec![(0usize, 0usize)];
    while let Some((node, depth)) = frontier.pop() {
        if depth == max_depth {
            continue;
        }
        let width = if depth == 0 { rng.gen_range(0..=4) } else { rng.gen_range(0..=3) };
        for _ in 0..width {
            let child = children.len();
            children.push(Vec::new());
            children[node].push(child);
            frontier.push((child, depth + 1));
        }
    }
    children
}

/// Issue `node`; its continuation issues the node's children, or records
/// it as a leaf.
fn issue_node(resp: &Arc<AsyncResp>, tree: Arc<Vec<Vec<usize>>>, node: usize, ran: Arc<AtomicUsize>) {
    resp.issue(property_call(node), move |result, res, resp| {
        assert!(result.is_ok());
        let children = tree[node].clone();
        if children.is_empty() {
            res.push("Leaves", json!(node));
        }
        for child in children {
            issue_node(resp, Arc::clone(&tree), child, Arc::clone(&ran));
        }
        ran.fetch_add(1, Ordering::SeqCst);
    });
}

#[tokio::test]
async fn test_random_call_trees_finalize_once() {
    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let tree = Arc::new(random_tree(&mut rng));
        let calls = tree.len() - 1;
        let leaves: Vec<u64> = (1..tree.len())
            .filter(|&n| tree[n].is_empty())
            .map(|n| n as u64)
            .collect();

        let bus = Arc::new(ManualBus::default());
        let (guard, completion) = AsyncResp::new(bus.clone(), Response::new(json!({"Leaves": []})));
        let resp: Arc<AsyncResp> = Arc::clone(&guard);
        let finals = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finals);
        resp.on_final(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let ran = Arc::new(AtomicUsize::new(0));
        for &root in &tree[0] {
            issue_node(&resp, Arc::clone(&tree), root, Arc::clone(&ran));
        }
        drop(guard);

        // Replies from every level share one pool and settle in random order.
        let mut pool = Vec::new();
        let mut sent = 0;
        while sent < calls {
            pool.extend(bus.take());
            assert!(!pool.is_empty(), "no call in flight (seed {})", seed);
            assert_eq!(finals.load(Ordering::SeqCst), 0, "finalized early (seed {})", seed);
            let (_, tx) = pool.swap_remove(rng.gen_range(0..pool.len()));
            tx.send(Ok(BusReply::Value(PropertyValue::U32(1)))).unwrap();
            sent += 1;
            tokio::time::timeout(Duration::from_secs(5), async {
                while ran.load(Ordering::SeqCst) < sent {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .expect("continuation never ran");
        }
        assert!(pool.is_empty() && bus.waiting() == 0);

        let done = completion.wait().await;
        assert_eq!(finals.load(Ordering::SeqCst), 1, "seed {}", seed);
        assert_eq!(resp.pending(), 0);
        let mut seen: Vec<u64> = done.json["Leaves"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_u64().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, leaves, "seed {}", seed);
    }
}

#[tokio::test]
async fn test_nested_issue_keeps_request_open() {
    let bus = Arc::new(ManualBus::default());
    let (guard, completion) = AsyncResp::new(bus.clone(), Response::default());
    let resp: Arc<AsyncResp> = Arc::clone(&guard);

    resp.issue(property_call(0), |_, res, resp| {
        res.json["Outer"] = json!(true);
        resp.issue(property_call(1), |_, res, _| {
            res.json["Inner"] = json!(true);
        });
    });
    drop(guard);

    let (_, outer) = bus.take().pop().unwrap();
    outer.send(Ok(BusReply::Empty)).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while bus.waiting() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("inner call never issued");
    settle(&resp, 1).await;

    let (path, inner) = bus.take().pop().unwrap();
    assert_eq!(path, "/obj/1");
    inner.send(Ok(BusReply::Empty)).unwrap();

    let done = completion.wait().await;
    assert_eq!(done.json["Outer"], true);
    assert_eq!(done.json["Inner"], true);
}

#[tokio::test]
async fn test_failed_call_still_releases() {
    let bus = Arc::new(ManualBus::default());
    let (guard, completion) = AsyncResp::new(bus.clone(), Response::default());

    guard.issue(property_call(0), |result, res, _| {
        if let Err(e) = result {
            res.json["Failure"] = json!(e.to_string());
        }
    });
    drop(guard);

    // Dropping the sender fails the call instead of leaving it hanging.
    drop(bus.take());

    let done = tokio::time::timeout(Duration::from_secs(5), completion.wait())
        .await
        .expect("request never completed");
    assert!(done.json["Failure"].is_string());
}

#[tokio::test]
async fn test_synchronous_handler_finalizes_on_guard_drop() {
    let bus = Arc::new(ManualBus::default());
    let (guard, completion) = AsyncResp::new(bus, Response::default());
    guard.doc().json["Name"] = json!("static");
    drop(guard);

    let done = completion.wait().await;
    assert_eq!(done.json["Name"], "static");
}
