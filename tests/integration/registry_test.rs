use anyhow::Result;
use std::collections::HashMap;
use std::panic;
use std::sync::Barrier;

use olapctx::common::types::context_ref;
use olapctx::query::registry::{
    self, clear_contexts, context_by_id, current_parameters, register_context, thread_local_contexts,
    PRM_ACCEPT_PARTIAL_RESULT, PRM_USER_AUTHEN_INFO,
};
use olapctx::{CompilationPass, QueryContext};

fn params(user: &str, accept_partial: bool) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert(PRM_USER_AUTHEN_INFO.to_string(), user.to_string());
    params.insert(PRM_ACCEPT_PARTIAL_RESULT.to_string(), accept_partial.to_string());
    params
}

#[test]
fn test_workers_see_only_their_own_contexts() -> Result<()> {
    crossbeam::thread::scope(|s| {
        let workers: Vec<_> = (0..4u32)
            .map(|worker| {
                s.spawn(move |_| {
                    let user = format!("USER_{}", worker);
                    let mut pass = CompilationPass::begin(params(&user, worker % 2 == 0));
                    for _ in 0..=worker {
                        let ctx = pass.new_context();
                        ctx.write().sql = format!("worker {}", worker);
                    }

                    let contexts = thread_local_contexts().unwrap_or_default();
                    let ids: Vec<u32> = contexts.iter().map(|c| c.read().id).collect();
                    let all_mine = contexts.iter().all(|c| {
                        let c = c.read();
                        c.sql == format!("worker {}", worker)
                            && c.authentication.username() == Some(user.as_str())
                            && c.storage_context.accept_partial_result() == (worker % 2 == 0)
                    });
                    (worker, ids, all_mine)
                })
            })
            .collect();

        for handle in workers {
            let (worker, ids, all_mine) = handle.join().unwrap();
            assert_eq!(ids, (0..=worker).collect::<Vec<_>>());
            assert!(all_mine, "worker {} saw a foreign context", worker);
        }
    })
    .unwrap();

    // nothing leaks onto the test thread
    assert!(thread_local_contexts().is_none());
    assert!(current_parameters().is_none());
    Ok(())
}

#[test]
fn test_live_pass_is_invisible_to_other_threads() {
    let barrier = Barrier::new(2);
    crossbeam::thread::scope(|s| {
        let owner = s.spawn(|_| {
            let mut pass = CompilationPass::begin(params("OWNER", true));
            pass.new_context();
            pass.new_context();
            barrier.wait();
            // the other thread looks while this pass is still open
            barrier.wait();
            thread_local_contexts().map(|c| c.len())
        });
        let observer = s.spawn(|_| {
            barrier.wait();
            let seen = (
                thread_local_contexts().is_none(),
                context_by_id(0).is_none(),
                current_parameters().is_none(),
            );
            barrier.wait();
            seen
        });

        assert_eq!(owner.join().unwrap(), Some(2));
        assert_eq!(observer.join().unwrap(), (true, true, true));
    })
    .unwrap();
}

#[test]
fn test_contexts_listed_in_id_order() {
    for id in [7, 2, 5] {
        register_context(context_ref(QueryContext::new(id)));
    }
    let ids: Vec<u32> = thread_local_contexts()
        .unwrap()
        .iter()
        .map(|c| c.read().id)
        .collect();
    assert_eq!(ids, vec![2, 5, 7]);
    assert!(context_by_id(5).is_some());
    assert!(context_by_id(3).is_none());

    clear_contexts();
    assert!(thread_local_contexts().is_none());
}

#[test]
fn test_contexts_share_state_through_registry() {
    let mut pass = CompilationPass::begin(HashMap::new());
    let ctx = pass.new_context();
    ctx.write().schema_name = Some("DEFAULT".to_string());

    let looked_up = context_by_id(0).unwrap();
    assert_eq!(looked_up.read().schema_name.as_deref(), Some("DEFAULT"));
    drop(pass);
    assert!(context_by_id(0).is_none());
}

#[test]
fn test_pass_guard_clears_on_panic() {
    let outcome = panic::catch_unwind(|| {
        let mut pass = CompilationPass::begin(params("ANALYST", true));
        pass.new_context();
        pass.new_context();
        assert_eq!(thread_local_contexts().map(|c| c.len()), Some(2));
        panic!("compilation failed");
    });
    assert!(outcome.is_err());

    assert!(thread_local_contexts().is_none());
    assert!(registry::current_parameters().is_none());
    // contexts created afterwards start from a clean slate
    assert!(QueryContext::new(0).authentication.is_anonymous());
}
