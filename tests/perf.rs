#![cfg(feature = "memory-store")]

use futures::executor::block_on;
use rs_rbac::{
    Action, Manager, ManagerBuilder, MemoryRepo, NewPermission, NewRole, ResourceName, UserId,
};
use std::hint::black_box;
use std::time::Instant;

const REPEATS: usize = 5;

fn benchmark_sync<F>(name: &str, iterations: usize, mut op: F)
where
    F: FnMut(),
{
    let mut samples = Vec::with_capacity(REPEATS);

    for _ in 0..REPEATS {
        let start = Instant::now();
        for _ in 0..iterations {
            op();
        }
        samples.push(start.elapsed());
    }

    samples.sort_unstable();
    let median = samples[REPEATS / 2];
    let total_ms = median.as_secs_f64() * 1_000.0;
    let ns_per_op = median.as_secs_f64() * 1_000_000_000.0 / iterations as f64;
    let ops_per_sec = iterations as f64 / median.as_secs_f64();

    println!(
        "{name}: median={total_ms:.3} ms, ns/op={ns_per_op:.1}, ops/s={ops_per_sec:.0} (iters={iterations}, repeats={REPEATS})"
    );
}

fn setup(pattern: &str) -> (Manager<MemoryRepo>, UserId) {
    let manager = ManagerBuilder::new(MemoryRepo::new()).build();
    let user = UserId::from_string("user_perf".into());

    let role = block_on(manager.create_role(NewRole {
        name: "role_perf".into(),
        description: String::new(),
    }))
    .unwrap();
    let permission = block_on(manager.create_permission(NewPermission {
        resource: pattern.into(),
        action: Action::All,
    }))
    .unwrap();
    block_on(manager.assign_permission_to_role(role.id.clone(), permission.id)).unwrap();
    block_on(manager.assign_role_to_user(user.clone(), role.id)).unwrap();

    (manager, user)
}

#[test]
#[ignore = "manual performance test; run with --ignored --nocapture"]
fn perf_can_resolution() {
    let iterations = 200_000;

    let (manager, user) = setup("survey");
    let resource = ResourceName::try_from("survey").unwrap();
    benchmark_sync("can_literal_allow", iterations, || {
        let allowed = block_on(manager.can(user.clone(), resource.clone(), Action::Read)).unwrap();
        black_box(allowed);
    });

    let (manager, user) = setup("survey.*.test");
    let resource = ResourceName::try_from("survey.foo.test").unwrap();
    benchmark_sync("can_segment_wildcard_allow", iterations, || {
        let allowed =
            block_on(manager.can(user.clone(), resource.clone(), Action::Create)).unwrap();
        black_box(allowed);
    });

    let (manager, user) = setup("survey.**.test");
    let denied = ResourceName::try_from("customer.foo.bar").unwrap();
    benchmark_sync("can_multi_wildcard_deny", iterations, || {
        let allowed = block_on(manager.can(user.clone(), denied.clone(), Action::Read)).unwrap();
        assert!(!allowed);
        black_box(allowed);
    });
}
