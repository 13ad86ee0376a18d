//! Concurrent editing example exercising the CRDT manager's internal
//! locking and the convergence property across many replicas.
//!
//! Run with: cargo run --example concurrent_editing

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use rga_filesync::CrdtManager;
use rga_filesync::protocol::edit::Op;

const DOC: &str = "stress.txt";

fn to_wire_op(manager: &CrdtManager, ch: char, origin_left: &rga_filesync::CharId) -> Op {
    Op::Insert {
        site: manager.site_id().to_string(),
        clock: manager.clock(),
        content: ch.to_string(),
        origin_left_site: if origin_left.is_sentinel() {
            String::new()
        } else {
            origin_left.site.to_string()
        },
        origin_left_clock: if origin_left.is_sentinel() { 0 } else { origin_left.clock },
    }
}

fn main() {
    println!("=== Concurrent RGA CRDT Example ===\n");

    many_threads_single_replica_demo();
    println!();

    multi_replica_convergence_demo();
}

/// Many threads insert into one shared [`CrdtManager`] concurrently,
/// exercising its internal lock rather than any unsynchronized state.
fn many_threads_single_replica_demo() {
    println!("--- Concurrent inserts into one replica ---");

    let num_threads = 4;
    let ops_per_thread = 50;
    let manager = Arc::new(CrdtManager::new("shared"));

    let start = Instant::now();
    let handles: Vec<_> = (0..num_threads)
        .map(|thread_id| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for i in 0..ops_per_thread {
                    let ch = (b'a' + ((thread_id * ops_per_thread + i) % 26) as u8) as char;
                    // Every thread appends at the current end; a handful of
                    // conflicting positions are expected and is exactly what
                    // the RGA's tie-break rule resolves deterministically.
                    let len = manager.read(DOC).chars().count();
                    let _ = manager.local_insert(DOC, len, ch);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let elapsed = start.elapsed();
    println!(
        "{} threads x {} ops completed in {:?}",
        num_threads, ops_per_thread, elapsed
    );
    println!("Final length: {}", manager.read(DOC).chars().count());
}

/// Several independent replicas type concurrently, then fully cross-apply
/// each other's ops and confirm they converge to the same text.
fn multi_replica_convergence_demo() {
    println!("--- Multi-replica convergence ---");

    let num_replicas = 6;
    let managers: Vec<CrdtManager> = (0..num_replicas)
        .map(|i| CrdtManager::new(format!("site-{i}")))
        .collect();

    let mut all_ops: Vec<Op> = Vec::new();
    for (i, manager) in managers.iter().enumerate() {
        let ch = (b'A' + i as u8) as char;
        for _ in 0..10 {
            let origin = manager.local_insert(DOC, 0, ch).unwrap().origin_left;
            all_ops.push(to_wire_op(manager, ch, &origin));
        }
    }

    println!("Collected {} ops across {} replicas", all_ops.len(), num_replicas);

    for manager in &managers {
        for op in &all_ops {
            let _ = manager.apply_remote(DOC, op.clone());
        }
    }

    let reference = managers[0].read(DOC);
    let all_converged = managers.iter().all(|m| m.read(DOC) == reference);

    if all_converged {
        println!("All {num_replicas} replicas converged to: '{reference}'");
    } else {
        for (i, manager) in managers.iter().enumerate() {
            println!("  replica {i}: '{}'", manager.read(DOC));
        }
        panic!("replicas failed to converge");
    }
}
