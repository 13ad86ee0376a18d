//! Realistic collaborative editing example using the RGA CRDT manager.
//!
//! Simulates two users (Alice and Bob) collaboratively editing a document,
//! demonstrating turn-based editing followed by a genuinely concurrent
//! scenario where both start typing from the same position at once.
//!
//! Run with: cargo run --example simple

use rga_filesync::CrdtManager;
use rga_filesync::protocol::edit::Op;

const DOC: &str = "shared.txt";

/// Types `text` into `manager` starting at visible index `start`, returning
/// the wire op for each character in typed order — what a real client would
/// hand to the edit WebSocket for broadcast.
fn type_text(manager: &CrdtManager, doc: &str, start: usize, text: &str) -> Vec<Op> {
    let mut index = start;
    let mut ops = Vec::new();
    for ch in text.chars() {
        let insert = manager.local_insert(doc, index, ch).unwrap();
        ops.push(Op::Insert {
            site: manager.site_id().to_string(),
            clock: manager.clock(),
            content: ch.to_string(),
            origin_left_site: if insert.origin_left.is_sentinel() {
                String::new()
            } else {
                insert.origin_left.site.to_string()
            },
            origin_left_clock: if insert.origin_left.is_sentinel() { 0 } else { insert.origin_left.clock },
        });
        index += 1;
    }
    ops
}

fn apply_all(manager: &CrdtManager, doc: &str, ops: &[Op]) {
    for op in ops {
        manager.apply_remote(doc, op.clone()).unwrap();
    }
}

fn main() {
    println!("=== Collaborative Text Editor with RGA CRDT ===");

    // === Scenario 1: Turn-based editing ===
    println!("\nScenario 1: Turn-based editing\n");

    let alice = CrdtManager::new("alice");
    let bob = CrdtManager::new("bob");

    println!("Alice types \"Hello\"");
    let alice_ops = type_text(&alice, DOC, 0, "Hello");
    println!("  Alice sees: '{}'", alice.read(DOC));

    println!("\nSyncing Alice -> Bob");
    apply_all(&bob, DOC, &alice_ops);
    println!("  Bob sees:   '{}'", bob.read(DOC));

    println!("\nBob continues with \" World!\"");
    let bob_start = bob.read(DOC).chars().count();
    let bob_ops = type_text(&bob, DOC, bob_start, " World!");
    println!("  Bob sees:   '{}'", bob.read(DOC));

    println!("\nSyncing Bob -> Alice");
    apply_all(&alice, DOC, &bob_ops);
    println!("  Alice sees: '{}'", alice.read(DOC));
    assert_eq!(alice.read(DOC), bob.read(DOC));
    println!("  Converged!");

    // === Scenario 2: Concurrent editing ===
    println!("\nScenario 2: Concurrent editing (the interesting case)\n");

    let alice2 = CrdtManager::new("alice");
    let bob2 = CrdtManager::new("bob");

    println!("Both users type at position 0 simultaneously");
    let alice2_ops = type_text(&alice2, DOC, 0, "Fast");
    let bob2_ops = type_text(&bob2, DOC, 0, "Code");

    println!("  Alice's view before sync: '{}'", alice2.read(DOC));
    println!("  Bob's view before sync:   '{}'", bob2.read(DOC));

    println!("\nFull mesh sync");
    apply_all(&bob2, DOC, &alice2_ops);
    apply_all(&alice2, DOC, &bob2_ops);

    println!("  Alice's view after sync: '{}'", alice2.read(DOC));
    println!("  Bob's view after sync:   '{}'", bob2.read(DOC));
    assert_eq!(alice2.read(DOC), bob2.read(DOC));
    println!("  Converged despite concurrent inserts at the same position!");
}
