//! Example: Incremental Union of Live Rosters
//!
//! This example demonstrates:
//! 1. Editable `SourceSet` collections publishing change batches
//! 2. A `union` combination maintained incrementally as sources change
//! 3. Occurrence counting:  an item joins once and leaves with its last copy

use osa_combine::union;
use osa_core::change::ChangeSet;
use osa_stream::{ChangeStream, SourceSet};

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Incremental Union Example");
    println!("═══════════════════════════════════════════════════════════════\n");

    example_1_live_union();
    example_2_occurrence_counting();

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  All examples completed successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}

/// Example 1: A union that follows its sources
fn example_1_live_union() {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 1: A Union That Follows Its Sources                │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    let staff = SourceSet::new();
    staff.extend(["ada", "brian"]);
    let guests = SourceSet::new();
    guests.add("grace");

    let everyone = union(vec![staff.as_stream(), guests.as_stream()]).unwrap();
    println!("Initial contents: {:?}", everyone.snapshot());

    // Print every batch the combination delivers.  The subscription opens
    // with a replay of the current contents, then live batches follow.
    println!("\nSubscribing...");
    let _subscription = everyone.subscribe_fn(|batch: ChangeSet<&str>| {
        println!("  emitted: {:?}", batch);
    });

    println!("\nstaff.add(\"dennis\")");
    staff.add("dennis");

    println!("guests.remove(\"grace\")");
    guests.remove(&"grace");

    println!("\nFinal contents: {:?}", everyone.snapshot());
    assert_eq!(everyone.snapshot().len(), 3);

    println!("\n✓ The union followed both sources\n");
}

/// Example 2: Occurrence counting across sources
fn example_2_occurrence_counting() {
    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│ Example 2: Occurrence Counting Across Sources              │");
    println!("└─────────────────────────────────────────────────────────────┘\n");

    let day_shift = SourceSet::new();
    let night_shift = SourceSet::new();
    let on_site = union(vec![day_shift.as_stream(), night_shift.as_stream()]).unwrap();

    let _subscription = on_site.subscribe_fn(|batch: ChangeSet<&str>| {
        println!("  emitted: {:?}", batch);
    });

    println!("day_shift.add(\"kim\")       (first occurrence joins)");
    day_shift.add("kim");
    println!("night_shift.add(\"kim\")     (second occurrence is silent)");
    night_shift.add("kim");
    println!("day_shift.remove(\"kim\")    (one copy left, still a member)");
    day_shift.remove(&"kim");
    println!("night_shift.remove(\"kim\")  (last copy gone, member leaves)");
    night_shift.remove(&"kim");

    assert!(on_site.snapshot().is_empty());

    println!("\n✓ Membership tracked occurrences, not edits\n");
}
