//! Example: Nested Combinations
//!
//! This example demonstrates:
//! 1. Feeding one combination into another with `into_stream`
//! 2. `(staff ∪ guests) ∖ banned` maintained end to end
//! 3. Edits at any depth flowing through to the outer result

use osa_combine::{relative_complement, union};
use osa_stream::SourceSet;

fn admitted(welcome: &osa_combine::CombinedStream<&'static str>) -> Vec<&'static str> {
    let mut names = welcome.snapshot();
    names.sort_unstable();
    names
}

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Nested Combination Example:  (staff ∪ guests) ∖ banned");
    println!("═══════════════════════════════════════════════════════════════\n");

    let staff = SourceSet::new();
    staff.extend(["ada", "brian"]);
    let guests = SourceSet::new();
    guests.extend(["grace", "dennis"]);
    let banned = SourceSet::new();
    banned.add("dennis");

    // The inner union feeds the outer complement as just another source
    let everyone = union(vec![staff.as_stream(), guests.as_stream()]).unwrap();
    let welcome =
        relative_complement(vec![everyone.into_stream(), banned.as_stream()]).unwrap();

    println!("Admitted: {:?}", admitted(&welcome));
    assert_eq!(admitted(&welcome), vec!["ada", "brian", "grace"]);

    // A ban at the bottom layer flows through both combinations
    println!("\nbanned.add(\"grace\")");
    banned.add("grace");
    println!("Admitted: {:?}", admitted(&welcome));
    assert_eq!(admitted(&welcome), vec!["ada", "brian"]);

    // Lifting a ban readmits
    println!("\nbanned.remove(\"dennis\")");
    banned.remove(&"dennis");
    println!("Admitted: {:?}", admitted(&welcome));
    assert_eq!(admitted(&welcome), vec!["ada", "brian", "dennis"]);

    // New arrivals are checked against the bans
    println!("\nguests.add(\"linus\")");
    guests.add("linus");
    println!("Admitted: {:?}", admitted(&welcome));
    assert_eq!(admitted(&welcome), vec!["ada", "brian", "dennis", "linus"]);

    println!("\n═══════════════════════════════════════════════════════════════");
    println!("  Example completed successfully!");
    println!("═══════════════════════════════════════════════════════════════");
}
