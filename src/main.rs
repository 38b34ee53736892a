use stress_test::{stress_test_pipeline, stress_test_scaling, stress_test_union};

use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("tributary stress harness starting");

    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║            THREADED STRESS TESTS                            ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    // Test 1: Union with small scale
    let stats = stress_test_union(4, 4, 500);
    stats.print();

    // Test 2: Union with medium scale
    let stats = stress_test_union(10, 8, 1_000);
    stats.print();

    // Test 3: A nested pipeline under contention
    let stats = stress_test_pipeline(6, 800);
    stats.print();

    // Test 4: Scaling analysis
    println!("\n\n╔════════════════════════════════════════════════════════════╗");
    println!("║          SCALING ANALYSIS (Union)                          ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    stress_test_scaling(16, 4);

    println!("\n✓ All stress tests completed successfully!");
}
