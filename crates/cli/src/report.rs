//! Run statistics output.

use application::ForwardingStats;

/// Print a summary of a finished run
pub fn print_summary(stats: &ForwardingStats, subscriptions: usize, destinations: usize) {
    println!("\n================================================================");
    println!("                    Forwarding Statistics");
    println!("================================================================\n");

    println!("Overview");
    println!("   |- Duration: {:.2}s", stats.duration.as_secs_f64());
    println!("   |- Received: {}", stats.received());
    println!("   |- Forwarded: {}", stats.forwarded());
    println!("   |- Throughput: {:.2} msg/s", stats.throughput());
    println!("   |- Peak in flight: {}", stats.peak_in_flight);
    println!("   |- Subscriptions: {}", subscriptions);
    println!("   `- Destinations: {}", destinations);

    println!();
    print!("{}", stats.metrics.summary());
    println!();
}
