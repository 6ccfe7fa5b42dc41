//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - IBM Quantum job and backend dashboard",
        style("qdash").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qdash-core         Cache, synthetic data and credentials");
    println!("  qdash-adapter-ibm  IBM Quantum Cloud data source");
    println!("  qdash-cli          Command-line interface");
    println!();
    println!("License: {}", style("Apache-2.0").dim());
}
