//! Basic Suite Demo
//!
//! Declares a small nested suite with lifecycle hooks and streams it through
//! the console reporter. The process exit code follows the run outcome.
//!
//! # Running
//!
//! ```bash
//! cargo run --example basic_suite -p describir
//! ```

use describir::{run, Block, ConsoleReporter, DescribirError};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let suite = Block::build(|root| {
        root.block("inventory", |inv| {
            inv.before(|| {
                println!("(opening store)");
                Ok(())
            });
            inv.after(|| {
                println!("(closing store)");
                Ok(())
            });
            inv.before_each(|| {
                println!("(resetting cart)");
                Ok(())
            });

            inv.test("adds an item", || {
                assert_eq!(1 + 1, 2);
                Ok(())
            });
            inv.test("rejects a negative quantity", || {
                Err(DescribirError::assertion("quantity -1 was accepted"))
            });
            inv.pending("applies bulk discounts");

            inv.block("checkout", |checkout| {
                checkout.test("totals the cart", || {
                    let prices = [300, 550, 125];
                    assert_eq!(prices.iter().sum::<i32>(), 975);
                    Ok(())
                });
            });
        });
    });

    let summary = run(&suite, &mut ConsoleReporter::stdout());
    std::process::exit(summary.exit_code());
}
