//! Tag Filtering Demo
//!
//! Runs the same suite several ways: unfiltered, with include/exclude tag
//! sets, and with a boolean tag expression. Tags declared on a block are
//! inherited by every test beneath it.
//!
//! # Running
//!
//! ```bash
//! cargo run --example tag_filtering -p describir
//! ```

use describir::{run_filtered, Block, ReportCollector, TagSet, Test, TestFilter};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let suite = build_suite();
    println!("=== Tag Filtering Demo ===");
    println!("suite declares {} tests\n", suite.test_count());

    demo_unfiltered(&suite);
    demo_tag_sets(&suite);
    demo_expression(&suite);
}

fn build_suite() -> Block {
    Block::build(|root| {
        root.block("api", |api| {
            api.tag("api");
            api.push_test(Test::new("login succeeds").with_tag("smoke").with_action(|| Ok(())));
            api.push_test(
                Test::new("bulk import finishes")
                    .with_tag("slow")
                    .with_action(|| Ok(())),
            );
        });
        root.block("parser", |parser| {
            parser.tag("unit");
            parser.push_test(
                Test::new("handles empty input")
                    .with_tag("smoke")
                    .with_action(|| Ok(())),
            );
            parser.test("handles unicode", || Ok(()));
        });
    })
}

fn demo_unfiltered(suite: &Block) {
    println!("--- Demo 1: Unfiltered ---");
    report(suite, &TestFilter::All);
}

fn demo_tag_sets(suite: &Block) {
    println!("--- Demo 2: Include {{smoke}} ---");
    let include: TagSet = ["smoke"].into_iter().collect();
    report(suite, &TestFilter::tags(include, TagSet::new()));

    println!("--- Demo 3: Exclude {{slow}} ---");
    let exclude: TagSet = ["slow"].into_iter().collect();
    report(suite, &TestFilter::tags(TagSet::new(), exclude));
}

fn demo_expression(suite: &Block) {
    println!("--- Demo 4: Expression and(api, not(slow)) ---");
    let filter = TestFilter::expression("and(api, not(slow))").expect("expression parses");
    report(suite, &filter);
}

fn report(suite: &Block, filter: &TestFilter) {
    let mut collector = ReportCollector::new().with_name("tag-filtering-demo");
    run_filtered(suite, filter, &mut collector);
    for record in collector.records() {
        println!("  ran: {}", record.name);
    }
    println!("  {}\n", collector.summary());
}
