//! Minimal end-to-end demo: check a PLTL property against a toggling
//! two-state counter and print the verdict.

use sbmc_core::{Driver, ExplicitFsm, Formula, RunConfig, Verdict};

fn main() {
    tracing_subscriber::fmt::init();

    let fsm = ExplicitFsm::toggling_counter();
    let phi = Formula::globally(Formula::or(Formula::atom("s"), Formula::not_atom("s")));

    let config = RunConfig {
        completeness: true,
        max_bound: Some(8),
        ..RunConfig::default()
    };
    let mut driver = Driver::new(&config);

    match driver.check_ltl(&fsm, &phi, &config) {
        Ok(Verdict::Holds { diameter }) => {
            println!("property holds (completeness reached at bound {diameter})");
        }
        Ok(Verdict::Violated { bound, trace }) => {
            println!("property violated at bound {bound}:");
            print!("{trace}");
        }
        Ok(Verdict::Unknown { reached_bound }) => {
            println!("unknown within bound {reached_bound}");
        }
        Err(e) => {
            eprintln!("verification error: {e}");
            std::process::exit(1);
        }
    }
}
