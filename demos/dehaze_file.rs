//! Dehaze a single image file.
//!
//! Usage:
//! ```sh
//! cargo run --example dehaze_file -- foggy.jpg clear.jpg
//! ```

use std::env;
use std::process;

use dcp_dehaze::{Dehazer, ProcessOptions};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let dehazer = Dehazer::with_defaults();
    let opts = ProcessOptions::default();
    let result = dehazer.process_file(input.as_ref(), output.as_ref(), &opts);

    if result.success {
        println!("Done: {}", result.message);
        if let Some(a) = result.atmosphere {
            println!("Atmospheric light: {:?}", a.components());
        }
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
