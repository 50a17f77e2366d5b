//! Parser fuzz target: feed arbitrary bytes to the DTA parser.
//! The parser must not panic; whatever parses must also encode and decode back.
//! Build with: cargo fuzz run parse_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Ok(mut doc) = dtbc::parse(data) else {
        return;
    };
    doc.renumber_from(1);
    if let Ok(bytes) = dtbc::encode(&doc) {
        dtbc::decode(&bytes).expect("encoded document must decode");
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parse_fuzz");
}
