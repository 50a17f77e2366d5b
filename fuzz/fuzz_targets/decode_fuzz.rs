//! DTB decoder fuzz target: arbitrary bytes must decode or fail cleanly, and a
//! decoded document must serialize again without panicking.
//! Build with: cargo fuzz run decode_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Ok(doc) = dtbc::decode(data) else {
        return;
    };
    let _ = dtbc::native::to_bytes(&doc);
    let _ = dtbc::encode(&doc);
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run decode_fuzz");
}
