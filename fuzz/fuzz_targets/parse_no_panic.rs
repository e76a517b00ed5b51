#![no_main]

use detoml::parse_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: &[u8]| {
    let _ = parse_slice(input);
});
