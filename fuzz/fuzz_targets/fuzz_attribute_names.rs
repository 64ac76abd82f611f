#![no_main]

use arbitrary::Arbitrary;
use chartwire_core::{AttributeNaming, normalize_attribute_name};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    prefix: String,
    raw: String,
}

fuzz_target!(|input: Input| {
    let normalized = normalize_attribute_name(&input.raw);
    assert_eq!(normalize_attribute_name(&normalized), normalized);

    if input.prefix.is_empty() {
        return;
    }
    let naming = AttributeNaming::new(input.prefix);
    let canonical = naming.to_canonical(&normalized);
    if naming.is_prefixed(&normalized) {
        let _ = naming.to_external(&canonical);
    }
});
