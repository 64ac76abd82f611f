#![no_main]

use chartwire_core::{OptionMap, Value, evaluate, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(expr) = parse(source) else {
        return;
    };
    let mut env = OptionMap::new();
    env.insert("x".into(), Value::from(1));
    env.insert("s".into(), Value::from("text"));
    env.insert("list".into(), Value::Array(vec![Value::Null, Value::from(2)]));
    let _ = evaluate(&expr, &env);
});
