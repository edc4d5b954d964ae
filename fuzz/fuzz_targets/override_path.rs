#![no_main]

use arbitrary::Arbitrary;
use experimento::config::{apply_overrides, Override};
use libfuzzer_sys::fuzz_target;

/// Fuzz target for dotted-path overrides
///
/// Applying any parseable override to any parseable document must not panic,
/// and a successful override must be readable back at its path.

#[derive(Arbitrary, Debug)]
struct OverrideInput {
    document: String,
    assignment: String,
}

fuzz_target!(|input: OverrideInput| {
    let Ok(mut value) = serde_yaml::from_str::<serde_yaml::Value>(&input.document) else {
        return;
    };
    let Ok(item) = input.assignment.parse::<Override>() else {
        return;
    };

    if apply_overrides(&mut value, std::slice::from_ref(&item)).is_ok() {
        let mut current = &value;
        for segment in &item.path {
            current = match current {
                serde_yaml::Value::Mapping(map) => &map[segment.as_str()],
                serde_yaml::Value::Sequence(items) => match segment.parse::<usize>() {
                    Ok(index) => &items[index],
                    Err(_) => panic!("sequence segment must be an index"),
                },
                _ => panic!("override path must end at the written value"),
            };
        }
        assert_eq!(current, &item.value);
    }
});
