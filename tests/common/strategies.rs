use proptest::prelude::*;

/// Threshold values as they would be typed in a load list
pub fn load_value_strategy() -> impl Strategy<Value = u32> {
    0u32..=100
}

/// Separator between a threshold key and its value
pub fn key_value_separator_strategy() -> impl Strategy<Value = char> {
    prop_oneof![Just('='), Just(':')]
}

/// Optional whitespace around list items
pub fn padding_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), Just(" ".to_string()), Just("  ".to_string())]
}
