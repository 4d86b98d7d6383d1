// (c) Copyright 2025 Helsing GmbH. All rights reserved.
/// Convenience macro for building a nested [`Object`](crate::Object).
///
/// Values in braces become nested objects, values in brackets become array objects. Any other
/// value must be a single token tree convertible into a [`Value`](crate::Value); wrap longer
/// expressions (such as negative numbers) in parentheses.
///
/// ```rust
/// # use staged::{object, Value};
/// let object = object! {
///     "name" => "bing",
///     "size" => (-1),
///     "nested" => {
///         "flag" => true
///     },
///     "tags" => ["a", "b"]
/// };
/// assert_eq!(object.get("size"), Some(Value::from(-1)));
/// ```
#[macro_export]
macro_rules! object {
    (@value { $($inner:tt)* }) => {
        $crate::Value::Object($crate::object!($($inner)*))
    };
    (@value [ $($item:tt),* $(,)? ]) => {
        $crate::Value::Object($crate::Object::from_values::<_, $crate::Value>([
            $( $crate::object!(@value $item) ),*
        ]))
    };
    (@value $value:expr) => {
        $crate::Value::from($value)
    };
    () => {
        $crate::Object::new()
    };
    ($($key:expr => $value:tt),+ $(,)?) => {{
        let object = $crate::Object::new();
        $( object.insert($key, $crate::object!(@value $value)); )+
        object
    }};
}
