use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A typed bind parameter for a `?` placeholder in a submitted statement.
///
/// The API transmits every binding as a type tag plus a string rendering;
/// the tag tells the server how to parse the string back, so these do not
/// round-trip through the result cells.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "type")]
pub enum Binding {
    Fixed { value: String },
    Real { value: String },
    Text { value: String },
    Boolean { value: String },
    Date { value: String },
    Time { value: String },
    TimestampNtz { value: String },
}

macro_rules! impl_binding {
    ($ty: ty, $variant: ident) => {
        impl From<$ty> for Binding {
            fn from(value: $ty) -> Self {
                Binding::$variant {
                    value: value.to_string(),
                }
            }
        }
    };
}

impl_binding!(i8, Fixed);
impl_binding!(i16, Fixed);
impl_binding!(i32, Fixed);
impl_binding!(i64, Fixed);
impl_binding!(isize, Fixed);
impl_binding!(u8, Fixed);
impl_binding!(u16, Fixed);
impl_binding!(u32, Fixed);
impl_binding!(u64, Fixed);
impl_binding!(usize, Fixed);
impl_binding!(f32, Real);
impl_binding!(f64, Real);
impl_binding!(bool, Boolean);
impl_binding!(char, Text);
impl_binding!(String, Text);
impl_binding!(&str, Text);
impl_binding!(NaiveDate, Date);
impl_binding!(NaiveTime, Time);
impl_binding!(NaiveDateTime, TimestampNtz);

impl From<&[u8]> for Binding {
    fn from(value: &[u8]) -> Self {
        Binding::Text {
            value: hex::encode(value),
        }
    }
}
