//! Schema declaration macros for records and fieldless unions.

/// Implements [`Wire`](crate::Wire) for a struct as a record.
///
/// Fields are written and read in the order they are listed, which must be
/// the order both sides of the boundary agreed on. Listing fields in a
/// different order than the struct declares them is allowed but changes
/// the wire layout.
///
/// ```
/// use web5_wire::wire_record;
///
/// struct Service {
///     id: String,
///     r#type: String,
///     service_endpoint: Vec<String>,
/// }
///
/// wire_record!(Service { id, r#type, service_endpoint });
/// ```
#[macro_export]
macro_rules! wire_record {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl $crate::Wire for $name {
            #[allow(unused_variables)]
            fn write(&self, buf: &mut ::std::vec::Vec<u8>) {
                $( $crate::Wire::write(&self.$field, buf); )*
            }

            #[allow(unused_variables)]
            fn read(buf: &mut &[u8]) -> $crate::CodecResult<Self> {
                Ok($name {
                    $( $field: $crate::Wire::read(buf)?, )*
                })
            }
        }
    };
}

/// Implements [`Wire`](crate::Wire) for a fieldless enum.
///
/// The discriminant is written as an `i32`. Discriminants are 1-based and
/// fixed when the schema is defined; reading any other value fails with
/// [`CodecError::UnknownDiscriminant`](crate::CodecError::UnknownDiscriminant).
///
/// ```
/// use web5_wire::wire_enum;
///
/// enum Curve {
///     Ed25519,
///     Secp256k1,
/// }
///
/// wire_enum!(Curve { Ed25519 = 1, Secp256k1 = 2 });
/// ```
#[macro_export]
macro_rules! wire_enum {
    ($name:ident { $($variant:ident = $disc:literal),+ $(,)? }) => {
        impl $crate::Wire for $name {
            fn write(&self, buf: &mut ::std::vec::Vec<u8>) {
                let discriminant: i32 = match self {
                    $( $name::$variant => $disc, )+
                };
                $crate::Wire::write(&discriminant, buf);
            }

            fn read(buf: &mut &[u8]) -> $crate::CodecResult<Self> {
                match <i32 as $crate::Wire>::read(buf)? {
                    $( $disc => Ok($name::$variant), )+
                    other => Err($crate::CodecError::unknown_discriminant(
                        stringify!($name),
                        other,
                    )),
                }
            }
        }
    };
}
