// Macro to generate a 16-bit wire constant newtype, its name table, and trait implementations
#[macro_export]
macro_rules! discriminator_constants {
    (   $(#[$outer:meta])*
        $type_name:ident:
        $( $const_name:ident = $val:expr; )+
    ) => {
        paste::paste! {
            #[doc = concat!("A newtype wrapper around a big-endian u16 representing a ", stringify!($type_name), ".")]
            ///
            /// This type provides named constants for well-known values and implements
            /// `Display` to show human-readable names.
            $(#[$outer])*
            #[repr(transparent)]
            #[derive(
                Clone,
                Copy,
                PartialEq,
                Eq,
                Hash,
                Debug,
                Default,
                FromBytes,
                IntoBytes,
                Immutable,
                KnownLayout,
                Unaligned,
            )]
            pub struct $type_name(pub U16<BigEndian>);

            impl $type_name {
                $(
                    pub const $const_name: $type_name = $type_name(U16::<BigEndian>::new($val));
                )+

                /// Returns the host-order value
                #[inline]
                pub fn get(&self) -> u16 {
                    self.0.get()
                }

                /// Returns true if the value has a well-known name
                pub fn is_known(&self) -> bool {
                    <[< $type_name Name >] as std::convert::TryFrom<u16>>::try_from(self.get()).is_ok()
                }
            }

            // Shadow enum for strum machinery
            #[derive(Debug, PartialEq, strum::EnumString, strum::IntoStaticStr, Clone, Copy)]
            #[strum(serialize_all = "kebab-case")]
            #[allow(non_camel_case_types)]
            enum [< $type_name Name >] {
                $(
                    $const_name,
                )+
            }

            impl TryFrom<u16> for [< $type_name Name >] {
                type Error = ();
                fn try_from(v: u16) -> Result<Self, Self::Error> {
                    $(
                        if v == $val {
                            return Ok([< $type_name Name >]::$const_name);
                        }
                    )+
                    Err(())
                }
            }

            impl From<u16> for $type_name {
                #[inline]
                fn from(v: u16) -> Self {
                    Self(U16::<BigEndian>::new(v))
                }
            }

            impl From<$type_name> for u16 {
                #[inline]
                fn from(v: $type_name) -> Self {
                    v.get()
                }
            }

            impl std::str::FromStr for $type_name {
                type Err = String;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    if let Ok(variant) = <[< $type_name Name >] as std::str::FromStr>::from_str(s) {
                        return Ok(match variant {
                            $(
                                [< $type_name Name >]::$const_name => Self::$const_name,
                            )+
                        });
                    }

                    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                        return u16::from_str_radix(hex, 16)
                            .map(Self::from)
                            .map_err(|_| format!("invalid hex: {}", s));
                    }

                    s.parse::<u16>()
                        .map(Self::from)
                        .map_err(|_| format!("unknown {}: {}", stringify!($type_name), s))
                }
            }

            impl std::fmt::Display for $type_name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    if let Ok(name) = <[< $type_name Name >] as std::convert::TryFrom<u16>>::try_from(self.get()) {
                        let s: &'static str = name.into();
                        f.write_str(s)
                    } else {
                        write!(f, "0x{:04x}", self.get())
                    }
                }
            }

            impl serde::Serialize for $type_name {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: serde::Serializer,
                {
                    serializer.serialize_u16(self.get())
                }
            }

            impl<'de> serde::Deserialize<'de> for $type_name {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let val = <u16 as serde::Deserialize>::deserialize(deserializer)?;
                    Ok(Self::from(val))
                }
            }
        }
    };
}
