/// Declares an enum persisted as TEXT.
///
/// Generates `as_str`, `ALL`, `Display`, `FromStr` and `TryFrom<String>` so the
/// type can be bound with `.bind(x.as_str())` and decoded with
/// `#[sqlx(try_from = "String")]`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err($crate::error::ParseEnumError::new(stringify!($name), other)),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::error::ParseEnumError;

            fn try_from(value: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
                value.parse()
            }
        }
    };
}

/// Implements the core entity traits for a struct carrying the base fields
macro_rules! impl_entity {
    ($ty:ty, $table:literal, $type_name:literal) => {
        impl fo_core::traits::Identifiable for $ty {
            fn id(&self) -> fo_core::traits::Id {
                self.id
            }
        }

        impl fo_core::traits::Timestamped for $ty {
            fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.created_at
            }
            fn updated_at(&self) -> chrono::DateTime<chrono::Utc> {
                self.updated_at
            }
        }

        impl fo_core::traits::SoftDeletable for $ty {
            fn deleted_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
                self.deleted_at
            }
        }

        impl fo_core::traits::Auditable for $ty {
            fn created_by_id(&self) -> Option<fo_core::traits::Id> {
                self.created_by_id
            }
            fn updated_by_id(&self) -> Option<fo_core::traits::Id> {
                self.updated_by_id
            }
        }

        impl fo_core::traits::Entity for $ty {
            const TABLE_NAME: &'static str = $table;
            const TYPE_NAME: &'static str = $type_name;
        }
    };
}
