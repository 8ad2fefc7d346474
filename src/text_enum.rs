//! A macro for enums that are stored as text in the database and in JSON.

/// Define a fieldless enum whose variants map one-to-one onto lowercase text.
///
/// The generated enum derives serde traits using the given text, implements
/// [std::fmt::Display], [std::str::FromStr], and the rusqlite [ToSql] and
/// [FromSql] traits so it can be bound to and read from `TEXT` columns.
///
/// [ToSql]: rusqlite::types::ToSql
/// [FromSql]: rusqlite::types::FromSql
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $text)]
                $variant
            ),+
        }

        impl $name {
            /// The text used for this value in the database and in JSON.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                match text {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(
                        "\"{other}\" is not a valid {}",
                        stringify!($name)
                    )),
                }
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value.as_str()?.parse().map_err(|error: String| {
                    rusqlite::types::FromSqlError::Other(error.into())
                })
            }
        }
    };
}

pub(crate) use text_enum;
