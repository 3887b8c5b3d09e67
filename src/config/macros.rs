/// Configuration macros
///
/// `config_struct!` declares a config section with its defaults inline:
///
/// ```ignore
/// config_struct! {
///     pub struct RefresherConfig {
///         tick_interval_ms: u64 = 1000,
///         enabled: bool = true,
///     }
/// }
/// ```
///
/// and generates the struct with public fields, a `Default` impl using the
/// given values, serde support with `#[serde(default)]` so partial TOML files
/// work, and `field_names()` which the loader uses to flag unknown keys.
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }

        impl $name {
            /// Keys accepted in this section of the TOML file
            pub fn field_names() -> &'static [&'static str] {
                &[$(stringify!($field_name)),*]
            }
        }
    };
}
