//! Macros for ergonomic state declaration.

/// Generate a state enum and its `State` implementation.
///
/// Variants listed under `idle:` report `is_idle() == true`.
///
/// # Example
///
/// ```
/// use pollfsm::state_enum;
/// use pollfsm::core::State;
///
/// state_enum! {
///     pub enum LinkState {
///         Listening,
///         Sending,
///     }
///     idle: [Listening]
/// }
///
/// assert!(LinkState::Listening.is_idle());
/// assert_eq!(LinkState::Sending.name(), "Sending");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(idle: [$($idle:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_idle(&self) -> bool {
                match self {
                    $($(Self::$idle => true,)*)?
                    #[allow(unreachable_patterns)]
                    _ => false,
                }
            }
        }
    };
}
