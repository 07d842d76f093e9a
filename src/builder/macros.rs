//! Macros for ergonomic state definitions.

/// Define a unit-variant enum and implement [`State`](crate::core::State)
/// for it.
///
/// The enum derives `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Debug` and
/// serde's `Serialize`/`Deserialize` (so the calling crate needs `serde`).
///
/// # Example
///
/// ```
/// use gearshift::core::State;
/// use gearshift::state_enum;
///
/// state_enum! {
///     pub enum Door {
///         Open,
///         Closed,
///         Locked,
///     }
///     final: [Locked]
/// }
///
/// assert_eq!(Door::Closed.name(), "Closed");
/// assert!(Door::Locked.is_final());
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

        $(final: [$($final:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
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

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::core::State;

    state_enum! {
        enum Phase {
            Idle,
            Running,
            Done,
        }
        final: [Done]
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        assert_eq!(Phase::Running.name(), "Running");
        assert!(!Phase::Idle.is_final());
        assert!(Phase::Done.is_final());
    }

    #[test]
    fn state_enum_variants_are_distinct_variants() {
        assert!(Phase::Idle.same_variant(&Phase::Idle));
        assert!(!Phase::Idle.same_variant(&Phase::Done));
    }

    #[test]
    fn state_enum_works_without_final() {
        state_enum! {
            enum Toggle {
                Off,
                On,
            }
        }

        assert!(!Toggle::On.is_final());
        assert_eq!(Toggle::Off.name(), "Off");
    }
}
