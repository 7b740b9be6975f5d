//! Macros for declaring statechart state enums.

/// Generate a state enum and its [`State`](crate::core::State) implementation.
///
/// Variants must be listed depth-first: every composite state is followed by
/// all of its descendants. The optional clauses, in this order, describe the
/// hierarchy:
///
/// - `composite: { Parent => LastDescendant, .. }`
/// - `initial: { Parent => [DefaultChild, ..], .. }` (one child per region)
/// - `slots: { 1 => [State, ..], .. }` (states living in a slot other than 0)
/// - `final: [..]` and `error: [..]`
///
/// # Example
///
/// ```
/// use railchart::state_enum;
/// use railchart::core::State;
///
/// state_enum! {
///     pub enum Crossing {
///         Open,
///         Closing,
///         Closed,
///         ClosedBarrier,
///         ClosedLights,
///     }
///     composite: { Closed => ClosedLights }
///     initial: { Closed => [ClosedBarrier, ClosedLights] }
///     slots: { 1 => [ClosedLights] }
/// }
///
/// assert_eq!(Crossing::ClosedLights.slot(), 1);
/// assert_eq!(Crossing::Closed.initial().len(), 2);
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

        $(composite: { $($comp:ident => $last:ident),* $(,)? })?
        $(initial: { $($parent:ident => [$($child:ident),* $(,)?]),* $(,)? })?
        $(slots: { $($slot:literal => [$($slotted:ident),* $(,)?]),* $(,)? })?
        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        #[allow(unreachable_patterns)]
        impl $crate::core::State for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn all() -> &'static [Self] {
                &[$(Self::$variant),*]
            }

            fn ordinal(&self) -> usize {
                *self as usize
            }

            fn last_descendant(&self) -> usize {
                match self {
                    $($(Self::$comp => Self::$last as usize,)*)?
                    _ => *self as usize,
                }
            }

            fn slot(&self) -> usize {
                match self {
                    $($($(Self::$slotted)|* => $slot,)*)?
                    _ => 0,
                }
            }

            fn initial(&self) -> &'static [Self] {
                match self {
                    $($(Self::$parent => &[$(Self::$child),*],)*)?
                    _ => &[],
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }
    };
}
