//! Macros for ergonomic machine construction.

/// Build a [`TransitionTable`](crate::core::TransitionTable) from
/// `source => [targets]` rows.
///
/// The `ANY` and `DEFAULT` markers from [`crate::core`] may be used on
/// either side.
///
/// # Example
///
/// ```
/// use settle::core::ANY;
/// use settle::transition_table;
///
/// let table = transition_table! {
///     "Red" => ["Green"],
///     "Green" => ["Yellow", "Red"],
///     ANY => ["Off"],
/// };
///
/// assert!(table.permits("Red", "Green"));
/// assert!(table.permits("Yellow", "Off"));
/// assert!(!table.permits("Red", "Yellow"));
/// ```
#[macro_export]
macro_rules! transition_table {
    ( $( $from:expr => [ $( $to:expr ),* $(,)? ] ),* $(,)? ) => {{
        #[allow(unused_mut)]
        let mut table = $crate::core::TransitionTable::new();
        $(
            let targets: &[&str] = &[ $( $to ),* ];
            table = table.allow($from, targets.iter().copied());
        )*
        table
    }};
}
