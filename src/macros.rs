/// Implements `HasEventHandle` for each handle field of a subscriber struct.
///
/// # Syntax
///
/// ```rust,ignore
/// event_handles!(MyStruct {
///     field1 => dyn Interface1,
///     field2 => dyn Interface2,
/// });
/// ```
///
/// # Example
///
/// ```rust,ignore
/// struct Audit {
///     orders: EventHandle<dyn OrderEvents>,
///     refunds: EventHandle<dyn RefundEvents>,
/// }
///
/// event_handles!(Audit {
///     orders => dyn OrderEvents,
///     refunds => dyn RefundEvents,
/// });
///
/// audit.set_first_priority::<dyn OrderEvents>();
/// assert!(audit.is_subscribed::<dyn RefundEvents>());
/// ```
#[macro_export]
macro_rules! event_handles {
    ($name:ty { $($field:ident => $interface:ty),+ $(,)? }) => {
        $(
            impl $crate::HasEventHandle<$interface> for $name {
                fn event_handle(&self) -> &$crate::EventHandle<$interface> {
                    &self.$field
                }
            }
        )+
    };
}
