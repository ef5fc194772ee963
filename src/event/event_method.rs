//! Adapters that let a notification method be named as a dispatch target.

/// A notification method that can be invoked on a subscriber with an argument tuple.
///
/// Implemented for every `Fn(&I, A1, .., An) -> Result<(), E>` with up to six
/// arguments, which covers trait methods named through the interface type:
///
/// ```rust,ignore
/// bus.send_event(<dyn OrderEvents>::on_placed, &(order_id, total))?;
/// ```
///
/// Arguments travel as a tuple so that the dispatcher can clone the whole set once
/// per subscriber invocation.
pub trait EventMethod<I: ?Sized, Args, E> {
    fn invoke(&self, subscriber: &I, args: Args) -> Result<(), E>;
}

macro_rules! impl_event_method {
    ($($arg:ident),*) => {
        impl<I, E, Func, $($arg,)*> EventMethod<I, ($($arg,)*), E> for Func
        where
            I: ?Sized,
            Func: Fn(&I, $($arg),*) -> Result<(), E>,
        {
            #[allow(non_snake_case)]
            fn invoke(&self, subscriber: &I, ($($arg,)*): ($($arg,)*)) -> Result<(), E> {
                self(subscriber, $($arg),*)
            }
        }
    };
}

impl_event_method!();
impl_event_method!(A1);
impl_event_method!(A1, A2);
impl_event_method!(A1, A2, A3);
impl_event_method!(A1, A2, A3, A4);
impl_event_method!(A1, A2, A3, A4, A5);
impl_event_method!(A1, A2, A3, A4, A5, A6);
