//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use eventhub_core::async_effect;
///
/// async_effect! {
///     let doc = store.get("users", "u-1").await.ok().flatten();
///     Some(BookingAction::ProfileLoaded { doc })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Future` that immediately feeds back a ready action
///
/// Reducers use this when a command is rejected synchronously: the runtime
/// only broadcasts actions produced by effects, so a rejection has to travel
/// through an effect to reach callers waiting on the store.
///
/// # Example
///
/// ```rust,ignore
/// use eventhub_core::reply;
///
/// reply!(BookingAction::RequestRejected { correlation_id, error })
/// ```
#[macro_export]
macro_rules! reply {
    ($action:expr) => {{
        let action = $action;
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move { Some(action) }))
    }};
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Loaded { value: i32 },
        Rejected { reason: String },
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::Loaded { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[tokio::test]
    async fn test_reply_macro_yields_action() {
        let effect = reply!(TestAction::Rejected {
            reason: "past date".to_string(),
        });

        let Effect::Future(fut) = effect else {
            unreachable!("reply! always builds a future effect");
        };
        assert_eq!(
            fut.await,
            Some(TestAction::Rejected {
                reason: "past date".to_string()
            })
        );
    }
}
