//! Guarded execution of module lifecycle steps.
//!
//! A guarded step never propagates failure: an `Err` or a panic is logged with its label,
//! announced on the bus as `error {label, error}`, and turned into `None`.

use futures_util::FutureExt;
use serde_json::json;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::error;
use veneer_event_bus::{ERROR, EventBus};

/// Runs an async step, catching both `Err` and panics.
///
/// ```rust
/// use veneer_event_bus::EventBus;
/// use veneer_kernel::guard::guard;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bus = EventBus::new();
/// let out: Option<()> = guard(Some(&bus), "init:Widget", async { anyhow::bail!("no DOM") }).await;
/// assert!(out.is_none());
///
/// let out: Option<u8> = guard(None, "init:Other", async { Ok(7) }).await;
/// assert_eq!(out, Some(7));
/// # }
/// ```
pub async fn guard<T, F>(bus: Option<&EventBus>, label: &str, step: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            report(bus, label, &format!("{err:#}"));
            None
        },
        Err(panic) => {
            report(bus, label, &panic_message(panic.as_ref()));
            None
        },
    }
}

/// Best-effort text of a caught panic payload.
#[must_use]
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_owned())
}

fn report(bus: Option<&EventBus>, label: &str, message: &str) {
    error!(label, error = message, "Guarded step failed");
    if let Some(bus) = bus {
        bus.emit(ERROR, json!({ "label": label, "error": message }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn error_sink(bus: &EventBus) -> Arc<Mutex<Vec<Value>>> {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let target = sink.clone();
        bus.on(ERROR, move |payload| target.lock().unwrap().push(payload.clone()));
        sink
    }

    #[tokio::test]
    async fn errors_are_reported_with_label() {
        let bus = EventBus::new();
        let sink = error_sink(&bus);

        let out: Option<()> =
            guard(Some(&bus), "init:Widget", async { Err(anyhow::anyhow!("boom")) }).await;

        assert!(out.is_none());
        assert_eq!(*sink.lock().unwrap(), [json!({ "label": "init:Widget", "error": "boom" })]);
    }

    #[tokio::test]
    async fn panics_are_caught() {
        let bus = EventBus::new();
        let sink = error_sink(&bus);

        async fn explode() -> anyhow::Result<()> {
            panic!("kaboom")
        }

        let out = guard(Some(&bus), "init:Panicky", explode()).await;

        assert!(out.is_none());
        assert_eq!(*sink.lock().unwrap(), [json!({ "label": "init:Panicky", "error": "kaboom" })]);
    }

    #[tokio::test]
    async fn steps_may_suspend_before_failing() {
        let bus = EventBus::new();
        let sink = error_sink(&bus);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let out: Option<()> = guard(Some(&bus), "stop:Widget", async move {
            tokio::task::yield_now().await;
            seen.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("still attached")
        })
        .await;

        assert!(out.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sink.lock().unwrap()[0]["error"], "still attached");
    }

    #[test]
    fn formatted_panic_payloads_keep_their_text() {
        let payload: Box<dyn Any + Send> = Box::new(format!("code {}", 42));
        assert_eq!(panic_message(payload.as_ref()), "code 42");

        let opaque: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(opaque.as_ref()), "panic");
    }
}
