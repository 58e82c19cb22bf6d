use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::assembler::{PdfAssembler, PdfHandle};
use crate::error::ContextError;
use crate::invoice::InvoiceDraft;
use crate::templates::TemplateSource;

/// Where the generation of the invoice document stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GenerationState {
    #[default]
    NotStarted,
    InFlight,
    Ready(PdfHandle),
    Failed(ContextError),
}

/// Generates the document of one invoice at most once.
///
/// The first call to [`generate`](InvoicePdfGenerator::generate) moves the generator from
/// `NotStarted` to `InFlight` before anything is awaited, then to `Ready` or `Failed`.
/// Any call made meanwhile or afterwards does nothing, so triggering the generation twice
/// produces a single document and a single readiness notification. A generation whose future
/// is dropped before it finishes goes back to `NotStarted`.
pub struct InvoicePdfGenerator<S> {
    assembler: PdfAssembler<S>,
    state: Mutex<GenerationState>,
}

impl<S: TemplateSource> InvoicePdfGenerator<S> {
    pub fn new(assembler: PdfAssembler<S>) -> Self {
        Self {
            assembler,
            state: Mutex::new(GenerationState::NotStarted),
        }
    }

    pub fn state(&self) -> GenerationState {
        self.lock_state().clone()
    }

    /// Generate the document of the draft and hand it to `on_ready`.
    ///
    /// Returns `Ok(None)` without doing anything when a generation has already been started.
    /// The callback is only invoked once the document has been completely serialized; on
    /// failure it is not invoked and the error is returned and kept in the state.
    pub async fn generate<F>(
        &self,
        draft: &InvoiceDraft,
        on_ready: F,
    ) -> Result<Option<PdfHandle>, ContextError>
    where
        F: FnOnce(&PdfHandle),
    {
        {
            let mut state = self.lock_state();
            if *state != GenerationState::NotStarted {
                log::debug!("Skipping the generation, it has already been started");
                return Ok(None);
            }
            *state = GenerationState::InFlight;
        }
        let guard = InFlightGuard {
            state: &self.state,
            finished: false,
        };

        match self.assembler.compose_handle(draft).await {
            Ok(handle) => {
                guard.finish(GenerationState::Ready(handle.clone()));
                on_ready(&handle);
                Ok(Some(handle))
            }
            Err(error) => {
                log::error!("Failed to generate the invoice document: {}", error);
                guard.finish(GenerationState::Failed(error.clone()));
                Err(error)
            }
        }
    }

    /// Forget a finished generation so that the next call to `generate` starts over.
    /// Returns `false`, leaving the state untouched, while a generation is in flight.
    pub fn reset(&self) -> bool {
        let mut state = self.lock_state();
        if *state == GenerationState::InFlight {
            return false;
        }
        *state = GenerationState::NotStarted;
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, GenerationState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<GenerationState>) -> MutexGuard<'_, GenerationState> {
    // The state is only ever replaced whole, so a poisoned lock still holds a valid value
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Puts an interrupted generation back to `NotStarted` when it is dropped unfinished.
struct InFlightGuard<'a> {
    state: &'a Mutex<GenerationState>,
    finished: bool,
}

impl InFlightGuard<'_> {
    fn finish(mut self, outcome: GenerationState) {
        *lock(self.state) = outcome;
        self.finished = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = lock(self.state);
        if *state == GenerationState::InFlight {
            log::warn!("The generation of the invoice document was interrupted before it finished");
            *state = GenerationState::NotStarted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::error::ErrorKind;
    use crate::invoice::LineItem;
    use crate::templates::{MemoryTemplateSource, TemplateKind};
    use crate::test_support::template_with_inherited_attributes;
    use std::cell::Cell;
    use std::time::Duration;

    struct StalledTemplateSource;

    #[async_trait::async_trait]
    impl TemplateSource for StalledTemplateSource {
        async fn fetch(&self, _kind: TemplateKind) -> Result<Vec<u8>, ContextError> {
            std::future::pending().await
        }
    }

    fn draft() -> InvoiceDraft {
        InvoiceDraft {
            customer_name: "Asha Rao".into(),
            customer_phone: "9876543210".into(),
            customer_address: "12 Lake Road".into(),
            event_name: "Wedding".into(),
            event_date: "2024-02-14".into(),
            days_of_shoot: 1,
            invoice_date: "2024-01-10".into(),
            items: vec![LineItem {
                description: "Candid".into(),
                quantity: 2.0,
                unit_price: 500.0,
                item_type: "Photography".into(),
            }],
            deliverables: vec!["Two Albums".into()],
        }
    }

    fn source(front_pages: usize) -> MemoryTemplateSource {
        MemoryTemplateSource::new()
            .with_template(TemplateKind::Front, template_with_inherited_attributes(front_pages, "front"))
            .with_template(TemplateKind::Estimate, template_with_inherited_attributes(1, "estimate"))
            .with_template(TemplateKind::Deliverable, template_with_inherited_attributes(1, "deliverable"))
            .with_template(TemplateKind::Last, template_with_inherited_attributes(1, "last"))
    }

    fn generator(front_pages: usize) -> InvoicePdfGenerator<MemoryTemplateSource> {
        InvoicePdfGenerator::new(PdfAssembler::new(source(front_pages), Configuration::default()))
    }

    #[tokio::test]
    async fn generates_once_and_notifies_once() {
        let generator = generator(2);
        let notifications = Cell::new(0);

        let handle = generator
            .generate(&draft(), |_| notifications.set(notifications.get() + 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.file_name(), "final_document.pdf");
        assert_eq!(generator.state(), GenerationState::Ready(handle));

        let second = generator
            .generate(&draft(), |_| notifications.set(notifications.get() + 1))
            .await
            .unwrap();
        assert!(second.is_none());
        assert_eq!(notifications.get(), 1);
    }

    #[tokio::test]
    async fn failure_is_kept_and_never_notified() {
        let generator = generator(1);
        let notifications = Cell::new(0);

        let error = generator
            .generate(&draft(), |_| notifications.set(notifications.get() + 1))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Composition);
        assert_eq!(generator.state(), GenerationState::Failed(error));
        assert_eq!(notifications.get(), 0);
    }

    #[tokio::test]
    async fn reset_allows_a_new_generation() {
        let generator = generator(2);
        generator.generate(&draft(), |_| ()).await.unwrap();

        assert!(generator.reset());
        assert_eq!(generator.state(), GenerationState::NotStarted);
        assert!(generator.generate(&draft(), |_| ()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dropped_generation_can_be_started_again() {
        let generator = InvoicePdfGenerator::new(PdfAssembler::new(StalledTemplateSource, Configuration::default()));
        let notifications = Cell::new(0);

        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            generator.generate(&draft(), |_| notifications.set(notifications.get() + 1)),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(generator.state(), GenerationState::NotStarted);
        assert!(generator.reset());
        assert_eq!(notifications.get(), 0);

        // Interrupted again, the generation is still startable rather than skipped
        let outcome = tokio::time::timeout(Duration::from_millis(10), generator.generate(&draft(), |_| ())).await;
        assert!(outcome.is_err());
        assert_eq!(generator.state(), GenerationState::NotStarted);
    }
}
