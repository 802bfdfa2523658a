//! Shared harness for pipeline tests

use instrumentation_core::semconv::ATTR_RESOURCE_URL;
use instrumentation_core::testing::{FakeEntrySource, FakePage, ManualClock, ManualScheduler};
use instrumentation_core::{
    InMemorySink, Platform, ResourceTimingConfig, ResourceTimingEntry,
    ResourceTimingInstrumentation,
};
use std::rc::Rc;

/// Route tracing output through the test harness so it shows on failure
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

pub fn entry(url: &str) -> ResourceTimingEntry {
    ResourceTimingEntry {
        name: url.to_string(),
        initiator_type: "script".to_string(),
        duration: 100.0,
        next_hop_protocol: "h2".to_string(),
        render_blocking_status: Some("non-blocking".to_string()),
        ..Default::default()
    }
}

pub struct Harness {
    pub source: Rc<FakeEntrySource<ResourceTimingEntry>>,
    pub page: Rc<FakePage>,
    pub scheduler: Rc<ManualScheduler>,
    #[allow(dead_code)]
    pub clock: Rc<ManualClock>,
    pub sink: Rc<InMemorySink>,
    pub instrumentation: ResourceTimingInstrumentation,
}

impl Harness {
    pub fn new(config: ResourceTimingConfig) -> Self {
        Self::with(config, FakeEntrySource::new(), FakePage::loaded())
    }

    pub fn with(
        config: ResourceTimingConfig,
        source: FakeEntrySource<ResourceTimingEntry>,
        page: FakePage,
    ) -> Self {
        init_tracing();

        let source = Rc::new(source);
        let page = Rc::new(page);
        let scheduler = Rc::new(ManualScheduler::new());
        let clock = Rc::new(ManualClock::new());
        let sink = Rc::new(InMemorySink::new());

        let platform: Platform<ResourceTimingEntry> = Platform {
            source: source.clone(),
            page: page.clone(),
            scheduler: scheduler.clone(),
            clock: clock.clone(),
        };
        let instrumentation = ResourceTimingInstrumentation::new(config, platform, sink.clone());

        Self {
            source,
            page,
            scheduler,
            clock,
            sink,
            instrumentation,
        }
    }

    /// Deliver one observer batch containing an entry per URL
    pub fn deliver(&self, urls: &[&str]) -> bool {
        self.source.deliver(urls.iter().map(|url| entry(url)).collect())
    }

    /// URLs of every emitted record, in emission order
    pub fn emitted_urls(&self) -> Vec<String> {
        self.sink
            .records()
            .iter()
            .filter_map(|r| r.attribute(ATTR_RESOURCE_URL).and_then(|v| v.as_str()))
            .map(str::to_string)
            .collect()
    }
}
