//! # concierge-toolkit
//!
//! Built-in tool plugins for the concierge backend. Each tool is an
//! independent [`Capability`] implementation; none of them know about
//! the dispatch loop, and the loop knows none of them by name.
//!
//! New tools are added to [`capability_sources`], the compiled-in
//! registration table the composition root feeds to the registry,
//! without touching orchestration code.

pub mod calc;
pub mod clock;
pub mod convert;
pub mod files;
pub mod lookup;
pub mod textstat;

use std::sync::Arc;

use concierge_core::{Capability, CapabilitySource};

pub use calc::CalculatorTool;
pub use clock::ClockTool;
pub use convert::UnitConvertTool;
pub use files::{FileListTool, FileReadTool};
pub use lookup::WebLookupTool;
pub use textstat::TextStatsTool;

/// The registration table of every built-in tool.
///
/// Source ids determine collision precedence, so they are stable names,
/// not positions. A constructor that fails (missing directory, client
/// build error) is skipped by the registry without affecting the rest.
pub fn capability_sources() -> Vec<CapabilitySource> {
    vec![
        CapabilitySource {
            id: "toolkit::calc",
            build: || Ok(Arc::new(CalculatorTool) as Arc<dyn Capability>),
        },
        CapabilitySource {
            id: "toolkit::clock",
            build: || Ok(Arc::new(ClockTool) as Arc<dyn Capability>),
        },
        CapabilitySource {
            id: "toolkit::convert",
            build: || Ok(Arc::new(UnitConvertTool) as Arc<dyn Capability>),
        },
        CapabilitySource {
            id: "toolkit::file_list",
            build: || Ok(Arc::new(FileListTool::from_env()?) as Arc<dyn Capability>),
        },
        CapabilitySource {
            id: "toolkit::file_read",
            build: || Ok(Arc::new(FileReadTool::from_env()?) as Arc<dyn Capability>),
        },
        CapabilitySource {
            id: "toolkit::lookup",
            build: || Ok(Arc::new(WebLookupTool::new()?) as Arc<dyn Capability>),
        },
        CapabilitySource {
            id: "toolkit::textstat",
            build: || Ok(Arc::new(TextStatsTool) as Arc<dyn Capability>),
        },
    ]
}
