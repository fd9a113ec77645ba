pub mod address_set;
pub mod classifier;
pub mod cli;
mod disassembly;
pub mod errors;
pub mod host;
pub mod injection;
pub mod logging;
pub mod segments;

pub mod prelude {
    pub use crate::address_set::AddressSet;
    pub use crate::classifier::{SignalDisposition, SignalKind, SignalReport};
    pub use crate::cli::{build_campaign, init_diagnostics, report_fatal, Args};
    pub use crate::errors::{ConfigError, InjectError};
    pub use crate::host::{CodePatcher, ImageCode, Instruction, RoutineCode, SectionCode};
    pub use crate::injection::{
        Campaign, CampaignOptions, Corruptor, InstrumentAction, MutationRecord,
        DEFAULT_MAX_FLIP_ATTEMPTS,
    };
    pub use crate::logging::LogSink;
    pub use crate::segments::{ExecutableRange, SegmentTracker};
}
