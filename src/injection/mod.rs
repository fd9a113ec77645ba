//! The fault-injection campaign: selection of instructions, mutation
//! dispatch and signal observation, all hanging off one explicitly
//! constructed context.

mod corruptor;
mod cursor;
mod record;

pub use corruptor::{Corruptor, DEFAULT_MAX_FLIP_ATTEMPTS};
pub use record::MutationRecord;

use crate::address_set::AddressSet;
use crate::classifier::{self, SignalDisposition, SignalReport};
use crate::disassembly::Disassembly;
use crate::errors::{ConfigError, InjectError};
use crate::host::{CodePatcher, ImageCode, Instruction, SectionCode};
use crate::logging::LogSink;
use crate::segments::{ExecutableRange, SegmentTracker};
use clap::{builder::PossibleValue, ValueEnum};
use cursor::AddressCursor;
use log::{debug, error, info};
use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Mutation applied to every selected instruction, fixed for the whole run.
pub enum InstrumentAction {
    None,
    Delete,
    InsertBranch,
    /// Reserved. Accepted nowhere and applies no mutation.
    BranchGarble,
}

impl ValueEnum for InstrumentAction {
    fn value_variants<'a>() -> &'a [Self] {
        &[InstrumentAction::Delete, InstrumentAction::InsertBranch]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            InstrumentAction::Delete => Some(PossibleValue::new("delete")),
            InstrumentAction::InsertBranch => Some(PossibleValue::new("insert-branch")),
            _ => None,
        }
    }
}

impl fmt::Display for InstrumentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentAction::None => "none",
            InstrumentAction::Delete => "delete",
            InstrumentAction::InsertBranch => "insert-branch",
            InstrumentAction::BranchGarble => "branch-garble",
        };
        write!(f, "{name}")
    }
}

/// Everything a campaign needs before it may touch code.
pub struct CampaignOptions {
    pub instrument: AddressSet,
    pub ignore: AddressSet,
    /// PRNG seed. Zero means "no seed given" and seeds from entropy.
    pub seed: u64,
    pub action: InstrumentAction,
    /// Constrain inserted branch targets to known executable ranges.
    pub avoid_segfaults: bool,
    pub max_flip_attempts: usize,
    pub sink: LogSink,
}

impl Default for CampaignOptions {
    fn default() -> Self {
        Self {
            instrument: AddressSet::new(),
            ignore: AddressSet::new(),
            seed: 0,
            action: InstrumentAction::Delete,
            avoid_segfaults: true,
            max_flip_attempts: DEFAULT_MAX_FLIP_ATTEMPTS,
            sink: LogSink::stderr(),
        }
    }
}

/// A configured fault-injection campaign.
///
/// A value of this type only exists after [`Campaign::configure`] has
/// validated the address sets, so holding one is the proof that the
/// instrument and ignore sets are disjoint. The host adapter drives it with
/// [`Campaign::visit_image`] / [`Campaign::visit_section`] while the target
/// loads, and with [`Campaign::observe_signal`] when the target faults.
pub struct Campaign {
    action: InstrumentAction,
    avoid_segfaults: bool,
    instrument: AddressSet,
    ignore: AddressSet,
    segments: SegmentTracker,
    corruptor: Corruptor,
    disassembly: Disassembly,
    sink: LogSink,
    seed: u64,
}

impl Campaign {
    /// Validates the options and builds the campaign context.
    ///
    /// An address present in both sets would make a mutation and a "leave
    /// untouched" request apply to the same instruction, so any overlap is
    /// fatal here, before the first section is ever visited. The effective
    /// seed is written to the record sink for replay.
    pub fn configure(options: CampaignOptions) -> Result<Self, ConfigError> {
        let overlap = options.instrument.intersection(&options.ignore);
        if !overlap.is_empty() {
            return Err(ConfigError::OverlappingSets { addresses: overlap });
        }

        let seed = match options.seed {
            0 => rand::rng().random::<u64>(),
            seed => seed,
        };
        info!("Random seed: {seed}");
        options.sink.append(&format!("Random seed: {seed}"));

        Ok(Self {
            action: options.action,
            avoid_segfaults: options.avoid_segfaults,
            instrument: options.instrument,
            ignore: options.ignore,
            segments: SegmentTracker::new(),
            corruptor: Corruptor::new(seed, options.max_flip_attempts),
            disassembly: Disassembly::new(),
            sink: options.sink,
            seed,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn instrument_set(&self) -> &AddressSet {
        &self.instrument
    }

    pub fn ignore_set(&self) -> &AddressSet {
        &self.ignore
    }

    pub fn segments(&self) -> &SegmentTracker {
        &self.segments
    }

    /// Visits every executable section of a freshly loaded image.
    pub fn visit_image(
        &mut self,
        image: &ImageCode,
        patcher: &mut dyn CodePatcher,
    ) -> Result<Vec<MutationRecord>, InjectError> {
        info!("Loading image [{}] ...", image.name);

        let mut records = Vec::new();
        for section in &image.sections {
            records.extend(self.visit_section(section, patcher)?);
        }
        Ok(records)
    }

    /// Records the section's executable range, then mutates every selected
    /// instruction inside it.
    ///
    /// The range is recorded before any corruption so that inserted branch
    /// targets may land inside the section currently being loaded. Sections
    /// and routines without any instrument-set member in their span are
    /// skipped without walking their code. Applied mutations are appended to
    /// the record sink in encounter order and also returned.
    pub fn visit_section(
        &mut self,
        section: &SectionCode,
        patcher: &mut dyn CodePatcher,
    ) -> Result<Vec<MutationRecord>, InjectError> {
        self.segments
            .record(ExecutableRange::new(section.start, section.end()));

        let members = self.instrument.range_members(section.start, section.end());
        if members.is_empty() {
            return Ok(Vec::new());
        }
        debug!("[{}]", section.name);

        let mut applied = Vec::new();
        for routine in &section.routines {
            let members = self.instrument.range_members(routine.start, routine.end());
            if members.is_empty() {
                continue;
            }
            debug!("[{}]", routine.name);

            let mut cursor = AddressCursor::new(&members);
            for instruction in &routine.instructions {
                if cursor.exhausted() {
                    break;
                }
                if cursor.matches(instruction.address) {
                    if let Some(mutation) = self.apply(instruction, patcher)? {
                        self.sink.append(&mutation);
                        applied.push(mutation);
                    }
                }
            }
        }
        Ok(applied)
    }

    fn apply(
        &mut self,
        instruction: &Instruction,
        patcher: &mut dyn CodePatcher,
    ) -> Result<Option<MutationRecord>, InjectError> {
        let address = instruction.address;

        match self.action {
            InstrumentAction::Delete => {
                debug!(
                    "{:#x}: deleting \"{}\"",
                    address,
                    self.disassembly.instruction_text(instruction)
                );
                patcher.delete(instruction);
                Ok(Some(MutationRecord::Delete { address }))
            }
            InstrumentAction::InsertBranch => {
                let target =
                    self.corruptor
                        .corrupt(address, self.avoid_segfaults, &self.segments)?;
                debug!("{address:#x}: inserting direct jump to {target:#x}");
                patcher.insert_jump(instruction, target);
                Ok(Some(MutationRecord::InsertBranch { address, target }))
            }
            InstrumentAction::None | InstrumentAction::BranchGarble => Ok(None),
        }
    }

    /// Classifies an intercepted signal and appends the report to the sink.
    ///
    /// Runs on whatever target thread faulted; it only reads the frozen
    /// segment list and appends through the serialized sink. The returned
    /// disposition is always [`SignalDisposition::Propagate`], the underlying
    /// fault is never swallowed.
    pub fn observe_signal(
        &self,
        raw_signal: i32,
        program_counter: u64,
    ) -> (SignalReport, SignalDisposition) {
        let report = classifier::classify(raw_signal, program_counter, &self.segments);

        match report.kind {
            classifier::SignalKind::IllegalInstruction => {
                error!("CFCSS detected a control-flow violation! (SIGILL)");
            }
            classifier::SignalKind::SegmentationFault => {}
            classifier::SignalKind::Other(signal) => error!("Signal: {signal}"),
        }

        self.sink.append(&report);

        debug!("PC: {program_counter:#x}");
        if !report.in_executable {
            debug!("(not within an executable section)");
        }

        (report, SignalDisposition::Propagate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingPatcher {
        deletes: usize,
        jumps: usize,
    }

    impl CodePatcher for CountingPatcher {
        fn delete(&mut self, _instruction: &Instruction) {
            self.deletes += 1;
        }

        fn insert_jump(&mut self, _instruction: &Instruction, _target: u64) {
            self.jumps += 1;
        }
    }

    fn section_with_one_routine() -> SectionCode {
        SectionCode {
            name: ".text".to_string(),
            start: 0x401000,
            size: 0x10,
            routines: vec![crate::host::RoutineCode {
                name: "main".to_string(),
                start: 0x401000,
                size: 0x10,
                instructions: vec![
                    Instruction {
                        address: 0x401000,
                        bytes: vec![0x90],
                    },
                    Instruction {
                        address: 0x401001,
                        bytes: vec![0xc3],
                    },
                ],
            }],
        }
    }

    #[test]
    fn action_none_applies_no_mutation() {
        let mut campaign = Campaign::configure(CampaignOptions {
            instrument: [0x401000u64].into_iter().collect(),
            action: InstrumentAction::None,
            sink: LogSink::from_writer(Box::new(std::io::sink())),
            ..Default::default()
        })
        .unwrap();

        let mut patcher = CountingPatcher {
            deletes: 0,
            jumps: 0,
        };
        let records = campaign
            .visit_section(&section_with_one_routine(), &mut patcher)
            .unwrap();

        assert!(records.is_empty());
        assert_eq!(patcher.deletes, 0);
        assert_eq!(patcher.jumps, 0);
        // The section range is still tracked for signal classification.
        assert!(campaign.segments().contains(0x401008));
    }

    #[test]
    fn overlapping_sets_never_configure() {
        let options = CampaignOptions {
            instrument: [0x401000u64, 0x401004].into_iter().collect(),
            ignore: [0x401004u64, 0x402000].into_iter().collect(),
            sink: LogSink::from_writer(Box::new(std::io::sink())),
            ..Default::default()
        };

        match Campaign::configure(options) {
            Err(ConfigError::OverlappingSets { addresses }) => {
                assert_eq!(addresses, vec![0x401004]);
            }
            other => panic!("expected overlap rejection, got {:?}", other.map(|_| ())),
        }
    }
}
