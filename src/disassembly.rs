use crate::host::Instruction;
use capstone::prelude::*;

pub struct Disassembly {
    cs: Capstone,
}

impl Disassembly {
    pub fn new() -> Self {
        let cs = Capstone::new()
            .x86()
            .mode(arch::x86::ArchMode::Mode64)
            .build()
            .expect("Failed to create Capstone object");

        Self { cs }
    }

    /// Render the instruction as assembler text for diagnostics.
    pub fn instruction_text(&self, instruction: &Instruction) -> String {
        let insns = match self.cs.disasm_count(&instruction.bytes, instruction.address, 1) {
            Ok(insns) => insns,
            Err(_) => return "<unrecognized>".to_string(),
        };

        match insns.iter().next() {
            Some(asm_cmd) => format!(
                "{} {}",
                asm_cmd.mnemonic().unwrap_or(""),
                asm_cmd.op_str().unwrap_or("")
            )
            .trim_end()
            .to_string(),
            None => "<unrecognized>".to_string(),
        }
    }
}
