//! Decoded instruction record (spec §3 "Instruction", §6 operand grammar).

use super::parse_reg;

/// The five pipeline stages, used to index `stage_complete_cycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Instruction Fetch.
    If = 0,
    /// Instruction Decode.
    Id = 1,
    /// Execute.
    Ex = 2,
    /// Memory Access.
    Mem = 3,
    /// Write Back.
    Wb = 4,
}

/// All supported opcodes. `Div` is reserved: it has a latency-table entry
/// (spec §6) but no opcode token decodes to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Addi,
    Arr,
    Ld,
    Sw,
    Ldc2,
    Ldc3,
    Ldc4,
    Bne,
    J,
    Jal,
    Beq,
    Ble,
    LwSpm,
    SwSpm,
    Sync,
}

impl Opcode {
    /// Whether this opcode writes a destination register.
    pub fn writes_dest(self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Addi
                | Opcode::Ld
                | Opcode::Ldc2
                | Opcode::Ldc3
                | Opcode::Ldc4
                | Opcode::Jal
                | Opcode::LwSpm
        )
    }

    /// Whether this opcode is a control-flow instruction resolved in ID.
    pub fn is_control_flow(self) -> bool {
        matches!(
            self,
            Opcode::Bne | Opcode::Beq | Opcode::Ble | Opcode::J | Opcode::Jal
        )
    }
}

/// An instruction, immutable after decode, carrying its own pipeline
/// timestamps and forwarding-relevant result.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Raw text this instruction was decoded from (kept for diagnostics/tracing).
    pub text: String,
    pub opcode: Opcode,
    pub dest: Option<usize>,
    pub src1: Option<usize>,
    pub src2: Option<usize>,
    pub imm: i64,
    /// Memory address operand (`LD`/`SW`/`LDC2..4`), in words.
    pub mem_addr: Option<i64>,
    /// Branch/jump target label.
    pub label: Option<String>,
    /// SPM immediate offset (`LW_SPM`/`SW_SPM`).
    pub offset: i64,
    /// Effective SPM address computed in EX (`reg[rs1] + offset`).
    pub effective_addr: Option<i64>,
    /// `src1` resolved in ID: register-file or forwarded value.
    pub resolved_src1: i64,
    /// `src2` resolved in ID: register-file or forwarded value.
    pub resolved_src2: i64,
    /// `pc` at the time this instruction was fetched (for `JAL`'s link value).
    pub fetch_pc: i64,
    /// Cycle this instruction entered IF.
    pub issue_cycle: u64,
    /// Cycle each stage completed, indexed by `Stage as usize`.
    pub stage_complete_cycle: [Option<u64>; 5],
    /// Set once this instruction retires (completes its last stage).
    pub completed: bool,
    /// Computed result, used for write-back and forwarding.
    pub result: i64,
}

impl Instruction {
    /// Marks `stage` complete at `cycle`.
    pub fn mark_stage(&mut self, stage: Stage, cycle: u64) {
        self.stage_complete_cycle[stage as usize] = Some(cycle);
    }
}

/// Decodes one non-label program line into an `Instruction`.
///
/// Returns `Err(reason)` on an unrecognized opcode or malformed operand
/// tuple; the caller records this as a `Diagnostic::DecodeError` and
/// skips the instruction (spec §7) rather than propagating a fatal error.
pub fn decode(text: &str) -> Result<Instruction, String> {
    let mut toks = text.split_whitespace();
    let op_tok = toks.next().ok_or_else(|| "empty instruction line".to_string())?;

    let mut instr = Instruction {
        text: text.to_string(),
        opcode: Opcode::Add, // placeholder, overwritten below
        dest: None,
        src1: None,
        src2: None,
        imm: 0,
        mem_addr: None,
        label: None,
        offset: 0,
        effective_addr: None,
        resolved_src1: 0,
        resolved_src2: 0,
        fetch_pc: 0,
        issue_cycle: 0,
        stage_complete_cycle: [None; 5],
        completed: false,
        result: 0,
    };

    macro_rules! next_reg {
        () => {
            parse_reg(toks.next().ok_or_else(|| format!("missing operand in '{text}'"))?)
                .ok_or_else(|| format!("bad register operand in '{text}'"))?
        };
    }
    macro_rules! next_imm {
        () => {
            toks.next()
                .ok_or_else(|| format!("missing immediate in '{text}'"))?
                .parse::<i64>()
                .map_err(|_| format!("bad immediate in '{text}'"))?
        };
    }
    macro_rules! next_label {
        () => {
            toks.next().ok_or_else(|| format!("missing label in '{text}'"))?.to_string()
        };
    }

    match op_tok {
        "ADD" | "SUB" | "MUL" => {
            instr.opcode = match op_tok {
                "ADD" => Opcode::Add,
                "SUB" => Opcode::Sub,
                _ => Opcode::Mul,
            };
            instr.dest = Some(next_reg!());
            instr.src1 = Some(next_reg!());
            instr.src2 = Some(next_reg!());
        }
        "ADDI" => {
            instr.opcode = Opcode::Addi;
            instr.dest = Some(next_reg!());
            instr.src1 = Some(next_reg!());
            instr.imm = next_imm!();
        }
        "ARR" => {
            instr.opcode = Opcode::Arr;
            instr.imm = next_imm!();
        }
        "LD" | "LDC2" | "LDC3" | "LDC4" => {
            instr.opcode = match op_tok {
                "LD" => Opcode::Ld,
                "LDC2" => Opcode::Ldc2,
                "LDC3" => Opcode::Ldc3,
                _ => Opcode::Ldc4,
            };
            instr.dest = Some(next_reg!());
            instr.mem_addr = Some(next_imm!());
        }
        "SW" => {
            instr.opcode = Opcode::Sw;
            instr.src1 = Some(next_reg!());
            instr.mem_addr = Some(next_imm!());
        }
        "BNE" | "BEQ" | "BLE" => {
            instr.opcode = match op_tok {
                "BNE" => Opcode::Bne,
                "BEQ" => Opcode::Beq,
                _ => Opcode::Ble,
            };
            instr.src1 = Some(next_reg!());
            instr.src2 = Some(next_reg!());
            instr.label = Some(next_label!());
        }
        "J" => {
            instr.opcode = Opcode::J;
            instr.label = Some(next_label!());
        }
        "JAL" => {
            instr.opcode = Opcode::Jal;
            instr.dest = Some(next_reg!());
            instr.label = Some(next_label!());
        }
        "LW_SPM" => {
            instr.opcode = Opcode::LwSpm;
            instr.dest = Some(next_reg!());
            instr.imm = next_imm!();
            instr.offset = instr.imm;
            instr.src1 = Some(next_reg!());
        }
        "SW_SPM" => {
            instr.opcode = Opcode::SwSpm;
            instr.src2 = Some(next_reg!());
            instr.imm = next_imm!();
            instr.offset = instr.imm;
            instr.src1 = Some(next_reg!());
        }
        "SYNC" => {
            instr.opcode = Opcode::Sync;
        }
        other => return Err(format!("unknown opcode '{other}'")),
    }

    Ok(instr)
}
