use crate::errors::ExecutionError;
use std::fmt::{Debug, Formatter};

/// Wrapper for LC-3 u16 instruction.
/// format is: `OOOO_DDD_P_PPPP_PPPP`
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Instruction(u16);

/// The 16 opcodes selected by the top 4 bits of an instruction.
#[repr(u8)]
#[derive(enumn::N, Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    Br = 0b0000,
    Add = 0b0001,
    Ld = 0b0010,
    St = 0b0011,
    Jsr = 0b0100,
    And = 0b0101,
    Ldr = 0b0110,
    Str = 0b0111,
    Rti = 0b1000,
    Not = 0b1001,
    Ldi = 0b1010,
    Sti = 0b1011,
    Jmp = 0b1100,
    Reserved = 0b1101,
    Lea = 0b1110,
    Trap = 0b1111,
}

/// Second operand of ADD and AND.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    /// Already sign extended `imm5`
    Immediate(u16),
}

/// Target of JSR / JSRR.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JumpTarget {
    /// JSR: sign extended `PCoffset11`
    PcOffset(u16),
    /// JSRR: base register
    BaseRegister(u8),
}

/// A decoded instruction with typed operand fields.
/// All offsets are already sign extended to 16 bits.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operation {
    Add { dr: u8, sr1: u8, operand: Operand },
    And { dr: u8, sr1: u8, operand: Operand },
    Not { dr: u8, sr: u8 },
    Br { nzp: u8, pc_offset: u16 },
    Jmp { base_r: u8 },
    Jsr { target: JumpTarget },
    Ld { dr: u8, pc_offset: u16 },
    Ldi { dr: u8, pc_offset: u16 },
    Ldr { dr: u8, base_r: u8, offset: u16 },
    Lea { dr: u8, pc_offset: u16 },
    St { sr: u8, pc_offset: u16 },
    Sti { sr: u8, pc_offset: u16 },
    Str { sr: u8, base_r: u8, offset: u16 },
    Trap { vector: u8 },
}

impl Instruction {
    /// Gives the value of only the specified bit range.
    ///
    /// # Parameters
    /// - `from`: starting index
    /// - `to`: end index (inclusive), mut be greater or equal to `from`
    ///
    /// # Panics
    /// - asserts that to is greater or equal from and both are valid indexes
    #[must_use]
    pub fn get_bit_range(self, from: u8, to: u8) -> u16 {
        debug_assert!(
            to >= from,
            "wrong direction of from: {from:?} and to: {to:?}"
        );
        debug_assert!(
            (0..u16::BITS).contains(&u32::from(to)),
            "index: {to:?} to u16 is greater than maximum value {:?}",
            u16::BITS - 1
        );
        (self.0 >> from) & (u16::MAX >> (15 - (to - from)))
    }
    /// Gives the value of a bit range of at most 8 bits.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "only used for ranges up to 8 bits"
    )]
    #[must_use]
    fn get_bit_range_u8(self, from: u8, to: u8) -> u8 {
        debug_assert!(to - from < 8, "bit range does not fit into u8");
        self.get_bit_range(from, to) as u8
    }
    #[must_use]
    pub fn get_bit(self, index: u8) -> bool {
        self.get_bit_range(index, index) != 0
    }
    #[must_use]
    pub fn op_code(self) -> u8 {
        self.get_bit_range_u8(12, 15)
    }
    #[must_use]
    pub fn dr_number(self) -> u8 {
        self.get_bit_range_u8(9, 11)
    }
    #[must_use]
    pub fn sr1_number(self) -> u8 {
        self.get_bit_range_u8(6, 8)
    }
    #[must_use]
    pub fn sr2_number(self) -> u8 {
        self.get_bit_range_u8(0, 2)
    }
    #[must_use]
    pub fn is_immediate(self) -> bool {
        self.get_bit(5)
    }
    #[must_use]
    pub fn get_immediate(self) -> u16 {
        sign_extend(self.get_bit_range(0, 4), 5)
    }
    /// Sign extended offset of the lowest `len` bits.
    /// Can be positive or negative in 2's complement.
    #[must_use]
    pub fn pc_offset(self, len: u8) -> u16 {
        sign_extend(self.get_bit_range(0, len - 1), len)
    }
    #[must_use]
    pub fn trap_vector(self) -> u8 {
        self.get_bit_range_u8(0, 7)
    }

    fn operand(self) -> Operand {
        if self.is_immediate() {
            Operand::Immediate(self.get_immediate())
        } else {
            Operand::Register(self.sr2_number())
        }
    }

    /// Decodes all operand fields of this instruction in one step.
    ///
    /// # Errors
    /// - [`ExecutionError::IllegalOpcode`] for RTI and the reserved opcode, `address` is only
    ///   used for reporting
    pub fn decode(self, address: u16) -> Result<Operation, ExecutionError> {
        let illegal = || ExecutionError::IllegalOpcode {
            opcode: self.op_code(),
            address,
        };
        let op_code = OpCode::n(self.op_code()).ok_or_else(illegal)?;
        Ok(match op_code {
            OpCode::Add => Operation::Add {
                dr: self.dr_number(),
                sr1: self.sr1_number(),
                operand: self.operand(),
            },
            OpCode::And => Operation::And {
                dr: self.dr_number(),
                sr1: self.sr1_number(),
                operand: self.operand(),
            },
            OpCode::Not => Operation::Not {
                dr: self.dr_number(),
                sr: self.sr1_number(),
            },
            OpCode::Br => Operation::Br {
                nzp: self.dr_number(),
                pc_offset: self.pc_offset(9),
            },
            OpCode::Jmp => Operation::Jmp {
                base_r: self.sr1_number(),
            },
            OpCode::Jsr => Operation::Jsr {
                target: if self.get_bit(11) {
                    JumpTarget::PcOffset(self.pc_offset(11))
                } else {
                    JumpTarget::BaseRegister(self.sr1_number())
                },
            },
            OpCode::Ld => Operation::Ld {
                dr: self.dr_number(),
                pc_offset: self.pc_offset(9),
            },
            OpCode::Ldi => Operation::Ldi {
                dr: self.dr_number(),
                pc_offset: self.pc_offset(9),
            },
            OpCode::Ldr => Operation::Ldr {
                dr: self.dr_number(),
                base_r: self.sr1_number(),
                offset: self.pc_offset(6),
            },
            OpCode::Lea => Operation::Lea {
                dr: self.dr_number(),
                pc_offset: self.pc_offset(9),
            },
            OpCode::St => Operation::St {
                sr: self.dr_number(),
                pc_offset: self.pc_offset(9),
            },
            OpCode::Sti => Operation::Sti {
                sr: self.dr_number(),
                pc_offset: self.pc_offset(9),
            },
            OpCode::Str => Operation::Str {
                sr: self.dr_number(),
                base_r: self.sr1_number(),
                offset: self.pc_offset(6),
            },
            OpCode::Trap => Operation::Trap {
                vector: self.trap_vector(),
            },
            OpCode::Rti | OpCode::Reserved => return Err(illegal()),
        })
    }
}

/// Implements sign extension as described at [Sign extension](https://en.wikipedia.org/wiki/Sign_extension).
///
/// `bits` must not have bits set above `valid_bits`.
#[must_use]
pub const fn sign_extend(bits: u16, valid_bits: u8) -> u16 {
    let most_significant_bit = (bits >> (valid_bits - 1)) & 1;
    if most_significant_bit == 1 {
        // negative: 1-extend
        bits | (0xFFFF << valid_bits)
    } else {
        // positive, already 0-extended
        bits
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Op: {:04b}, DR: {:03b}, PC_Off: {:09b}",
            self.op_code(),
            self.dr_number(),
            self.get_bit_range(0, 8)
        )
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}
