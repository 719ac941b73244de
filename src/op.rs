use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// 35 CHIP 8 op codes. Register indices `x` and `y` are guaranteed to be between 0x0 and 0xF,
/// `n` fits in a nibble and `addr` fits in 12 bits
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum Op {
    // 0XXX
    // 0NNN 	Call 		Calls RCA 1802 program at address NNN. Not necessary for most ROMs.
    CallRca { addr: u16 },
    // 00E0 	Display 	disp_clear() 	Clears the screen.
    DispClear,
    // 00EE 	Flow 	return; 	Returns from a subroutine.
    Return,

    // 1NNN 	Flow 	goto NNN;
    Goto { addr: u16 },

    // 2NNN 	Flow 	*(0xNNN)()
    CallSub { addr: u16 },

    // 3XNN 	Cond 	if(Vx==NN)
    CondVxEq { x: u8, nn: u8 },

    // 4XNN 	Cond 	if(Vx!=NN)
    CondVxNe { x: u8, nn: u8 },

    // 5XY0 	Cond 	if(Vx==Vy)
    CondVxVyEq { x: u8, y: u8 },

    // 6XNN 	Const 	Vx = NN
    ConstSetVx { x: u8, nn: u8 },

    // 7XNN 	Const 	Vx += NN
    ConstAddVx { x: u8, nn: u8 },

    // 8XY_
    Assign { x: u8, y: u8 },
    BitOr { x: u8, y: u8 },
    BitAnd { x: u8, y: u8 },
    BitXor { x: u8, y: u8 },
    Add { x: u8, y: u8 },
    Sub { x: u8, y: u8 },
    ShiftRight { x: u8 },
    SubN { x: u8, y: u8 },
    ShiftLeft { x: u8 },

    // 9XY0 	Cond 	if(Vx!=Vy)
    CondVxVyNe { x: u8, y: u8 },

    // ANNN 	MEM 	I = NNN
    SetI { addr: u16 },

    // BNNN 	Flow 	PC=V0+NNN
    GotoPlusV0 { addr: u16 },

    // CXNN 	Rand 	Vx=rand()&NN
    Rand { x: u8, nn: u8 },

    // DXYN 	Disp 	draw(Vx,Vy,N)
    Draw { x: u8, y: u8, n: u8 },

    // EX__
    SkipKeyDown { x: u8 },
    SkipKeyUp { x: u8 },

    // FX__
    DelayGet { x: u8 },
    WaitKey { x: u8 },
    DelaySet { x: u8 },
    SoundSet { x: u8 },
    AddI { x: u8 },
    FontChar { x: u8 },
    Bcd { x: u8 },
    RegDump { x: u8 },
    RegLoad { x: u8 },
}

impl Op {
    /// Returns true for the ops that change the framebuffer, so a host only needs
    /// to redraw after one of them
    pub fn is_display_op(&self) -> bool {
        matches!(self, Op::DispClear | Op::Draw { .. })
    }
}

impl TryFrom<u16> for Op {
    type Error = Error;

    fn try_from(opcode: u16) -> Result<Self, Self::Error> {
        let mask = 0xF;

        // the 4 nibbles of the opcode, where the first is the most significant
        let family = ((opcode >> 12) & mask) as u8;
        let x = ((opcode >> 8) & mask) as u8;
        let y = ((opcode >> 4) & mask) as u8;
        let n = (opcode & mask) as u8;

        let nn = (opcode & 0xFF) as u8;
        let addr = opcode & 0x0FFF;

        let op = match (family, x, y, n) {
            (0x0, 0x0, 0xE, 0x0) => Op::DispClear,
            (0x0, 0x0, 0xE, 0xE) => Op::Return,
            (0x0, _, _, _) => Op::CallRca { addr },
            (0x1, _, _, _) => Op::Goto { addr },
            (0x2, _, _, _) => Op::CallSub { addr },
            (0x3, _, _, _) => Op::CondVxEq { x, nn },
            (0x4, _, _, _) => Op::CondVxNe { x, nn },
            (0x5, _, _, 0x0) => Op::CondVxVyEq { x, y },
            (0x6, _, _, _) => Op::ConstSetVx { x, nn },
            (0x7, _, _, _) => Op::ConstAddVx { x, nn },
            (0x8, _, _, 0x0) => Op::Assign { x, y },
            (0x8, _, _, 0x1) => Op::BitOr { x, y },
            (0x8, _, _, 0x2) => Op::BitAnd { x, y },
            (0x8, _, _, 0x3) => Op::BitXor { x, y },
            (0x8, _, _, 0x4) => Op::Add { x, y },
            (0x8, _, _, 0x5) => Op::Sub { x, y },
            (0x8, _, _, 0x6) => Op::ShiftRight { x },
            (0x8, _, _, 0x7) => Op::SubN { x, y },
            (0x8, _, _, 0xE) => Op::ShiftLeft { x },
            (0x9, _, _, 0x0) => Op::CondVxVyNe { x, y },
            (0xA, _, _, _) => Op::SetI { addr },
            (0xB, _, _, _) => Op::GotoPlusV0 { addr },
            (0xC, _, _, _) => Op::Rand { x, nn },
            (0xD, _, _, _) => Op::Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => Op::SkipKeyDown { x },
            (0xE, _, 0xA, 0x1) => Op::SkipKeyUp { x },
            (0xF, _, 0x0, 0x7) => Op::DelayGet { x },
            (0xF, _, 0x0, 0xA) => Op::WaitKey { x },
            (0xF, _, 0x1, 0x5) => Op::DelaySet { x },
            (0xF, _, 0x1, 0x8) => Op::SoundSet { x },
            (0xF, _, 0x1, 0xE) => Op::AddI { x },
            (0xF, _, 0x2, 0x9) => Op::FontChar { x },
            (0xF, _, 0x3, 0x3) => Op::Bcd { x },
            (0xF, _, 0x5, 0x5) => Op::RegDump { x },
            (0xF, _, 0x6, 0x5) => Op::RegLoad { x },
            _ => return Err(Error::UnrecognizedOpcode { opcode }),
        };

        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(opcode: u16) -> Op {
        Op::try_from(opcode).unwrap()
    }

    #[test]
    fn convert_opcodes() {
        assert_eq!(decode(0x0FFF), Op::CallRca { addr: 0xFFF });
        assert_eq!(decode(0x00E0), Op::DispClear);
        assert_eq!(decode(0x00EE), Op::Return);
        assert_eq!(decode(0x1000), Op::Goto { addr: 0x000 });
        assert_eq!(decode(0x2AAA), Op::CallSub { addr: 0xAAA });
        assert_eq!(decode(0x3FAA), Op::CondVxEq { x: 0xF, nn: 0xAA });
        assert_eq!(decode(0x4FAA), Op::CondVxNe { x: 0xF, nn: 0xAA });
        assert_eq!(decode(0x5FA0), Op::CondVxVyEq { x: 0xF, y: 0xA });
        assert_eq!(decode(0x6FAB), Op::ConstSetVx { x: 0xF, nn: 0xAB });
        assert_eq!(decode(0x7FAB), Op::ConstAddVx { x: 0xF, nn: 0xAB });
        assert_eq!(decode(0x8FA0), Op::Assign { x: 0xF, y: 0xA });
        assert_eq!(decode(0x8FA1), Op::BitOr { x: 0xF, y: 0xA });
        assert_eq!(decode(0x8FA2), Op::BitAnd { x: 0xF, y: 0xA });
        assert_eq!(decode(0x8FA3), Op::BitXor { x: 0xF, y: 0xA });
        assert_eq!(decode(0x8FA4), Op::Add { x: 0xF, y: 0xA });
        assert_eq!(decode(0x8FA5), Op::Sub { x: 0xF, y: 0xA });
        assert_eq!(decode(0x8FA6), Op::ShiftRight { x: 0xF });
        assert_eq!(decode(0x8FA7), Op::SubN { x: 0xF, y: 0xA });
        assert_eq!(decode(0x8FAE), Op::ShiftLeft { x: 0xF });
        assert_eq!(decode(0x9FA0), Op::CondVxVyNe { x: 0xF, y: 0xA });
        assert_eq!(decode(0xAFAB), Op::SetI { addr: 0xFAB });
        assert_eq!(decode(0xBFAB), Op::GotoPlusV0 { addr: 0xFAB });
        assert_eq!(decode(0xCFAB), Op::Rand { x: 0xF, nn: 0xAB });
        assert_eq!(decode(0xDFAB), Op::Draw { x: 0xF, y: 0xA, n: 0xB });
        assert_eq!(decode(0xEF9E), Op::SkipKeyDown { x: 0xF });
        assert_eq!(decode(0xEFA1), Op::SkipKeyUp { x: 0xF });
        assert_eq!(decode(0xF907), Op::DelayGet { x: 0x9 });
        assert_eq!(decode(0xF90A), Op::WaitKey { x: 0x9 });
        assert_eq!(decode(0xF915), Op::DelaySet { x: 0x9 });
        assert_eq!(decode(0xF918), Op::SoundSet { x: 0x9 });
        assert_eq!(decode(0xF91E), Op::AddI { x: 0x9 });
        assert_eq!(decode(0xF929), Op::FontChar { x: 0x9 });
        assert_eq!(decode(0xF933), Op::Bcd { x: 0x9 });
        assert_eq!(decode(0xF955), Op::RegDump { x: 0x9 });
        assert_eq!(decode(0xF965), Op::RegLoad { x: 0x9 });
    }

    #[test]
    fn unrecognized_opcodes() {
        for &opcode in &[0x5AB1, 0x8DEF, 0x9DEF, 0xED9F, 0xFDEF, 0xF000] {
            match Op::try_from(opcode) {
                Err(Error::UnrecognizedOpcode { opcode: reported }) => assert_eq!(reported, opcode),
                other => panic!("expected {:#06X} to be unrecognized, got {:?}", opcode, other),
            }
        }
    }

    #[test]
    fn display_ops() {
        assert!(decode(0x00E0).is_display_op());
        assert!(decode(0xD125).is_display_op());
        assert!(!decode(0x00EE).is_display_op());
        assert!(!decode(0x6A01).is_display_op());
    }
}
