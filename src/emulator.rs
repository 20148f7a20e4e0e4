use std::io::Read;

use log::{debug, trace, warn};
use thiserror::Error;

use crate::display::Framebuffer;
use crate::quirks::Quirks;
use crate::random::{self, ByteSource};

// memory size
const MEM_SIZE: usize = 4096;

// every address (PC, I, stack entries) is 12 bits wide
const ADDR_MASK: u16 = 0xFFF;

// start of the sprite data
const SPRITE_DATA_START: u16 = 0;

// bytes per built-in sprite
const SPRITE_SIZE: u16 = 5;

// built-in sprites
const SPRITE_DATA: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

// subroutine stack depth
const STACK_SIZE: usize = 16;

// start of the area for user programs
const ADDR_START: u16 = 0x200;

// rom size
pub const MAX_ROM_SIZE: usize = MEM_SIZE - ADDR_START as usize;

#[derive(Error, Debug)]
pub enum Error {
    #[error("ROM too large: {0} bytes (maximum is {})", MAX_ROM_SIZE)]
    RomTooLarge(usize),
    #[error("Invalid instruction at address {1:#05X}: {0:04X}")]
    InvalidInstruction(u16, u16),
    #[error("Stack overflow on instruction at address {0:#05X}")]
    StackOverflow(u16),
    #[error("Stack underflow on instruction at address {0:#05X}")]
    StackUnderflow(u16),
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

#[inline(always)]
fn nibble_h(b: u8) -> u8 {
    (b >> 4) & 0xF
}

#[inline(always)]
fn nibble_l(b: u8) -> u8 {
    b & 0xF
}

#[inline(always)]
fn nnn(a: u8, b: u8) -> u16 {
    (((a as u16) << 8) | (b as u16)) & ADDR_MASK
}

#[inline(always)]
fn opcode(a: u8, b: u8) -> u16 {
    ((a as u16) << 8) | (b as u16)
}

/// A CHIP-8 machine: memory, registers, stack, timers, display and keypad.
///
/// The only way into a runnable state is [`Emulator::reset`] (directly or
/// through one of the constructors). Quirks and the random source are
/// configuration and survive a reset.
#[allow(non_snake_case)]
pub struct Emulator {
    // program counter
    pub PC: u16,

    // full memory
    pub memory: [u8; MEM_SIZE],

    // data registers: V0 - VF
    pub V: [u8; 16],

    // address register
    pub I: u16,

    // subroutine stack and its pointer
    stack: [u16; STACK_SIZE],
    SP: usize,

    // delay timer
    pub DT: u8,

    // sound timer
    pub ST: u8,

    display: Framebuffer,

    // which keys are pressed
    keys: [bool; 16],

    // register waiting for a key press (FX0A)
    key_wait: Option<usize>,

    quirks: Quirks,

    // random number generator
    rng: Box<dyn ByteSource>,
}

impl Emulator {
    /// A machine with an empty program area.
    pub fn new() -> Self {
        let mut emu = Emulator {
            PC: ADDR_START,
            memory: [0u8; MEM_SIZE],
            V: [0u8; 16],
            I: 0,
            stack: [0u16; STACK_SIZE],
            SP: 0,
            DT: 0,
            ST: 0,
            display: Framebuffer::new(),
            keys: [false; 16],
            key_wait: None,
            quirks: Quirks::default(),
            rng: random::default_source(),
        };
        emu.reinitialize(&[]);
        emu
    }

    /// A machine with `rom` loaded at 0x200.
    pub fn with_rom(rom: &[u8]) -> Result<Self, Error> {
        let mut emu = Emulator::new();
        emu.reset(rom)?;
        Ok(emu)
    }

    /// Load a chip-8 rom from any reader, up to the maximum allowed rom size.
    pub fn load_rom<T>(mut rom: T) -> Result<Self, Error>
    where
        T: Read,
    {
        let mut buffer = Vec::with_capacity(MAX_ROM_SIZE);
        rom.read_to_end(&mut buffer)?;
        Emulator::with_rom(&buffer)
    }

    pub fn with_quirks(mut self, quirks: Quirks) -> Self {
        self.quirks = quirks;
        self
    }

    /// Use a deterministic random source.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = random::seeded_source(seed);
        self
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    pub fn set_rng<S>(&mut self, source: S)
    where
        S: ByteSource + 'static,
    {
        self.rng = Box::new(source);
    }

    /// Bring the machine back to its power-on state and load `rom` at 0x200.
    ///
    /// The size is checked first: an oversized rom leaves the current state
    /// untouched.
    pub fn reset(&mut self, rom: &[u8]) -> Result<(), Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Error::RomTooLarge(rom.len()));
        }

        self.reinitialize(rom);
        debug!("machine reset, loaded {} byte rom", rom.len());
        Ok(())
    }

    fn reinitialize(&mut self, rom: &[u8]) {
        self.PC = ADDR_START;
        self.memory = [0u8; MEM_SIZE];
        self.V = [0u8; 16];
        self.I = 0;
        self.stack = [0u16; STACK_SIZE];
        self.SP = 0;
        self.DT = 0;
        self.ST = 0;
        self.display.clear();
        self.keys = [false; 16];
        self.key_wait = None;

        // load the sprite data
        let start = SPRITE_DATA_START as usize;
        self.memory[start..start + SPRITE_DATA.len()].copy_from_slice(&SPRITE_DATA[..]);

        // load the rom itself
        let start = ADDR_START as usize;
        self.memory[start..start + rom.len()].copy_from_slice(rom);
    }

    /// Update the state of keypad key `key` (0x0 - 0xF). Other indices are
    /// ignored.
    pub fn set_key(&mut self, key: u8, state: bool) {
        if key as usize >= self.keys.len() {
            warn!("ignoring state of unknown key {:#04X}", key);
            return;
        }
        self.keys[key as usize] = state;

        if state {
            if let Some(x) = self.key_wait.take() {
                debug!("key {:X} released the wait on V{:X}", key, x);
                self.V[x] = key;
            }
        }
    }

    fn get_pressed_key(&self) -> Option<u8> {
        for (index, state) in self.keys.iter().enumerate() {
            if *state {
                return Some(index as u8);
            }
        }
        None
    }

    /// Whether the machine is suspended on FX0A. While this is true,
    /// [`Emulator::execute`] does nothing.
    pub fn is_waiting_for_key(&self) -> bool {
        self.key_wait.is_some()
    }

    /// One 60Hz tick of the delay and sound timers.
    pub fn decrease_timers(&mut self) {
        self.DT = self.DT.saturating_sub(1);
        self.ST = self.ST.saturating_sub(1);
    }

    /// Whether the host should be playing a tone.
    pub fn sound_active(&self) -> bool {
        self.ST > 0
    }

    pub fn display(&self) -> &Framebuffer {
        &self.display
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.display.get_pixel(x, y)
    }

    /// Number of return addresses currently on the stack.
    pub fn stack_depth(&self) -> usize {
        self.SP
    }

    /// Move past the current instruction without running it. Lets the host
    /// keep going after an [`Error::InvalidInstruction`].
    pub fn skip_instruction(&mut self) {
        self.PC = ((self.PC & ADDR_MASK) + 2) & ADDR_MASK;
    }

    #[inline(always)]
    fn addr(&self, base: u16, offset: usize) -> usize {
        (base as usize + offset) % MEM_SIZE
    }

    /// Execute a single chip-8 CPU instruction.
    ///
    /// On error the program counter still points to the failed instruction.
    pub fn execute(&mut self) -> Result<(), Error> {
        if self.key_wait.is_some() {
            return Ok(());
        }

        // read a command
        // the registers are public, so only trust their low 12 bits
        let pc = self.PC & ADDR_MASK;
        let a = self.memory[self.addr(pc, 0)];
        let b = self.memory[self.addr(pc, 1)];
        trace!("{:#05X}: {:02X}{:02X}", pc, a, b);

        let x = nibble_l(a) as usize;
        let y = nibble_h(b) as usize;
        let mut next = pc + 2;

        // choose the instruction to run
        match nibble_h(a) {
            // 00E0 - clear screen
            0x0 if a == 0x00 && b == 0xE0 => {
                self.display.clear();
            }
            // 00EE - return from subroutine
            0x0 if a == 0x00 && b == 0xEE => {
                if self.SP == 0 {
                    debug!("return with empty stack at {:#05X}", pc);
                    return Err(Error::StackUnderflow(pc));
                }
                self.SP -= 1;
                next = self.stack[self.SP] + 2;
            }
            // 1NNN - jump to address NNN
            0x1 => {
                next = nnn(a, b);
            }
            // 2NNN - call subroutine at NNN
            0x2 => {
                if self.SP == STACK_SIZE {
                    debug!("call with full stack at {:#05X}", pc);
                    return Err(Error::StackOverflow(pc));
                }
                self.stack[self.SP] = pc;
                self.SP += 1;
                next = nnn(a, b);
            }
            // 3XNN - skip next if VX == NN
            0x3 => {
                if self.V[x] == b {
                    next += 2;
                }
            }
            // 4XNN - skip next if VX != NN
            0x4 => {
                if self.V[x] != b {
                    next += 2;
                }
            }
            // 5XY0 - skip next if VX == VY
            0x5 if nibble_l(b) == 0x0 => {
                if self.V[x] == self.V[y] {
                    next += 2;
                }
            }
            // 6XNN - Set VX to NN
            0x6 => {
                self.V[x] = b;
            }
            // 7XNN - Set VX to VX + NN (ignore VF)
            0x7 => {
                self.V[x] = self.V[x].wrapping_add(b);
            }
            // 8XY0 - Set VX = VY
            0x8 if nibble_l(b) == 0x0 => {
                self.V[x] = self.V[y];
            }
            // 8XY1 - Set VX = VX | VY
            0x8 if nibble_l(b) == 0x1 => {
                self.V[x] |= self.V[y];
                self.logic_flag();
            }
            // 8XY2 - Set VX = VX & VY
            0x8 if nibble_l(b) == 0x2 => {
                self.V[x] &= self.V[y];
                self.logic_flag();
            }
            // 8XY3 - Set VX = VX ^ VY
            0x8 if nibble_l(b) == 0x3 => {
                self.V[x] ^= self.V[y];
                self.logic_flag();
            }
            // 8XY4 - Set VX = VX + VY, set VF to 1 if carry
            0x8 if nibble_l(b) == 0x4 => {
                let (result, carry) = self.V[x].overflowing_add(self.V[y]);
                self.V[x] = result;
                self.V[0xF] = carry as u8;
            }
            // 8XY5 - Set VX = VX - VY, set VF to 0 if borrow
            0x8 if nibble_l(b) == 0x5 => {
                let (result, borrow) = self.V[x].overflowing_sub(self.V[y]);
                self.V[x] = result;
                self.V[0xF] = (!borrow) as u8;
            }
            // 8XY6 - Set VX = VX >> 1; set VF to shifted bit
            0x8 if nibble_l(b) == 0x6 => {
                let value = self.shift_source(x, y);
                self.V[x] = value >> 1;
                self.V[0xF] = value & 1;
            }
            // 8XY7 - Set VX = VY - VX, set VF to 0 if borrow
            0x8 if nibble_l(b) == 0x7 => {
                let (result, borrow) = self.V[y].overflowing_sub(self.V[x]);
                self.V[x] = result;
                self.V[0xF] = (!borrow) as u8;
            }
            // 8XYE - Set VX = VX << 1; set VF to shifted bit
            0x8 if nibble_l(b) == 0xE => {
                let value = self.shift_source(x, y);
                self.V[x] = value << 1;
                self.V[0xF] = value >> 7;
            }
            // 9XY0 - skip next if VX != VY
            0x9 if nibble_l(b) == 0x0 => {
                if self.V[x] != self.V[y] {
                    next += 2;
                }
            }
            // ANNN - Set I = NNN
            0xA => {
                self.I = nnn(a, b);
            }
            // BNNN - Jump to address NNN + V0
            0xB => {
                next = nnn(a, b) + self.V[0x0] as u16;
            }
            // CXNN - Set VX to a random number with mask NN
            0xC => {
                self.V[x] = self.rng.next_byte() & b;
            }
            // DXYN - Draw sprite at address I, with coords VX, VY, with size N;
            // set VF to 1 if any pixel is cleared
            0xD => {
                self.draw(x, y, nibble_l(b) as usize);
            }
            // EX9E - Skip next if the key on VX value is pressed
            0xE if b == 0x9E => {
                let key = (self.V[x] & 0xF) as usize;
                if self.keys[key] {
                    next += 2;
                }
            }
            // EXA1 - Skip next if the key on VX value is NOT pressed
            0xE if b == 0xA1 => {
                let key = (self.V[x] & 0xF) as usize;
                if !self.keys[key] {
                    next += 2;
                }
            }
            // FX07 - Store the DT value into VX
            0xF if b == 0x07 => {
                self.V[x] = self.DT;
            }
            // FX0A - Wait for a key press and store the digit on VX
            0xF if b == 0x0A => {
                if let Some(key) = self.get_pressed_key() {
                    self.V[x] = key
                } else {
                    debug!("waiting for a key press into V{:X}", x);
                    self.key_wait = Some(x);
                }
            }
            // FX15 - Store the VX value into DT
            0xF if b == 0x15 => {
                self.DT = self.V[x];
            }
            // FX18 - Store the VX value into ST
            0xF if b == 0x18 => {
                self.ST = self.V[x];
            }
            // FX1E - Set I = I + VX
            0xF if b == 0x1E => {
                self.I = ((self.I & ADDR_MASK) + self.V[x] as u16) & ADDR_MASK;
            }
            // FX29 - Set the address of the sprite of digit on VX to I
            0xF if b == 0x29 => {
                let digit = (self.V[x] & 0xF) as u16;
                self.I = SPRITE_DATA_START + digit * SPRITE_SIZE;
            }
            // FX33 - Store BCD of VX into I, I+1 and I+2
            0xF if b == 0x33 => {
                let value = self.V[x];
                self.memory[self.addr(self.I, 0)] = value / 100;
                self.memory[self.addr(self.I, 1)] = value / 10 % 10;
                self.memory[self.addr(self.I, 2)] = value % 10;
            }
            // FX55 - Store from V0 to VX, starting on I
            0xF if b == 0x55 => {
                for i in 0..=x {
                    let dst = self.addr(self.I, i);
                    self.memory[dst] = self.V[i];
                }
                self.advance_index(x);
            }
            // FX65 - Load from I into V0 -> VX
            0xF if b == 0x65 => {
                for i in 0..=x {
                    self.V[i] = self.memory[self.addr(self.I, i)];
                }
                self.advance_index(x);
            }
            _ => {
                warn!("invalid instruction at {:#05X}: {:02X}{:02X}", pc, a, b);
                return Err(Error::InvalidInstruction(opcode(a, b), pc));
            }
        }

        self.PC = next & ADDR_MASK;
        Ok(())
    }

    fn draw(&mut self, x: usize, y: usize, n: usize) {
        let mut rows = [0u8; 15];
        for (offset, row) in rows.iter_mut().take(n).enumerate() {
            *row = self.memory[self.addr(self.I, offset)];
        }

        let collision = self.display.draw_sprite(self.V[x], self.V[y], &rows[..n]);
        self.V[0xF] = collision as u8;
    }

    fn shift_source(&self, x: usize, y: usize) -> u8 {
        if self.quirks.shift_uses_vy {
            self.V[y]
        } else {
            self.V[x]
        }
    }

    fn logic_flag(&mut self) {
        if self.quirks.logic_resets_vf {
            self.V[0xF] = 0;
        }
    }

    // at the end, I will point to the next byte
    fn advance_index(&mut self, x: usize) {
        if self.quirks.load_store_increments_i {
            self.I = ((self.I & ADDR_MASK) + x as u16 + 1) & ADDR_MASK;
        }
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Emulator::new()
    }
}
