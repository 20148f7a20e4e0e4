use nanorand::{BufferedRng, Rng, WyRand};

/// Source of random bytes for the CXNN instruction.
pub trait ByteSource {
    fn next_byte(&mut self) -> u8;
}

impl ByteSource for BufferedRng<WyRand, 8> {
    fn next_byte(&mut self) -> u8 {
        self.generate::<u8>()
    }
}

impl ByteSource for WyRand {
    fn next_byte(&mut self) -> u8 {
        self.generate::<u8>()
    }
}

/// Default generator, seeded from the OS.
pub(crate) fn default_source() -> Box<dyn ByteSource> {
    Box::new(BufferedRng::new(WyRand::new()))
}

/// Deterministic generator for a given seed.
pub(crate) fn seeded_source(seed: u64) -> Box<dyn ByteSource> {
    Box::new(BufferedRng::new(WyRand::new_seed(seed)))
}
