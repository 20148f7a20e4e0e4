/// Points where CHIP-8 interpreters historically disagree.
///
/// The default set is the one most modern ROMs expect. [`Quirks::cosmac`]
/// reproduces the original COSMAC VIP interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6/8XYE load VY into VX before shifting, instead of shifting VX in place.
    pub shift_uses_vy: bool,

    /// FX55/FX65 leave I pointing to the byte after the last register.
    pub load_store_increments_i: bool,

    /// 8XY1/8XY2/8XY3 reset VF to 0.
    pub logic_resets_vf: bool,
}

impl Quirks {
    /// Behaviour of the COSMAC VIP interpreter.
    pub const fn cosmac() -> Self {
        Quirks {
            shift_uses_vy: true,
            load_store_increments_i: true,
            logic_resets_vf: true,
        }
    }
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            shift_uses_vy: false,
            load_store_increments_i: true,
            logic_resets_vf: false,
        }
    }
}
