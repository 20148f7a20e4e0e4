use sdl2::{event::Event, keyboard::Keycode};

/// Builds the event match for a keymap.
///
/// `@pad` entries track both press and release of a keypad key; plain
/// entries fire once per press and ignore keyboard auto-repeat.
macro_rules! bind_keys {
    // entry point
    ($event:expr, $($input:tt)*) => {
        bind_keys!(@inner $event, parsed=[], rest=[ $($input)* ])
    };

    // stop condition
    (@inner $event:expr, parsed = [$($parsed:tt)*], rest = [ ]) => {
        match $event {
            $($parsed)*
            _ => None
        }
    };

    // keypad key, down and up
    (
        @inner
        $event:expr,
        parsed = [$($parsed:tt)*],
        rest = [
            @pad $keycode:pat => $key:expr,
            $($rest:tt)*
        ]
    ) => {
        bind_keys!(
            @inner
            $event,
            parsed = [
                $($parsed)*
                Event::KeyDown { keycode: Some($keycode), .. } => Some(Action::EmulateKeyState($key, true)),
                Event::KeyUp { keycode: Some($keycode), .. } => Some(Action::EmulateKeyState($key, false)),
            ],
            rest = [
                $($rest)*
            ]
        )
    };

    // app control, first keydown only
    (   @inner
        $event:expr,
        parsed = [$($parsed:tt)*],
        rest = [
            $keycode:pat => $action:expr,
            $($rest:tt)*
        ]
    ) => {
        bind_keys!(
            @inner
            $event,
            parsed = [
                $($parsed)*
                Event::KeyDown { keycode: Some($keycode), repeat: false, .. } => Some($action),
            ],
            rest = [
                $($rest)*
            ]
        )
    };
}

/// Host keyboard layouts
pub enum Keymap {
    /// The left-hand 4x4 block of a QWERTY keyboard mirrors the keypad:
    ///
    /// ```text
    /// 1 2 3 4      1 2 3 C
    /// Q W E R  ->  4 5 6 D
    /// A S D F      7 8 9 E
    /// Z X C V      A 0 B F
    /// ```
    Chip8,
}

/// What the host loop should do in response to an event
pub enum Action {
    EmulateKeyState(u8, bool),
    TogglePause,
    Reset,
    Quit,
}

impl Keymap {
    pub fn translate_action(&self, event: &Event) -> Option<Action> {
        match self {
            Keymap::Chip8 => bind_keys!(event,
                @pad Keycode::Num1 => 0x1,
                @pad Keycode::Num2 => 0x2,
                @pad Keycode::Num3 => 0x3,
                @pad Keycode::Num4 => 0xC,
                @pad Keycode::Q => 0x4,
                @pad Keycode::W => 0x5,
                @pad Keycode::E => 0x6,
                @pad Keycode::R => 0xD,
                @pad Keycode::A => 0x7,
                @pad Keycode::S => 0x8,
                @pad Keycode::D => 0x9,
                @pad Keycode::F => 0xE,
                @pad Keycode::Z => 0xA,
                @pad Keycode::X => 0x0,
                @pad Keycode::C => 0xB,
                @pad Keycode::V => 0xF,
                Keycode::Space => Action::TogglePause,
                Keycode::F5 => Action::Reset,
                Keycode::Escape => Action::Quit,
            ),
        }
    }
}
