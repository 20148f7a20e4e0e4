use std::time::Instant;

use anyhow::Context;
use log::{debug, error, info};
use sdl2::{event::Event, pixels::Color, rect::Rect, render::Canvas, video::Window};
use thiserror::Error;

use chip8_vm::{emulator, Emulator, Framebuffer, DISPLAY_HEIGHT, DISPLAY_WIDTH};

use super::keymap::{Action, Keymap};

const TIMER_FREQUENCY: u32 = 60;
const ZOOM: usize = 10;

#[derive(Error, Debug)]
enum AppError {
    #[error("SDL error: {0}")]
    Sdl(String),
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Sdl(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppState {
    Running,
    Paused,
    Quit,
}

/// Accumulates elapsed time and hands it out in fixed periods.
struct Pacer {
    period: u128,
    pending: u128,
}

impl Pacer {
    fn new(frequency: u32) -> Self {
        Pacer {
            period: 1_000_000 / frequency.max(1) as u128,
            pending: 0,
        }
    }

    fn add(&mut self, micros: u128) {
        self.pending += micros;
    }

    /// Consume one period, if enough time has built up.
    fn tick(&mut self) -> bool {
        if self.pending >= self.period {
            self.pending -= self.period;
            true
        } else {
            false
        }
    }

    fn discard(&mut self) {
        self.pending = 0;
    }
}

/// Scaled-up view of the framebuffer.
struct Screen {
    canvas: Canvas<Window>,
}

impl Screen {
    fn present(&mut self, display: &Framebuffer) -> Result<(), AppError> {
        self.canvas.set_draw_color(Color::RGB(0x00, 0x00, 0x00));
        self.canvas.clear();

        self.canvas.set_draw_color(Color::RGB(0xFF, 0xFF, 0xFF));
        let lit = display
            .pixels()
            .iter()
            .enumerate()
            .filter(|&(_, &on)| on)
            .map(|(i, _)| {
                Rect::new(
                    ((i % DISPLAY_WIDTH) * ZOOM) as i32,
                    ((i / DISPLAY_WIDTH) * ZOOM) as i32,
                    ZOOM as u32,
                    ZOOM as u32,
                )
            });
        for rect in lit {
            self.canvas.fill_rect(rect)?;
        }

        self.canvas.present();
        Ok(())
    }
}

/// Run instructions for every elapsed cycle. Invalid instructions pause the
/// app; anything else the machine reports is fatal.
fn step(emu: &mut Emulator, cpu: &mut Pacer) -> Result<AppState, anyhow::Error> {
    while !emu.is_waiting_for_key() && cpu.tick() {
        match emu.execute() {
            Ok(()) => {}
            Err(err @ emulator::Error::InvalidInstruction(..)) => {
                error!("{}, pausing", err);
                return Ok(AppState::Paused);
            }
            Err(err) => return Err(err).context("emulation failed"),
        }
    }

    // a suspended machine doesn't bank cycles
    if emu.is_waiting_for_key() {
        cpu.discard();
    }

    Ok(AppState::Running)
}

/// Main application loop
///
/// `rom` is kept around so the machine can be reset; `clock` is the
/// instruction frequency, in Hz.
pub fn run(mut emu: Emulator, rom: &[u8], clock: u32) -> Result<(), anyhow::Error> {
    // initialize SDL context and subsystems
    let sdl_context = sdl2::init()
        .map_err(AppError::from)
        .context("failed to initialize SDL context")?;
    let sdl_video = sdl_context
        .video()
        .map_err(AppError::from)
        .context("failed to initialize video subsystem")?;

    let window = sdl_video
        .window(
            "CHIP-8",
            (DISPLAY_WIDTH * ZOOM) as u32,
            (DISPLAY_HEIGHT * ZOOM) as u32,
        )
        .position_centered()
        .build()
        .context("error creating window")?;

    let mut screen = Screen {
        canvas: window
            .into_canvas()
            .build()
            .context("error creating window canvas")?,
    };

    let mut event_pump = sdl_context
        .event_pump()
        .map_err(AppError::from)
        .context("error obtaining the event pump")?;

    let keymap = Keymap::Chip8;
    let mut state = AppState::Running;
    let mut cpu = Pacer::new(clock);
    let mut timers = Pacer::new(TIMER_FREQUENCY);
    let mut sound = false;
    let mut previous = Instant::now();

    info!("running at {} Hz", clock);

    while state != AppState::Quit {
        let now = Instant::now();
        let elapsed = now.duration_since(previous).as_micros();
        previous = now;

        for event in event_pump.poll_iter() {
            match keymap.translate_action(&event) {
                Some(Action::EmulateKeyState(key, pressed)) => emu.set_key(key, pressed),
                Some(Action::TogglePause) => {
                    state = match state {
                        AppState::Running => AppState::Paused,
                        AppState::Paused => AppState::Running,
                        AppState::Quit => AppState::Quit,
                    }
                }
                Some(Action::Reset) => {
                    emu.reset(rom).context("error reloading rom")?;
                    state = AppState::Running;
                    info!("machine reset");
                }
                Some(Action::Quit) => state = AppState::Quit,
                None if matches!(event, Event::Quit { .. }) => state = AppState::Quit,
                None => {}
            }
        }

        // the machine only moves while running; time spent paused is dropped
        if state == AppState::Running {
            cpu.add(elapsed);
            timers.add(elapsed);

            state = step(&mut emu, &mut cpu)?;

            while timers.tick() {
                emu.decrease_timers();
            }

            if emu.sound_active() != sound {
                sound = emu.sound_active();
                debug!("sound {}", if sound { "on" } else { "off" });
            }
        }

        screen
            .present(emu.display())
            .context("error drawing to canvas")?;
    }

    Ok(())
}
