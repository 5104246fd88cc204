use std::thread;
use std::time::{Duration, Instant};

use chip8_base::Keys;
use log::{debug, warn};
use rand::RngCore;

use crate::interpreter::{ChipState, Fault, Framebuffer, FRAME_RATE};

/// What the interpreter needs from the outside world once per frame
pub trait Host {
    /// Current keypad state, read at the start of every frame
    fn keys(&mut self) -> Keys;

    /// Called after every frame. `changed` is false if nothing was drawn since the
    /// last call.
    fn render(&mut self, frame: &Framebuffer, changed: bool, sound_on: bool);

    /// Checked between frames; returning false stops the scheduler
    fn keep_running(&mut self) -> bool {
        true
    }
}

/// Drives a [`ChipState`] at 60 frames per second of wall-clock time.
///
/// Each frame runs one batch of instructions, then sleeps whatever is left of
/// the frame. A frame that overruns is not made up for later, so under
/// sustained overrun the timers fall behind real time.
pub struct Scheduler {
    budget: Duration,
    throttle: bool,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            budget: Duration::from_secs_f64(1_f64 / FRAME_RATE as f64),
            throttle: true,
        }
    }

    /// Runs frames back to back without sleeping
    pub fn unthrottled() -> Self {
        Scheduler {
            throttle: false,
            ..Scheduler::new()
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Runs until the host asks to stop or the interpreter halts.
    /// Returns the number of frames completed.
    pub fn run<R: RngCore, H: Host>(
        &self,
        chip: &mut ChipState<R>,
        host: &mut H,
    ) -> Result<u64, Fault> {
        let mut frames = 0_u64;
        let mut overruns = OverrunStreak::default();
        while host.keep_running() {
            let started = Instant::now();
            self.tick(chip, host)?;
            frames += 1;

            let elapsed = started.elapsed();
            match self.budget.checked_sub(elapsed) {
                Some(remaining) => {
                    overruns.on_time();
                    if self.throttle {
                        thread::sleep(remaining);
                    }
                }
                None => {
                    let over = elapsed - self.budget;
                    if overruns.overran() {
                        warn!(
                            "frame {} overran its {:?} budget by {:?}",
                            frames, self.budget, over
                        );
                    } else {
                        debug!("frame {} overran by {:?}", frames, over);
                    }
                }
            }
        }
        debug!("scheduler stopped after {} frames", frames);
        Ok(frames)
    }

    /// A single frame: keys in, timers and one instruction batch, render out
    pub fn tick<R: RngCore, H: Host>(
        &self,
        chip: &mut ChipState<R>,
        host: &mut H,
    ) -> Result<(), Fault> {
        chip.set_keys(host.keys());
        chip.frame()?;
        let changed = chip.take_frame_ready();
        host.render(chip.framebuffer(), changed, chip.sound_on());
        Ok(())
    }
}

/// Counts consecutive late frames so only the first of a run gets a warning
#[derive(Debug, Default)]
struct OverrunStreak {
    length: u64,
}

impl OverrunStreak {
    /// Returns true if this frame starts a new streak
    fn overran(&mut self) -> bool {
        self.length += 1;
        self.length == 1
    }

    fn on_time(&mut self) {
        if self.length > 1 {
            debug!("{} frames in a row overran", self.length);
        }
        self.length = 0;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
