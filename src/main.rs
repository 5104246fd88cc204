use std::path::PathBuf;

use anyhow::Context;
use chip8_base::Keys;
use clap::Parser;
use log::info;

use chip8_engine::interpreter::config::DEFAULT_INSTRUCTIONS_PER_SECOND;
use chip8_engine::{ChipState, Config, Framebuffer, Host, Quirks, Scheduler};

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 interpreter", long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND, help = "Instructions per second")]
    ips: u32,

    #[arg(long, help = "Start from the original COSMAC VIP quirks instead of the modern ones")]
    cosmac_vip: bool,

    #[arg(long, help = "8XY6/8XYE shift VY into VX")]
    legacy_shift: bool,

    #[arg(long, help = "BNNN jumps to XNN + VX")]
    legacy_jump_with_vx: bool,

    #[arg(long, help = "FX1E leaves VF alone when I passes 0xFFF")]
    no_index_overflow_flag: bool,

    #[arg(long, help = "FX55/FX65 advance I past the registers transferred")]
    legacy_store_load: bool,

    #[arg(long, help = "Seed for the random number instruction")]
    seed: Option<u64>,

    #[arg(long, help = "Run without a window and print the final screen")]
    headless: bool,

    #[arg(long, default_value_t = 600, help = "Frames to run in headless mode")]
    frames: u64,
}

impl Args {
    fn config(&self) -> Config {
        let mut quirks = if self.cosmac_vip {
            Quirks::cosmac_vip()
        } else {
            Quirks::default()
        };
        quirks.legacy_shift |= self.legacy_shift;
        quirks.legacy_jump_with_vx |= self.legacy_jump_with_vx;
        quirks.legacy_store_load_advances_index |= self.legacy_store_load;
        if self.no_index_overflow_flag {
            quirks.index_overflow_flag = false;
        }

        Config {
            quirks,
            instructions_per_second: self.ips,
            seed: self.seed,
        }
    }
}

/// No keypad; keeps the last frame to print once the run is over
struct TerminalHost {
    frames_left: u64,
    screen: Framebuffer,
}

impl Host for TerminalHost {
    fn keys(&mut self) -> Keys {
        [false; 16]
    }

    fn render(&mut self, frame: &Framebuffer, changed: bool, _sound_on: bool) {
        if changed {
            self.screen = *frame;
        }
    }

    fn keep_running(&mut self) -> bool {
        self.frames_left = self.frames_left.saturating_sub(1);
        self.frames_left > 0
    }
}

impl TerminalHost {
    fn new(frames: u64, screen: Framebuffer) -> Self {
        // keep_running counts down before each frame
        TerminalHost {
            frames_left: frames.saturating_add(1),
            screen,
        }
    }

    fn print(&self) {
        for row in self.screen.iter() {
            let line: String = row.iter().map(|&on| if on { '█' } else { ' ' }).collect();
            println!("{}", line.trim_end());
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("couldn't read ROM {}", args.rom.display()))?;

    let config = args.config();
    info!("{:?}", config);
    let mut chip8_vm = ChipState::new(config);
    chip8_vm.load_rom(&rom)?;

    if args.headless {
        let mut host = TerminalHost::new(args.frames, *chip8_vm.framebuffer());
        let result = Scheduler::new().run(&mut chip8_vm, &mut host);
        host.print();
        let frames = result?;
        info!("ran {} frames", frames);
        return Ok(());
    }

    chip8_base::run(chip8_vm);
    Ok(())
}
