use std::{path::PathBuf, sync::Arc, time::Instant};

use anyhow::Context;
use clap::Parser;
use pixels::{Pixels, SurfaceTexture};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SquareWave};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, KeyCode, NamedKey, PhysicalKey},
    window::{Window, WindowId},
};

use quirk8::{RunState, Runner, Vm, config::PlatformArgs, u4};

/// The rate at which pixels fade out (phosphor decay).
const DISPLAY_PHOSPHOR_RATE: f32 = 10.0;

/// Initial window scale relative to the framebuffer.
const WINDOW_SCALE: u32 = 10;

/// Mapping from physical keyboard keys to CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::KeyX,   // 0x00
    KeyCode::Digit1, // 0x01
    KeyCode::Digit2, // 0x02
    KeyCode::Digit3, // 0x03
    KeyCode::KeyQ,   // 0x04
    KeyCode::KeyW,   // 0x05
    KeyCode::KeyE,   // 0x06
    KeyCode::KeyA,   // 0x07
    KeyCode::KeyS,   // 0x08
    KeyCode::KeyD,   // 0x09
    KeyCode::KeyZ,   // 0x0A
    KeyCode::KeyC,   // 0x0B
    KeyCode::Digit4, // 0x0C
    KeyCode::KeyR,   // 0x0D
    KeyCode::KeyF,   // 0x0E
    KeyCode::KeyV,   // 0x0F
];

/// Keys that control the host rather than the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HostAction {
    Pause,
    Faster,
    Slower,
    Mute,
}

fn host_action(code: KeyCode) -> Option<HostAction> {
    match code {
        KeyCode::KeyP => Some(HostAction::Pause),
        KeyCode::Equal => Some(HostAction::Faster),
        KeyCode::Minus => Some(HostAction::Slower),
        KeyCode::KeyM => Some(HostAction::Mute),
        _ => None,
    }
}

struct App {
    pixels: Option<Pixels<'static>>,
    window: Option<Arc<Window>>,
    /// Stores the brightness of each pixel (0.0 to 1.0) to implement phosphor decay.
    display_float: Vec<f32>,
    video_size: (u32, u32),

    /// Audio output stream (must be kept alive).
    _audio_stream: OutputStream,
    audio_sink: Sink,
    muted: bool,

    runner: Runner,
    last_run_state: RunState,
    /// Used for delta time calculation.
    last_frame_instant: Instant,

    /// Stores the result of the application to be returned from main.
    exit_result: anyhow::Result<()>,
}

impl App {
    fn new(vm: Vm) -> anyhow::Result<Self> {
        // Initialize audio
        let mut _audio_stream = OutputStreamBuilder::open_default_stream()
            .context("Failed to open audio output stream")?;
        _audio_stream.log_on_drop(false);

        let audio_sink = Sink::connect_new(_audio_stream.mixer());
        audio_sink.pause();
        audio_sink.append(SquareWave::new(440.0).amplify(0.5));

        let spec = *vm.spec();
        let video_size = (
            u32::from(spec.video_width()),
            u32::from(spec.video_height()),
        );

        Ok(Self {
            pixels: None,
            window: None,
            display_float: vec![0.0; (video_size.0 * video_size.1) as usize],
            video_size,

            _audio_stream,
            audio_sink,
            muted: false,

            last_run_state: vm.run_state(),
            runner: Runner::new(vm),
            last_frame_instant: Instant::now(),
            exit_result: Ok(()),
        })
    }

    fn process_display(&mut self, dt: f32) {
        let framebuffer = self.runner.vm().state().framebuffer().pixels();
        let buff = self.pixels.as_mut().unwrap().frame_mut();

        for ((pxl, brightness), &on) in buff
            .chunks_exact_mut(4)
            .zip(self.display_float.iter_mut())
            .zip(framebuffer)
        {
            // Lit pixels jump to full brightness, unlit ones fade out over time
            // instead of turning off instantly.
            *brightness = if on != 0 {
                1.0
            } else {
                (*brightness - DISPLAY_PHOSPHOR_RATE * dt).max(0.0)
            };

            let rgba = [0, 0xff, 0, (*brightness * 255.0) as u8];
            pxl.copy_from_slice(&rgba);
        }
    }

    fn update_title(&self) {
        let Some(window) = &self.window else {
            return;
        };

        let status = match self.runner.run_state() {
            RunState::Running => "",
            RunState::Paused => " [paused]",
            RunState::Off => " [halted]",
        };
        let mute = if self.muted { " [muted]" } else { "" };
        window.set_title(&format!(
            "quirk8 x{}{status}{mute}",
            self.runner.speed()
        ));
    }

    fn try_resumed(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let (width, height) = self.video_size;
        let window = {
            let size = LogicalSize::new(width * WINDOW_SCALE, height * WINDOW_SCALE);
            let min_size = LogicalSize::new(width, height);

            Arc::new(
                event_loop
                    .create_window(
                        Window::default_attributes()
                            .with_title("quirk8")
                            .with_inner_size(size)
                            .with_min_inner_size(min_size),
                    )
                    .context("Failed to create window")?,
            )
        };

        self.window = Some(window.clone());
        self.pixels = {
            let window_size = window.inner_size();
            let surface_texture =
                SurfaceTexture::new(window_size.width, window_size.height, window.clone());

            let pixels = Pixels::new(width, height, surface_texture)
                .context("Failed to create pixels surface")?;

            window.request_redraw();
            Some(pixels)
        };
        self.update_title();

        // Avoid large dt on first frame
        self.last_frame_instant = Instant::now();
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode, state: ElementState) {
        if state == ElementState::Pressed
            && let Some(action) = host_action(code)
        {
            match action {
                HostAction::Pause => self.runner.toggle_pause(),
                HostAction::Faster => self.runner.faster(),
                HostAction::Slower => self.runner.slower(),
                HostAction::Mute => self.muted = !self.muted,
            }
            self.update_title();
        }

        if let Some(key) = KEY_MAP.iter().position(|&k| k == code) {
            self.runner
                .set_key(u4::new(key as u8), state == ElementState::Pressed);
        }
    }

    fn try_window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        event: WindowEvent,
    ) -> anyhow::Result<()> {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        ..
                    },
                ..
            } => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                self.pixels
                    .as_mut()
                    .unwrap()
                    .resize_surface(size.width, size.height)
                    .context("Failed to resize pixels surface")?;
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = (now - self.last_frame_instant).as_secs_f32();
                self.last_frame_instant = now;

                self.runner.update(dt).context("CHIP-8 execution error")?;

                if self.runner.run_state() != self.last_run_state {
                    self.last_run_state = self.runner.run_state();
                    log::info!("Machine is now {:?}", self.last_run_state);
                    self.update_title();
                }

                if self.runner.should_play_tone() && !self.muted {
                    self.audio_sink.play();
                } else {
                    self.audio_sink.pause();
                }

                self.process_display(dt);

                self.pixels
                    .as_ref()
                    .unwrap()
                    .render()
                    .context("Pixels render error")?;

                self.window.as_ref().unwrap().request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key
                    && !event.repeat
                {
                    self.handle_key(code, event.state);
                }
            }

            _ => (),
        }
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.try_resumed(event_loop) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Err(e) = self.try_window_event(event_loop, event) {
            self.exit_result = Err(e);
            event_loop.exit();
        }
    }
}

/// CHIP-8 interpreter with per-platform quirks.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// P pauses, M mutes, +/- change speed and Escape exits.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    #[command(flatten)]
    platform: PlatformArgs,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;
    let vm = Vm::power_on(args.platform.to_spec(), &rom)
        .context("Failed to load ROM into CHIP-8 memory")?;

    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(vm).context("Failed to initialize application")?;
    event_loop
        .run_app(&mut app)
        .context("Error occurred during event loop execution")?;

    // Return the result captured during the event loop
    app.exit_result
}
