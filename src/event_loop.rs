use mousetrack::all::*;

use crate::Replay;

use softbuffer::GraphicsContext;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{Window, WindowBuilder};

pub struct EventLoopArgs<'a> {
  pub replay: &'a mut Replay,
  pub buffer: &'a mut Vec<u32>,
  pub graphics_context: &'a mut GraphicsContext<Window>,
  pub paused: bool,
}

// Replays the video in a window sized to the frames until the video ends or
// the window is closed.
pub fn run_window(replay: &mut Replay, width: usize, height: usize) -> Result<()> {
  let size = winit::dpi::PhysicalSize::new(width as u32, height as u32);
  let mut event_loop = EventLoop::new();
  let window = WindowBuilder::new()
    .with_title("mousetrack")
    .with_resizable(false)
    .with_min_inner_size(size)
    .with_max_inner_size(size)
    .build(&event_loop)
    .context("Failed to open a window.")?;
  let mut graphics_context = unsafe { GraphicsContext::new(window) }
    .map_err(|err| anyhow!("Failed to create a graphics context: {}", err))?;

  let mut buffer = vec![];
  let mut args = EventLoopArgs {
    replay,
    buffer: &mut buffer,
    graphics_context: &mut graphics_context,
    paused: false,
  };
  let mut result = Ok(());
  event_loop.run_return(|event, _, control_flow| {
    if let Err(err) = handle_event(event, control_flow, &mut args) {
      result = Err(err);
      *control_flow = ControlFlow::Exit;
    }
  });
  result
}

pub fn handle_event(
  event: Event<()>,
  control_flow: &mut ControlFlow,
  args: &mut EventLoopArgs,
) -> Result<()> {
  let window_id = args.graphics_context.window().id();
  match event {
    Event::RedrawRequested(id) if id == window_id => {
      let frame = args.replay.display();
      if args.buffer.len() == frame.width * frame.height {
        args.graphics_context.set_buffer(&args.buffer, frame.width as u16, frame.height as u16);
      }
    },
    Event::WindowEvent { event, window_id: id } if id == window_id => {
      match event {
        WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
        WindowEvent::KeyboardInput {
          input: KeyboardInput {
            state: ElementState::Pressed,
            virtual_keycode: Some(keycode),
            ..
          },
          ..
        } => {
          match keycode {
            VirtualKeyCode::Escape | VirtualKeyCode::Q => *control_flow = ControlFlow::Exit,
            VirtualKeyCode::Space => args.paused = !args.paused,
            _ => {}, // Other keys.
          }
        },
        _ => {}, // Other window events.
      }
    },
    Event::MainEventsCleared => {
      if args.paused || *control_flow == ControlFlow::Exit { return Ok(()) }
      if !args.replay.step()? {
        info!("End of video.");
        *control_flow = ControlFlow::Exit;
        return Ok(());
      }
      args.replay.display().to_rgb_words(args.buffer);
      args.graphics_context.window().request_redraw();
    },
    _ => {}, // Other events.
  }
  Ok(())
}
