use anyhow::{Context, Result};
use clap::Parser;
use easy_imgui_frame::{
    Driver, ImGuiContext,
    native::{Sdl3OpenGl, Sdl3Window},
};
use frame_demo::{Args, FrameState, run};

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let args = Args::parse();
    if let Err(e) = demo(&args) {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}

fn demo(args: &Args) -> Result<()> {
    let window = Sdl3Window::new().context("initializing SDL3")?;
    let mut driver = Driver::init(window, ImGuiContext::new(), Sdl3OpenGl::new(), args.config())
        .context("initializing driver")?;

    let mut state = FrameState::default();
    run(&mut driver, &mut state)?;

    if let Err(e) = driver.destroy() {
        log::warn!("destroying driver: {e}");
    }
    Ok(())
}
