//! OS pointer injection.
//!
//! [`PointerInjector`] is the seam between gesture commands and the desktop.
//! The X11 backend shells out to `xdotool`; the logging backend is a dry run.

use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use crate::pointer::gesture::ClickKind;

/// Resolution used when neither the CLI nor the injector can report one.
pub const FALLBACK_SCREEN: ScreenSize = ScreenSize {
    width: 1920,
    height: 1080,
};

/// Primary display size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Moves and clicks the OS pointer.
pub trait PointerInjector: Send {
    /// Move the pointer to absolute screen coordinates.
    fn move_to(&mut self, x: f64, y: f64);
    /// Click `kind` at the current pointer position.
    fn click(&mut self, kind: ClickKind);
    /// Size of the primary display, when the backend can query it.
    fn screen_size(&self) -> Option<ScreenSize> {
        None
    }
}

impl<T: PointerInjector + ?Sized> PointerInjector for Box<T> {
    fn move_to(&mut self, x: f64, y: f64) {
        (**self).move_to(x, y)
    }

    fn click(&mut self, kind: ClickKind) {
        (**self).click(kind)
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        (**self).screen_size()
    }
}

/// Pick the screen size: explicit override, then the injector, then 1920x1080.
pub fn resolve_screen_size(
    override_size: Option<ScreenSize>,
    injector: &dyn PointerInjector,
) -> ScreenSize {
    if let Some(size) = override_size {
        return size;
    }
    match injector.screen_size() {
        Some(size) => size,
        None => {
            warn!(
                "screen size unavailable; assuming {}x{}",
                FALLBACK_SCREEN.width, FALLBACK_SCREEN.height
            );
            FALLBACK_SCREEN
        }
    }
}

/// X11 pointer control through the `xdotool` command.
///
/// Commands are fire-and-forget so a slow X server never blocks the capture
/// loop; finished children are reaped on the next call.
pub struct XdotoolInjector {
    binary: String,
    pending: Vec<Child>,
}

impl XdotoolInjector {
    /// Check that `xdotool` runs and return an injector using it.
    pub fn new() -> Result<Self> {
        let injector = Self {
            binary: "xdotool".to_string(),
            pending: Vec::new(),
        };
        let status = Command::new(&injector.binary)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .context("failed to run xdotool; install it or use --injector log")?;
        if !status.success() {
            return Err(anyhow!("xdotool exited with {status}"));
        }
        Ok(injector)
    }

    fn spawn(&mut self, args: &[String]) {
        self.reap();
        match Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => self.pending.push(child),
            Err(err) => warn!("xdotool {} failed: {err}", args.join(" ")),
        }
    }

    fn reap(&mut self) {
        self.pending
            .retain_mut(|child| !matches!(child.try_wait(), Ok(Some(_))));
    }
}

impl PointerInjector for XdotoolInjector {
    fn move_to(&mut self, x: f64, y: f64) {
        self.spawn(&move_args(x, y));
    }

    fn click(&mut self, kind: ClickKind) {
        self.spawn(&click_args(kind));
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        let output = Command::new(&self.binary)
            .arg("getdisplaygeometry")
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_display_geometry(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Drop for XdotoolInjector {
    fn drop(&mut self) {
        for child in &mut self.pending {
            let _ = child.wait();
        }
    }
}

fn move_args(x: f64, y: f64) -> Vec<String> {
    vec![
        "mousemove".to_string(),
        format!("{}", x.round() as i64),
        format!("{}", y.round() as i64),
    ]
}

fn click_args(kind: ClickKind) -> Vec<String> {
    let button = match kind {
        ClickKind::Left => "1",
        ClickKind::Right => "3",
    };
    vec!["click".to_string(), button.to_string()]
}

/// Parse `xdotool getdisplaygeometry` output (`"1920 1080"`).
pub(crate) fn parse_display_geometry(output: &str) -> Option<ScreenSize> {
    let mut parts = output.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    if width == 0 || height == 0 || parts.next().is_some() {
        return None;
    }
    Some(ScreenSize { width, height })
}

/// Dry-run injector that only logs.
#[derive(Debug, Default)]
pub struct LoggingInjector;

impl PointerInjector for LoggingInjector {
    fn move_to(&mut self, x: f64, y: f64) {
        debug!("pointer move to ({x:.0}, {y:.0})");
    }

    fn click(&mut self, kind: ClickKind) {
        info!("pointer {} click", kind.label());
    }
}
