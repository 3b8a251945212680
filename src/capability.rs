//! The Console capability: nested, optional host interfaces the evaluator
//! consumes for I/O, turtle graphics, text-screen control, an editor, file
//! access, and hardware access.
//!
//! A set of concrete Rust traits, one per capability group, rather than a
//! single flat registry of named external calls: each group is its own
//! trait object, so a host wires up only the groups its device actually
//! supports. Anything left unset falls back to the always-present
//! [`NoConsole`]/`None` default, and calling through an absent capability
//! yields `ERROR(UNSUPPORTED_ON_DEVICE)` rather than a panic or a silent
//! no-op.

use crate::error::LogoError;

/// Result of a blocking-or-nonblocking read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Byte(u8),
    Interrupted,
    Eof,
}

/// Console input stream.
pub trait InputCapability {
    fn read_char(&mut self) -> ReadOutcome;
    fn read_line(&mut self, buf: &mut String) -> ReadOutcome;
    fn can_read(&self) -> bool;
}

/// Console output stream: the one capability every Console implementation
/// must provide, since `pr`/`print`/`type` have no sensible fallback.
pub trait OutputCapability {
    fn write(&mut self, text: &str);
    fn flush(&mut self);
}

/// Text-screen control, optional.
pub trait TextScreenCapability {
    fn clear(&mut self);
    fn set_cursor(&mut self, col: u32, row: u32);
    fn get_cursor(&self) -> (u32, u32);
}

/// Pen state for turtle ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PenState {
    Up,
    Down,
    Erase,
    Reverse,
}

/// Turtle graphics, optional. Rendering itself is out of scope — this
/// crate never rasterizes — but the trait still exists so a host can back
/// it, and its absence is what drives `TURTLE_BOUNDS`'s sibling
/// `UNSUPPORTED_ON_DEVICE` rather than a missing-symbol error.
pub trait TurtleCapability {
    fn forward(&mut self, steps: f32) -> Result<(), LogoError>;
    fn turn(&mut self, degrees: f32);
    fn set_heading(&mut self, degrees: f32);
    fn set_pen(&mut self, state: PenState);
    fn set_visible(&mut self, visible: bool);
    fn set_color(&mut self, index: u8);
    fn dot_at(&mut self, x: f32, y: f32);
    fn fill(&mut self);
    fn set_fence_mode(&mut self, mode: FenceMode);
    fn set_palette(&mut self, index: u8, r: u8, g: u8, b: u8);
}

/// Turtle boundary-handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceMode {
    Fence,
    Window,
    Wrap,
}

/// Outcome of an `edit` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Accept,
    Cancel,
}

/// A line-editor popup, optional.
pub trait EditorCapability {
    fn edit(&mut self, buf: &mut String, size: usize) -> EditOutcome;
}

/// File system access, optional.
pub trait FileCapability {
    fn open(&mut self, path: &str, mode: &str) -> Result<u32, LogoError>;
    fn exists(&self, path: &str) -> bool;
    fn delete(&mut self, path: &str) -> Result<(), LogoError>;
    fn rename(&mut self, from: &str, to: &str) -> Result<(), LogoError>;
    fn size(&self, path: &str) -> Result<u64, LogoError>;
}

/// Hardware/network access, optional.
pub trait HardwareCapability {
    fn clock_millis(&self) -> u64;
    fn pin_read(&self, pin: u32) -> Result<bool, LogoError>;
    fn pin_write(&mut self, pin: u32, value: bool) -> Result<(), LogoError>;
    fn network_ping(&mut self, host: &str) -> Result<bool, LogoError>;
    fn network_resolve(&mut self, host: &str) -> Result<String, LogoError>;
}

/// The opaque console handle the evaluator consumes. Every
/// capability beyond output is optional; a host populates only the ones
/// its device supports.
pub struct Console<'a> {
    pub output: &'a mut dyn OutputCapability,
    pub input: Option<&'a mut dyn InputCapability>,
    pub text_screen: Option<&'a mut dyn TextScreenCapability>,
    pub turtle: Option<&'a mut dyn TurtleCapability>,
    pub editor: Option<&'a mut dyn EditorCapability>,
    pub file: Option<&'a mut dyn FileCapability>,
    pub hardware: Option<&'a mut dyn HardwareCapability>,
}

impl<'a> Console<'a> {
    #[must_use]
    pub fn new(output: &'a mut dyn OutputCapability) -> Self {
        Self { output, input: None, text_screen: None, turtle: None, editor: None, file: None, hardware: None }
    }

    pub fn input(&mut self) -> Result<&mut dyn InputCapability, LogoError> {
        self.input.as_deref_mut().ok_or_else(|| LogoError::unsupported_on_device("console input"))
    }

    pub fn text_screen(&mut self) -> Result<&mut dyn TextScreenCapability, LogoError> {
        self.text_screen.as_deref_mut().ok_or_else(|| LogoError::unsupported_on_device("text screen"))
    }

    pub fn turtle(&mut self) -> Result<&mut dyn TurtleCapability, LogoError> {
        self.turtle.as_deref_mut().ok_or_else(|| LogoError::unsupported_on_device("turtle graphics"))
    }

    pub fn editor(&mut self) -> Result<&mut dyn EditorCapability, LogoError> {
        self.editor.as_deref_mut().ok_or_else(|| LogoError::unsupported_on_device("editor"))
    }

    pub fn file(&mut self) -> Result<&mut dyn FileCapability, LogoError> {
        self.file.as_deref_mut().ok_or_else(|| LogoError::unsupported_on_device("file system"))
    }

    pub fn hardware(&mut self) -> Result<&mut dyn HardwareCapability, LogoError> {
        self.hardware.as_deref_mut().ok_or_else(|| LogoError::unsupported_on_device("hardware access"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CollectStringOutput;

    #[test]
    fn absent_capability_reports_unsupported_on_device() {
        let mut out = CollectStringOutput::new();
        let mut console = Console::new(&mut out);
        let err = console.turtle().unwrap_err();
        assert_eq!(err.kind, crate::error::LogoErrorKind::UnsupportedOnDevice);
    }
}
